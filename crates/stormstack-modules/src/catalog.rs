//! ModuleCatalog (C3) — metadata, checksums, and bounded-concurrency
//! distribution of module artifacts to engine nodes.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use stormstack_core::time::now_secs;
use stormstack_state::{ModuleMetadata, Node, StateStore};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::blob::ModuleBlobStore;
use crate::error::{ModuleError, ModuleResult};

/// Outcome of a `distribute` call.
#[derive(Debug, Default)]
pub struct DistributionReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct ModuleCatalog {
    state: StateStore,
    blobs: Arc<dyn ModuleBlobStore>,
    max_file_size: u64,
    max_concurrent_distributions: usize,
    http: reqwest::Client,
}

impl ModuleCatalog {
    pub fn new(state: StateStore, blobs: Arc<dyn ModuleBlobStore>, max_file_size: u64) -> Self {
        Self {
            state,
            blobs,
            max_file_size,
            max_concurrent_distributions: 4,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_max_concurrent_distributions(mut self, n: usize) -> Self {
        self.max_concurrent_distributions = n;
        self
    }

    /// Fails `VersionConflict` if `(name, version)` exists with a
    /// different checksum. `uploaded_by` is the caller's identity.
    pub async fn upload(
        &self,
        name: &str,
        version: &str,
        file_name: &str,
        bytes: &[u8],
        uploaded_by: &str,
    ) -> ModuleResult<ModuleMetadata> {
        let file_size = bytes.len() as u64;
        if file_size > self.max_file_size {
            return Err(ModuleError::TooLarge(file_size, self.max_file_size));
        }

        let checksum = hex::encode(Sha256::digest(bytes));

        if let Some(existing) = self.state.get_module(name, version)? {
            if existing.checksum != checksum {
                return Err(ModuleError::VersionConflict(name.to_string(), version.to_string()));
            }
            return Ok(existing);
        }

        self.blobs.put(name, version, bytes).await?;

        let metadata = ModuleMetadata {
            name: name.to_string(),
            version: version.to_string(),
            file_name: file_name.to_string(),
            file_size,
            checksum,
            uploaded_at: now_secs(),
            uploaded_by: uploaded_by.to_string(),
            distributed_to: Default::default(),
        };
        self.state.put_module(&metadata)?;
        info!(%name, %version, file_size, "module uploaded");
        Ok(metadata)
    }

    pub async fn download(&self, name: &str, version: &str) -> ModuleResult<Vec<u8>> {
        self.get_metadata(name, version)?;
        Ok(self.blobs.get(name, version).await?)
    }

    pub fn list(&self) -> ModuleResult<Vec<ModuleMetadata>> {
        Ok(self.state.list_modules()?)
    }

    pub async fn delete(&self, name: &str, version: &str) -> ModuleResult<()> {
        self.get_metadata(name, version)?;
        self.blobs.delete(name, version).await?;
        self.state.delete_module(name, version)?;
        info!(%name, %version, "module deleted");
        Ok(())
    }

    /// PUTs the blob to every HEALTHY node concurrently (bounded by
    /// `max_concurrent_distributions`), retrying transient failures with
    /// exponential backoff (3 attempts, base 250 ms, cap 2 s).
    pub async fn distribute(
        &self,
        name: &str,
        version: &str,
        healthy_nodes: Vec<Node>,
    ) -> ModuleResult<DistributionReport> {
        let mut metadata = self.get_metadata(name, version)?;
        let bytes = self.blobs.get(name, version).await?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_distributions));
        let mut handles = Vec::new();

        for node in healthy_nodes {
            let semaphore = semaphore.clone();
            let http = self.http.clone();
            let bytes = bytes.clone();
            let name = name.to_string();
            let version = version.to_string();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let result = put_with_retry(&http, &node.advertise_address, &name, &version, &bytes).await;
                (node.node_id, result)
            }));
        }

        let mut report = DistributionReport::default();
        for handle in handles {
            let (node_id, result) = handle.await.expect("distribution task panicked");
            match result {
                Ok(()) => {
                    metadata.distributed_to.insert(node_id.clone());
                    report.succeeded.push(node_id);
                }
                Err(reason) => {
                    warn!(%node_id, %reason, "module distribution failed");
                    report.failed.push((node_id, reason));
                }
            }
        }

        self.state.put_module(&metadata)?;
        Ok(report)
    }

    fn get_metadata(&self, name: &str, version: &str) -> ModuleResult<ModuleMetadata> {
        self.state
            .get_module(name, version)?
            .ok_or_else(|| ModuleError::NotFound(name.to_string(), version.to_string()))
    }
}

async fn put_with_retry(
    http: &reqwest::Client,
    node_address: &str,
    name: &str,
    version: &str,
    bytes: &[u8],
) -> Result<(), String> {
    const MAX_ATTEMPTS: u32 = 3;
    const BASE_DELAY: Duration = Duration::from_millis(250);
    const MAX_DELAY: Duration = Duration::from_secs(2);

    let url = format!("{node_address}/modules/{name}/{version}");
    let mut attempt = 0;
    loop {
        attempt += 1;
        match http.put(&url).body(bytes.to_vec()).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) if attempt >= MAX_ATTEMPTS => return Err(format!("status {}", resp.status())),
            Err(e) if attempt >= MAX_ATTEMPTS => return Err(e.to_string()),
            _ => {
                let delay = (BASE_DELAY * 2u32.pow(attempt - 1)).min(MAX_DELAY);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
