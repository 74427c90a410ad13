//! `ModuleBlobStore` — stores module artifact bytes out of the core's
//! JSON-metadata tables (spec.md §1 externalises blob storage).

use std::path::PathBuf;

use tokio::fs;

/// Storage for module artifact bytes, keyed by `(name, version)`. The
/// core only ever holds metadata; bytes live behind this trait so a
/// deployment can swap in object storage without touching `ModuleCatalog`.
#[async_trait::async_trait]
pub trait ModuleBlobStore: Send + Sync {
    async fn put(&self, name: &str, version: &str, bytes: &[u8]) -> std::io::Result<()>;
    async fn get(&self, name: &str, version: &str) -> std::io::Result<Vec<u8>>;
    async fn delete(&self, name: &str, version: &str) -> std::io::Result<()>;
}

/// Default blob store: one file per `(name, version)` under a directory.
pub struct FilesystemBlobStore {
    directory: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, name: &str, version: &str) -> PathBuf {
        self.directory.join(format!("{name}__{version}.blob"))
    }
}

#[async_trait::async_trait]
impl ModuleBlobStore for FilesystemBlobStore {
    async fn put(&self, name: &str, version: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory).await?;
        fs::write(self.path_for(name, version), bytes).await
    }

    async fn get(&self, name: &str, version: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.path_for(name, version)).await
    }

    async fn delete(&self, name: &str, version: &str) -> std::io::Result<()> {
        fs::remove_file(self.path_for(name, version)).await
    }
}
