//! `EngineNode` — the collaborator hosting ECS containers (spec.md §1).
//! Out of scope for this control plane; only its HTTP contract is modelled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of asking a node to create a container for a new match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub container_id: String,
    pub internal_match_id: String,
    pub websocket_url: String,
}

#[async_trait]
pub trait EngineNode: Send + Sync {
    async fn create_container(
        &self,
        advertise_address: &str,
        modules: &[String],
    ) -> Result<ContainerHandle, String>;

    /// Best-effort teardown; failures are logged by the caller, never fatal.
    async fn destroy_container(&self, advertise_address: &str, container_id: &str) -> Result<(), String>;

    async fn notify_status(&self, advertise_address: &str, match_id: &str, status: &str) -> Result<(), String>;
}

#[derive(Serialize)]
struct CreateContainerRequest<'a> {
    modules: &'a [String],
}

pub struct HttpEngineNode {
    client: reqwest::Client,
}

impl HttpEngineNode {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client config is valid"),
        }
    }
}

#[async_trait]
impl EngineNode for HttpEngineNode {
    async fn create_container(
        &self,
        advertise_address: &str,
        modules: &[String],
    ) -> Result<ContainerHandle, String> {
        let resp = self
            .client
            .post(format!("{advertise_address}/containers"))
            .json(&CreateContainerRequest { modules })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("status {}", resp.status()));
        }
        resp.json().await.map_err(|e| e.to_string())
    }

    async fn destroy_container(&self, advertise_address: &str, container_id: &str) -> Result<(), String> {
        let resp = self
            .client
            .delete(format!("{advertise_address}/containers/{container_id}"))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("status {}", resp.status()))
        }
    }

    async fn notify_status(&self, advertise_address: &str, match_id: &str, status: &str) -> Result<(), String> {
        let resp = self
            .client
            .post(format!("{advertise_address}/matches/{match_id}/status"))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("status {}", resp.status()))
        }
    }
}

/// Test double with scripted per-node failures for deploy-retry tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockEngineNode {
        pub failing_addresses: Mutex<HashSet<String>>,
    }

    impl MockEngineNode {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_address(&self, addr: &str) {
            self.failing_addresses.lock().unwrap().insert(addr.to_string());
        }
    }

    #[async_trait]
    impl EngineNode for MockEngineNode {
        async fn create_container(
            &self,
            advertise_address: &str,
            _modules: &[String],
        ) -> Result<ContainerHandle, String> {
            if self.failing_addresses.lock().unwrap().contains(advertise_address) {
                return Err("simulated container creation failure".to_string());
            }
            Ok(ContainerHandle {
                container_id: "c0".to_string(),
                internal_match_id: "m0".to_string(),
                websocket_url: format!("{advertise_address}/ws"),
            })
        }

        async fn destroy_container(&self, advertise_address: &str, _container_id: &str) -> Result<(), String> {
            if self.failing_addresses.lock().unwrap().contains(advertise_address) {
                return Err("simulated container teardown failure".to_string());
            }
            Ok(())
        }

        async fn notify_status(&self, _advertise_address: &str, _match_id: &str, _status: &str) -> Result<(), String> {
            Ok(())
        }
    }
}
