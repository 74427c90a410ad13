//! stormstack-api — the REST/WS wire surface over the control plane
//! (spec.md §6). Thin: every handler validates auth, then delegates to
//! the owning component (C1-C8) and renders its result as a DTO.

use std::sync::Arc;

use axum::routing::{any, delete, get, post, put};
use axum::Router;

use stormstack_autoscale::Autoscaler;
use stormstack_coordinator::MatchCoordinator;
use stormstack_matches::MatchRegistry;
use stormstack_modules::ModuleCatalog;
use stormstack_proxy::ProxyRouter;
use stormstack_registry::NodeRegistry;
use stormstack_tokens::{IdentityService, TokenIssuer};

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod ws_bridge;

/// Shared state for every route: one handle per control-plane component.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<NodeRegistry>,
    pub matches: Arc<MatchRegistry>,
    pub modules: Arc<ModuleCatalog>,
    pub coordinator: Arc<MatchCoordinator>,
    pub tokens: Arc<TokenIssuer>,
    pub autoscaler: Arc<Autoscaler>,
    pub proxy: Arc<ProxyRouter>,
    pub identity: Arc<dyn IdentityService>,
}

/// Build the complete route table from spec.md §6.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/nodes/register", post(handlers::register_node))
        .route("/api/nodes/{id}/heartbeat", put(handlers::heartbeat_node))
        .route("/api/nodes/{id}/drain", post(handlers::drain_node))
        .route("/api/nodes/{id}", delete(handlers::deregister_node))
        .route("/api/cluster/nodes", get(handlers::list_cluster_nodes))
        .route("/api/cluster/nodes/{id}", get(handlers::get_cluster_node))
        .route("/api/cluster/status", get(handlers::cluster_status))
        .route("/api/matches/create", post(handlers::create_match))
        .route("/api/v1/deploy", post(handlers::create_match))
        .route("/api/matches", get(handlers::list_matches))
        .route(
            "/api/matches/{id}",
            get(handlers::get_match).delete(handlers::delete_match),
        )
        .route("/api/matches/{id}/join", post(handlers::join_match))
        .route("/api/matches/{id}/{*rest}", any(handlers::proxy_match_request))
        .route("/api/modules/upload", post(handlers::upload_module))
        .route("/api/modules", get(handlers::list_modules))
        .route("/api/modules/{name}/{version}/download", get(handlers::download_module))
        .route("/api/modules/{name}/{version}", delete(handlers::delete_module))
        .route(
            "/api/modules/{name}/{version}/distribute",
            post(handlers::distribute_module),
        )
        .route("/ws/snapshots/{match_id}", get(handlers::ws_snapshots))
        .route("/metrics", get(metrics::render))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use stormstack_coordinator::{ContainerHandle, EngineNode};
    use stormstack_modules::blob::FilesystemBlobStore;
    use stormstack_scheduler::Scheduler;
    use stormstack_state::StateStore;
    use stormstack_tokens::MockIdentityService;
    use tower::ServiceExt;

    struct NullEngineNode;

    #[async_trait::async_trait]
    impl EngineNode for NullEngineNode {
        async fn create_container(&self, _advertise_address: &str, _modules: &[String]) -> Result<ContainerHandle, String> {
            Err("no engine node in this test".to_string())
        }

        async fn destroy_container(&self, _advertise_address: &str, _container_id: &str) -> Result<(), String> {
            Ok(())
        }

        async fn notify_status(&self, _advertise_address: &str, _match_id: &str, _status: &str) -> Result<(), String> {
            Ok(())
        }
    }

    fn test_state() -> (ApiState, tempfile::TempDir) {
        let store = StateStore::open_in_memory().unwrap();
        let registry = Arc::new(NodeRegistry::new(store.clone(), 60, 120));
        let matches = Arc::new(MatchRegistry::new(store.clone(), 3600));
        let scheduler = Arc::new(Scheduler::new(store.clone()));
        let engine = Arc::new(NullEngineNode);
        let tokens = Arc::new(TokenIssuer::new("test-key".to_string(), 3600, 3600));
        let coordinator = Arc::new(MatchCoordinator::new(
            registry.clone(),
            matches.clone(),
            scheduler,
            engine,
            tokens.clone(),
            2,
        ));
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FilesystemBlobStore::new(dir.path()));
        let modules = Arc::new(ModuleCatalog::new(store.clone(), blobs, 10 * 1024 * 1024));
        let autoscaler = Arc::new(Autoscaler::new(store.clone(), 0.8, 0.2, 1, 10, 60));
        let proxy = Arc::new(ProxyRouter::new(
            matches.as_ref().clone(),
            true,
            std::time::Duration::from_secs(1),
        ));

        let state = ApiState {
            registry,
            matches,
            modules,
            coordinator,
            tokens,
            autoscaler,
            proxy,
            identity: Arc::new(MockIdentityService),
        };
        (state, dir)
    }

    #[tokio::test]
    async fn register_node_requires_authorization_header() {
        let (state, _dir) = test_state();
        let router = build_router(state);
        let req = Request::builder()
            .method("POST")
            .uri("/api/nodes/register")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"node_id": "n1", "advertise_address": "http://n1:9000", "max_containers": 10})
                    .to_string(),
            ))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn register_node_succeeds_with_bearer_token() {
        let (state, _dir) = test_state();
        let router = build_router(state);
        let req = Request::builder()
            .method("POST")
            .uri("/api/nodes/register")
            .header("content-type", "application/json")
            .header("authorization", "Bearer test-token")
            .body(Body::from(
                serde_json::json!({"node_id": "n1", "advertise_address": "http://n1:9000", "max_containers": 10})
                    .to_string(),
            ))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_unknown_match_returns_404_with_error_envelope() {
        let (state, _dir) = test_state();
        let router = build_router(state);
        let req = Request::builder()
            .method("GET")
            .uri("/api/matches/ghost")
            .header("authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "MATCH_NOT_FOUND");
    }
}
