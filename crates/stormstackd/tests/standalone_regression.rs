//! End-to-end regression test: register a node, deploy a match, join it,
//! all through the assembled router — not just the individual crates.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use stormstack_api::{build_router, ApiState};
use stormstack_autoscale::Autoscaler;
use stormstack_coordinator::{ContainerHandle, EngineNode, MatchCoordinator};
use stormstack_matches::MatchRegistry;
use stormstack_modules::{FilesystemBlobStore, ModuleBlobStore, ModuleCatalog};
use stormstack_proxy::ProxyRouter;
use stormstack_registry::NodeRegistry;
use stormstack_scheduler::Scheduler;
use stormstack_state::StateStore;
use stormstack_tokens::{MockIdentityService, TokenIssuer};

struct FakeEngineNode;

#[async_trait::async_trait]
impl EngineNode for FakeEngineNode {
    async fn create_container(&self, advertise_address: &str, _modules: &[String]) -> Result<ContainerHandle, String> {
        Ok(ContainerHandle {
            container_id: "c0".to_string(),
            internal_match_id: "internal-0".to_string(),
            websocket_url: format!("{advertise_address}/ws"),
        })
    }

    async fn destroy_container(&self, _advertise_address: &str, _container_id: &str) -> Result<(), String> {
        Ok(())
    }

    async fn notify_status(&self, _advertise_address: &str, _match_id: &str, _status: &str) -> Result<(), String> {
        Ok(())
    }
}

fn test_router() -> axum::Router {
    let store = StateStore::open_in_memory().unwrap();
    let registry = Arc::new(NodeRegistry::new(store.clone(), 60, 120));
    let matches = Arc::new(MatchRegistry::new(store.clone(), 3600));
    let scheduler = Arc::new(Scheduler::new(store.clone()));
    let tokens = Arc::new(TokenIssuer::new("test-key".to_string(), 3600, 3600));
    let coordinator = Arc::new(MatchCoordinator::new(
        registry.clone(),
        matches.clone(),
        scheduler,
        Arc::new(FakeEngineNode),
        tokens.clone(),
        2,
    ));
    let dir = tempfile::tempdir().unwrap();
    let blobs: Arc<dyn ModuleBlobStore> = Arc::new(FilesystemBlobStore::new(dir.path()));
    let modules = Arc::new(ModuleCatalog::new(store.clone(), blobs, 10 * 1024 * 1024));
    let autoscaler = Arc::new(Autoscaler::new(store.clone(), 0.8, 0.2, 1, 10, 60));
    let proxy = Arc::new(ProxyRouter::new(matches.as_ref().clone(), true, Duration::from_secs(1)));

    build_router(ApiState {
        registry,
        matches,
        modules,
        coordinator,
        tokens,
        autoscaler,
        proxy,
        identity: Arc::new(MockIdentityService),
    })
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", "Bearer test-token")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn register_deploy_and_join_round_trips() {
    let router = test_router();

    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/nodes/register",
            serde_json::json!({"node_id": "engine-1", "advertise_address": "http://engine-1:9000", "max_containers": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/matches/create",
            serde_json::json!({"modules": ["chess-core:1.0.0"], "player_limit": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let deploy: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let match_id = deploy["match_id"].as_str().unwrap().to_string();

    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/matches/{match_id}/join"),
            serde_json::json!({"player_id": "player-1", "player_name": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let join: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(!join["match_token"].as_str().unwrap().is_empty());

    let resp = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/matches/{match_id}"))
                .header("authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let entry: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entry["player_count"], 1);
}

#[tokio::test]
async fn deploy_with_no_registered_nodes_returns_service_unavailable() {
    let router = test_router();
    let resp = router
        .oneshot(json_request(
            "POST",
            "/api/matches/create",
            serde_json::json!({"modules": [], "player_limit": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "NO_CAPABLE_NODES");
}
