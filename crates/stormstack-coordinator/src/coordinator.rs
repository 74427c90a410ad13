//! MatchCoordinator (C5) — deploy/join/leave/finish/delete, the
//! transactional glue over C1-C4 and `EngineNode` (spec.md §4.5).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stormstack_core::ids::{MatchId, PlayerId};
use stormstack_core::time::now_secs;
use stormstack_matches::MatchRegistry;
use stormstack_registry::NodeRegistry;
use stormstack_scheduler::{Scheduler, SchedulingHints};
use stormstack_state::{MatchRegistryEntry, MatchStatus};
use stormstack_tokens::TokenIssuer;
use tracing::{error, info, warn};

use crate::engine_node::EngineNode;
use crate::error::{CoordinatorError, CoordinatorResult};

#[derive(Debug, Clone)]
pub struct MatchResponse {
    pub match_id: MatchId,
    pub status: String,
    pub advertise_address: String,
    pub websocket_url: String,
}

#[derive(Debug, Clone)]
pub struct JoinResponse {
    pub match_token: String,
    pub command_ws_url: String,
    pub snapshot_ws_url: String,
    pub expires_at: u64,
}

pub struct MatchCoordinator {
    registry: Arc<NodeRegistry>,
    matches: Arc<MatchRegistry>,
    scheduler: Arc<Scheduler>,
    engine: Arc<dyn EngineNode>,
    tokens: Arc<TokenIssuer>,
    scheduler_retries: u32,
    match_sequence: AtomicU64,
}

impl MatchCoordinator {
    pub fn new(
        registry: Arc<NodeRegistry>,
        matches: Arc<MatchRegistry>,
        scheduler: Arc<Scheduler>,
        engine: Arc<dyn EngineNode>,
        tokens: Arc<TokenIssuer>,
        scheduler_retries: u32,
    ) -> Self {
        Self {
            registry,
            matches,
            scheduler,
            engine,
            tokens,
            scheduler_retries,
            match_sequence: AtomicU64::new(0),
        }
    }

    /// (1) `select`; (2) create the container on the chosen node, excluding
    /// failed nodes and retrying up to `scheduler_retries`; (3) `create` the
    /// registry entry; (4) return endpoints.
    pub async fn deploy(
        &self,
        modules: Vec<String>,
        player_limit: u32,
        mut hints: SchedulingHints,
    ) -> CoordinatorResult<MatchResponse> {
        let mut attempts_left = self.scheduler_retries + 1;
        let mut last_error = String::new();

        loop {
            let node_id = match self.scheduler.select(&Vec::new(), &hints) {
                Ok(node_id) => node_id,
                Err(e) => {
                    // Once a node has already failed container creation,
                    // the scheduler running out of candidates means
                    // retries are exhausted, not that none were ever
                    // available.
                    if last_error.is_empty() {
                        return Err(e.into());
                    }
                    return Err(CoordinatorError::DeploymentFailed(last_error));
                }
            };
            let node = self
                .registry
                .find(&node_id)?
                .ok_or_else(|| CoordinatorError::InvalidRequest(format!("node {node_id} vanished mid-select")))?;

            match self.engine.create_container(&node.advertise_address, &modules).await {
                Ok(handle) => {
                    let internal_id = self.match_sequence.fetch_add(1, Ordering::Relaxed);
                    let match_id = format!("{node_id}-{}-{internal_id}", handle.container_id);

                    let entry = MatchRegistryEntry {
                        match_id: match_id.clone(),
                        node_id: node_id.clone(),
                        container_id: handle.container_id,
                        status: MatchStatus::Running,
                        module_names: modules,
                        created_at: now_secs(),
                        advertise_address: node.advertise_address.clone(),
                        websocket_url: handle.websocket_url.clone(),
                        player_count: 0,
                        player_limit,
                    };
                    self.matches.create(entry)?;

                    info!(%match_id, %node_id, "match deployed");
                    return Ok(MatchResponse {
                        match_id,
                        status: "RUNNING".to_string(),
                        advertise_address: node.advertise_address,
                        websocket_url: handle.websocket_url,
                    });
                }
                Err(reason) => {
                    warn!(%node_id, %reason, "container creation failed, excluding node and retrying");
                    last_error = reason;
                    hints.excluded.push(node_id);
                    hints.preferred_node_id = None;
                    attempts_left -= 1;
                    if attempts_left == 0 {
                        return Err(CoordinatorError::DeploymentFailed(last_error));
                    }
                }
            }
        }
    }

    /// (1) precondition; (2) increment; (3) issue token; (4) endpoints.
    /// Best-effort decrement if any step after (2) fails.
    pub async fn join(
        &self,
        match_id: &str,
        player_id: &PlayerId,
        player_name: &str,
    ) -> CoordinatorResult<JoinResponse> {
        let entry = self
            .matches
            .find(match_id)?
            .ok_or_else(|| CoordinatorError::Match(stormstack_matches::MatchError::NotFound(match_id.to_string())))?;

        if entry.status != MatchStatus::Running && entry.status != MatchStatus::Full {
            return Err(CoordinatorError::InvalidRequest(format!(
                "match {match_id} is not joinable in status {:?}",
                entry.status
            )));
        }

        let entry = self.matches.increment_players(match_id)?;

        match self.tokens.issue_match_token(player_id, match_id, player_name) {
            Ok(token) => {
                let claims = self
                    .tokens
                    .verify_match_token(&token)
                    .expect("freshly issued token verifies");
                Ok(JoinResponse {
                    match_token: token,
                    command_ws_url: entry.websocket_url.clone(),
                    snapshot_ws_url: format!("{}/snapshots", entry.websocket_url),
                    expires_at: claims.expires_at,
                })
            }
            Err(e) => {
                if let Err(decrement_err) = self.matches.decrement_players(match_id) {
                    error!(%match_id, %decrement_err, "best-effort decrement after join failure also failed");
                }
                Err(CoordinatorError::Token(e))
            }
        }
    }

    pub fn leave(&self, match_id: &str) -> CoordinatorResult<()> {
        self.matches.decrement_players(match_id)?;
        Ok(())
    }

    pub async fn finish(&self, match_id: &str) -> CoordinatorResult<()> {
        let entry = self.matches.update_status(match_id, MatchStatus::Finished)?;
        if let Err(e) = self
            .engine
            .notify_status(&entry.advertise_address, match_id, "FINISHED")
            .await
        {
            warn!(%match_id, error = %e, "node notification of finish failed, registry already updated");
        }
        Ok(())
    }

    /// Notifies the node, then deletes the registry entry. A node error is
    /// logged and does not block deletion unless the node is HEALTHY, in
    /// which case deletion is refused to avoid orphaning a running
    /// container.
    pub async fn delete(&self, match_id: &str) -> CoordinatorResult<()> {
        let entry = self
            .matches
            .find(match_id)?
            .ok_or_else(|| CoordinatorError::Match(stormstack_matches::MatchError::NotFound(match_id.to_string())))?;

        let node = self.registry.find(&entry.node_id)?;
        let node_is_healthy = node
            .map(|n| n.status == stormstack_state::NodeStatus::Healthy)
            .unwrap_or(false);

        if let Err(e) = self
            .engine
            .destroy_container(&entry.advertise_address, &entry.container_id)
            .await
        {
            if node_is_healthy {
                return Err(CoordinatorError::InvalidRequest(format!(
                    "refusing to delete match {match_id}: hosting node is HEALTHY and teardown failed: {e}"
                )));
            }
            warn!(%match_id, error = %e, "node teardown failed on an unhealthy node, deleting registry entry anyway");
        }

        self.matches.delete(match_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_node::mock::MockEngineNode;
    use stormstack_state::{NodeCapacity, StateStore};

    fn setup() -> (Arc<NodeRegistry>, Arc<MatchRegistry>, Arc<Scheduler>, Arc<MockEngineNode>, Arc<TokenIssuer>) {
        let state = StateStore::open_in_memory().unwrap();
        let registry = Arc::new(NodeRegistry::new(state.clone(), 60, 120));
        let matches = Arc::new(MatchRegistry::new(state.clone(), 3600));
        let scheduler = Arc::new(Scheduler::new(state));
        let engine = Arc::new(MockEngineNode::new());
        let tokens = Arc::new(TokenIssuer::new("test-key".to_string(), 3600, 3600));
        (registry, matches, scheduler, engine, tokens)
    }

    fn coordinator(
        registry: Arc<NodeRegistry>,
        matches: Arc<MatchRegistry>,
        scheduler: Arc<Scheduler>,
        engine: Arc<MockEngineNode>,
        tokens: Arc<TokenIssuer>,
    ) -> MatchCoordinator {
        MatchCoordinator::new(registry, matches, scheduler, engine, tokens, 2)
    }

    #[tokio::test]
    async fn deploy_picks_least_loaded_node_and_creates_entry() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();

        let coord = coordinator(registry, matches.clone(), scheduler, engine, tokens);
        let resp = coord
            .deploy(vec!["chess-core:1.0.0".to_string()], 0, SchedulingHints::default())
            .await
            .unwrap();

        assert!(resp.match_id.starts_with("engine-1-"));
        assert_eq!(resp.status, "RUNNING");
        assert_eq!(resp.advertise_address, "http://engine-1:9000");
        assert!(matches.find(&resp.match_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn deploy_retries_on_container_creation_failure() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-a", "http://engine-a:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        registry
            .register("engine-b", "http://engine-b:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        engine.fail_address("http://engine-a:9000");

        let coord = coordinator(registry, matches, scheduler, engine, tokens);
        let resp = coord.deploy(vec![], 0, SchedulingHints::default()).await.unwrap();
        assert!(resp.advertise_address.contains("engine-a") || resp.advertise_address.contains("engine-b"));
    }

    #[tokio::test]
    async fn deploy_fails_after_exhausting_retries() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-a", "http://engine-a:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        engine.fail_address("http://engine-a:9000");

        let coord = coordinator(registry, matches, scheduler, engine, tokens);
        let err = coord.deploy(vec![], 0, SchedulingHints::default()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::DeploymentFailed(_)));
    }

    #[tokio::test]
    async fn join_then_leave_round_trips_player_count() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        let coord = coordinator(registry, matches.clone(), scheduler, engine, tokens);
        let resp = coord.deploy(vec![], 2, SchedulingHints::default()).await.unwrap();

        let join = coord.join(&resp.match_id, &"player-1".to_string(), "Alice").await.unwrap();
        assert!(!join.match_token.is_empty());
        assert_eq!(matches.find(&resp.match_id).unwrap().unwrap().player_count, 1);

        coord.leave(&resp.match_id).unwrap();
        assert_eq!(matches.find(&resp.match_id).unwrap().unwrap().player_count, 0);
    }

    #[tokio::test]
    async fn join_full_match_fails_with_invalid_request() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        let coord = coordinator(registry, matches, scheduler, engine, tokens);
        let resp = coord.deploy(vec![], 1, SchedulingHints::default()).await.unwrap();

        coord.join(&resp.match_id, &"player-1".to_string(), "Alice").await.unwrap();
        let err = coord.join(&resp.match_id, &"player-2".to_string(), "Bob").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Match(stormstack_matches::MatchError::Full(_))));
    }

    /// `increment_players` is a single critical section (spec.md §5): firing
    /// more concurrent joins than `player_limit` must let exactly
    /// `player_limit` succeed, never more, regardless of interleaving.
    #[tokio::test]
    async fn concurrent_joins_never_exceed_player_limit() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        const PLAYER_LIMIT: u32 = 8;
        const ATTEMPTS: u32 = 40;

        let coord = Arc::new(coordinator(registry, matches.clone(), scheduler, engine, tokens));
        let resp = coord.deploy(vec![], PLAYER_LIMIT, SchedulingHints::default()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..ATTEMPTS {
            let coord = coord.clone();
            let match_id = resp.match_id.clone();
            handles.push(tokio::spawn(async move {
                coord.join(&match_id, &format!("player-{i}"), "p").await
            }));
        }

        let mut succeeded = 0;
        let mut full_failures = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(CoordinatorError::Match(stormstack_matches::MatchError::Full(_))) => full_failures += 1,
                Err(e) => panic!("unexpected join error: {e}"),
            }
        }

        assert_eq!(succeeded, PLAYER_LIMIT);
        assert_eq!(full_failures, ATTEMPTS - PLAYER_LIMIT);
        assert_eq!(matches.find(&resp.match_id).unwrap().unwrap().player_count, PLAYER_LIMIT);
    }

    #[tokio::test]
    async fn finish_transitions_to_finished() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        let coord = coordinator(registry, matches.clone(), scheduler, engine, tokens);
        let resp = coord.deploy(vec![], 0, SchedulingHints::default()).await.unwrap();

        coord.finish(&resp.match_id).await.unwrap();
        assert_eq!(matches.find(&resp.match_id).unwrap().unwrap().status, MatchStatus::Finished);
    }

    #[tokio::test]
    async fn delete_refuses_when_node_healthy_and_teardown_fails() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        let coord = coordinator(registry.clone(), matches.clone(), scheduler, engine.clone(), tokens);
        let resp = coord.deploy(vec![], 0, SchedulingHints::default()).await.unwrap();

        engine.fail_address("http://engine-1:9000");
        let err = coord.delete(&resp.match_id).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidRequest(_)));
        assert!(matches.find(&resp.match_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_succeeds_when_node_unhealthy_despite_teardown_failure() {
        let (registry, matches, scheduler, engine, tokens) = setup();
        registry
            .register("engine-1", "http://engine-1:9000", NodeCapacity { max_containers: 100 })
            .unwrap();
        let coord = coordinator(registry.clone(), matches.clone(), scheduler, engine.clone(), tokens);
        let resp = coord.deploy(vec![], 0, SchedulingHints::default()).await.unwrap();

        registry.drain("engine-1").unwrap();
        engine.fail_address("http://engine-1:9000");

        coord.delete(&resp.match_id).await.unwrap();
        assert!(matches.find(&resp.match_id).unwrap().is_none());
    }
}
