//! Background TTL sweeper for the node registry (spec.md §4.1).

use std::sync::Arc;
use std::time::Duration;

use stormstack_core::ids::NodeId;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::registry::NodeRegistry;

/// Runs `NodeRegistry::sweep` on a fixed cadence until `shutdown` fires.
///
/// `on_removed` is invoked once per node id that `sweep` actually deletes
/// (grace-expired, not merely marked UNHEALTHY) — the registry crate has no
/// knowledge of match records, so the caller wires in whatever needs to
/// react to a node's removal (e.g. cascading `MatchRegistry::delete_for_node`).
pub async fn run<F>(
    registry: Arc<NodeRegistry>,
    sweep_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut on_removed: F,
) where
    F: FnMut(&NodeId) + Send,
{
    let mut ticker = tokio::time::interval(sweep_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match registry.sweep() {
                    Ok(removed) if !removed.is_empty() => {
                        debug!(count = removed.len(), "sweeper removed nodes");
                        for node_id in &removed {
                            on_removed(node_id);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "node sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("node sweeper shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use stormstack_state::{NodeCapacity, StateStore};

    /// With `ttl_secs = 0, grace_secs = 0`, a node is already past
    /// `ttl + grace` on its very first tick, so the sweeper removes it
    /// outright instead of first marking it UNHEALTHY — `on_removed` must
    /// fire for it.
    #[tokio::test]
    async fn on_removed_fires_for_a_node_the_sweep_deletes() {
        let registry = Arc::new(NodeRegistry::new(StateStore::open_in_memory().unwrap(), 0, 0));
        registry
            .register("node-1", "http://10.0.0.1:9000", NodeCapacity { max_containers: 10 })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let removed = Arc::new(Mutex::new(Vec::new()));
        let removed_clone = removed.clone();

        let handle = tokio::spawn(run(registry.clone(), Duration::from_millis(10), shutdown_rx, move |id| {
            removed_clone.lock().unwrap().push(id.clone());
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(removed.lock().unwrap().as_slice(), ["node-1"]);
        assert!(registry.find("node-1").unwrap().is_none());
    }
}
