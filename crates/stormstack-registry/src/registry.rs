//! NodeRegistry (C1) — register/heartbeat/drain/expire engine nodes.
//!
//! Each mutating operation is a per-`node_id` critical section via
//! `KeyedLocks`: the get-then-put span against `StateStore` is not itself
//! atomic, so the lock is what actually serialises concurrent operations on
//! the same node (spec.md §5).

use stormstack_core::KeyedLocks;
use stormstack_core::ids::NodeId;
use stormstack_core::time::now_secs;
use stormstack_state::{Node, NodeCapacity, NodeMetrics, NodeStatus, StateStore};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};

pub struct NodeRegistry {
    state: StateStore,
    locks: KeyedLocks,
    ttl_secs: u64,
    grace_secs: u64,
}

impl NodeRegistry {
    pub fn new(state: StateStore, ttl_secs: u64, grace_secs: u64) -> Self {
        Self {
            state,
            locks: KeyedLocks::new(),
            ttl_secs,
            grace_secs,
        }
    }

    /// Register a node, or refresh it if it already exists and isn't OFFLINE.
    pub fn register(
        &self,
        node_id: &str,
        advertise_address: &str,
        capacity: NodeCapacity,
    ) -> RegistryResult<Node> {
        self.locks.with_lock(node_id, || {
            let now = now_secs();
            let existing = self.state.get_node(node_id)?;

            let node = match existing {
                Some(n) if n.status == NodeStatus::Draining => {
                    return Err(RegistryError::DrainingNodeReregister(node_id.to_string()));
                }
                Some(mut n) => {
                    n.advertise_address = advertise_address.to_string();
                    n.capacity = capacity;
                    n.status = NodeStatus::Healthy;
                    n.last_heartbeat = now;
                    n
                }
                None => Node {
                    node_id: node_id.to_string(),
                    advertise_address: advertise_address.to_string(),
                    status: NodeStatus::Healthy,
                    capacity,
                    metrics: NodeMetrics::default(),
                    registered_at: now,
                    last_heartbeat: now,
                },
            };

            self.state.put_node(&node)?;
            info!(%node_id, %advertise_address, "node registered");
            Ok(node)
        })
    }

    /// Record a heartbeat, resetting the TTL and reviving an UNHEALTHY node.
    pub fn heartbeat(&self, node_id: &str, metrics: NodeMetrics) -> RegistryResult<Node> {
        self.locks.with_lock(node_id, || {
            let mut node = self
                .state
                .get_node(node_id)?
                .ok_or_else(|| RegistryError::NodeNotFound(node_id.to_string()))?;

            node.metrics = metrics;
            node.last_heartbeat = now_secs();
            if node.status == NodeStatus::Unhealthy {
                node.status = NodeStatus::Healthy;
                info!(%node_id, "node recovered to HEALTHY on heartbeat");
            }

            self.state.put_node(&node)?;
            debug!(%node_id, "heartbeat recorded");
            Ok(node)
        })
    }

    /// Transition a node to DRAINING. Idempotent on DRAINING.
    pub fn drain(&self, node_id: &str) -> RegistryResult<Node> {
        self.locks.with_lock(node_id, || {
            let mut node = self
                .state
                .get_node(node_id)?
                .ok_or_else(|| RegistryError::NodeNotFound(node_id.to_string()))?;

            if node.status != NodeStatus::Draining {
                node.status = NodeStatus::Draining;
                self.state.put_node(&node)?;
                info!(%node_id, "node draining");
            }
            Ok(node)
        })
    }

    /// Move any non-OFFLINE node to OFFLINE and delete its record. Idempotent.
    pub fn deregister(&self, node_id: &str) -> RegistryResult<()> {
        self.locks.with_lock(node_id, || {
            self.state.delete_node(node_id)?;
            info!(%node_id, "node deregistered");
            Ok(())
        })
    }

    pub fn list(&self) -> RegistryResult<Vec<Node>> {
        Ok(self.state.list_nodes()?)
    }

    pub fn find(&self, node_id: &str) -> RegistryResult<Option<Node>> {
        Ok(self.state.get_node(node_id)?)
    }

    /// Expire stale nodes: HEALTHY/UNHEALTHY/DRAINING past `ttl` become
    /// UNHEALTHY; past `ttl + grace` are removed entirely. Returns the ids
    /// of nodes that were actually removed (not merely marked UNHEALTHY),
    /// so the caller can cascade-delete their hosted match records
    /// (spec.md: a match is deleted "when the hosting node record has been
    /// OFFLINE longer than the retention window").
    pub fn sweep(&self) -> RegistryResult<Vec<NodeId>> {
        let now = now_secs();
        let mut removed = Vec::new();

        for node in self.state.list_nodes()? {
            let age = now.saturating_sub(node.last_heartbeat);
            let node_id = node.node_id.clone();
            let was_removed: RegistryResult<bool> = self.locks.with_lock(&node_id, || {
                if age > self.ttl_secs + self.grace_secs {
                    self.state.delete_node(&node.node_id)?;
                    warn!(node_id = %node.node_id, age, "node expired past grace, removed");
                    Ok(true)
                } else if age > self.ttl_secs && node.status == NodeStatus::Healthy {
                    let mut n = node;
                    n.status = NodeStatus::Unhealthy;
                    self.state.put_node(&n)?;
                    warn!(node_id = %n.node_id, age, "node missed heartbeats, marked UNHEALTHY");
                    Ok(false)
                } else {
                    Ok(false)
                }
            });
            if was_removed? {
                removed.push(node_id);
            }
        }

        Ok(removed)
    }
}
