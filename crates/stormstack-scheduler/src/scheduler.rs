//! Scheduler (C4) — pick a node for a new match from the NodeRegistry view.

use stormstack_core::ids::NodeId;
use stormstack_state::{Node, NodeStatus, StateStore};

use crate::error::{SchedulerError, SchedulerResult};

/// Hints that narrow or bias candidate selection.
#[derive(Debug, Clone, Default)]
pub struct SchedulingHints {
    /// If present and the node is a valid candidate, it is returned directly.
    pub preferred_node_id: Option<NodeId>,
    /// Nodes to exclude, e.g. because a prior placement attempt on them failed.
    pub excluded: Vec<NodeId>,
}

/// Reserved for future module-prerequisite filtering; current
/// implementations treat it as empty and ignore it (spec.md §4.4).
pub type RequiredCapabilities = Vec<String>;

pub struct Scheduler {
    state: StateStore,
}

impl Scheduler {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    /// Least-loaded-with-hint selection (spec.md §4.4).
    pub fn select(
        &self,
        _required_capabilities: &RequiredCapabilities,
        hints: &SchedulingHints,
    ) -> SchedulerResult<NodeId> {
        let nodes = self.state.list_nodes()?;

        let healthy_exists = nodes.iter().any(|n| n.status == NodeStatus::Healthy);

        let mut candidates: Vec<Node> = nodes
            .into_iter()
            .filter(|n| {
                n.status == NodeStatus::Healthy
                    && n.metrics.containers < n.capacity.max_containers
                    && !hints.excluded.contains(&n.node_id)
            })
            .collect();

        if let Some(preferred) = &hints.preferred_node_id {
            if let Some(node) = candidates.iter().find(|n| &n.node_id == preferred) {
                return Ok(node.node_id.clone());
            }
        }

        if candidates.is_empty() {
            return Err(if healthy_exists {
                SchedulerError::NoAvailableNodes
            } else {
                SchedulerError::NoCapableNodes
            });
        }

        candidates.sort_by(|a, b| {
            let sat_a = saturation(a);
            let sat_b = saturation(b);
            sat_a
                .partial_cmp(&sat_b)
                .unwrap()
                .then_with(|| a.metrics.cpu_usage.partial_cmp(&b.metrics.cpu_usage).unwrap())
                .then_with(|| a.node_id.cmp(&b.node_id))
        });

        Ok(candidates[0].node_id.clone())
    }
}

fn saturation(node: &Node) -> f64 {
    node.metrics.containers as f64 / node.capacity.max_containers as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use stormstack_state::{NodeCapacity, NodeMetrics};

    fn node(id: &str, containers: u32, max: u32, cpu_usage: f64, status: NodeStatus) -> Node {
        Node {
            node_id: id.to_string(),
            advertise_address: format!("http://{id}:9000"),
            status,
            capacity: NodeCapacity { max_containers: max },
            metrics: NodeMetrics {
                containers,
                matches: 0,
                cpu_usage,
                mem_used_mb: 0,
                mem_max_mb: 0,
            },
            registered_at: 0,
            last_heartbeat: 0,
        }
    }

    fn state_with(nodes: Vec<Node>) -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        for n in nodes {
            store.put_node(&n).unwrap();
        }
        store
    }

    #[test]
    fn picks_least_saturated_node() {
        let state = state_with(vec![
            node("node-a", 8, 10, 0.5, NodeStatus::Healthy),
            node("node-b", 2, 10, 0.5, NodeStatus::Healthy),
        ]);
        let scheduler = Scheduler::new(state);
        let chosen = scheduler.select(&vec![], &SchedulingHints::default()).unwrap();
        assert_eq!(chosen, "node-b");
    }

    #[test]
    fn ties_broken_by_cpu_usage_then_node_id() {
        let state = state_with(vec![
            node("node-b", 5, 10, 0.9, NodeStatus::Healthy),
            node("node-a", 5, 10, 0.1, NodeStatus::Healthy),
        ]);
        let scheduler = Scheduler::new(state);
        let chosen = scheduler.select(&vec![], &SchedulingHints::default()).unwrap();
        assert_eq!(chosen, "node-a");
    }

    #[test]
    fn exact_saturation_and_cpu_tie_breaks_lexicographically() {
        let state = state_with(vec![
            node("node-z", 5, 10, 0.5, NodeStatus::Healthy),
            node("node-a", 5, 10, 0.5, NodeStatus::Healthy),
        ]);
        let scheduler = Scheduler::new(state);
        let chosen = scheduler.select(&vec![], &SchedulingHints::default()).unwrap();
        assert_eq!(chosen, "node-a");
    }

    #[test]
    fn preferred_node_shortcuts_scoring() {
        let state = state_with(vec![
            node("node-a", 1, 10, 0.1, NodeStatus::Healthy),
            node("node-b", 9, 10, 0.1, NodeStatus::Healthy),
        ]);
        let scheduler = Scheduler::new(state);
        let hints = SchedulingHints {
            preferred_node_id: Some("node-b".to_string()),
            excluded: vec![],
        };
        assert_eq!(scheduler.select(&vec![], &hints).unwrap(), "node-b");
    }

    #[test]
    fn preferred_node_ignored_if_not_a_candidate() {
        let state = state_with(vec![
            node("node-a", 1, 10, 0.1, NodeStatus::Healthy),
            node("node-b", 10, 10, 0.1, NodeStatus::Healthy),
        ]);
        let scheduler = Scheduler::new(state);
        let hints = SchedulingHints {
            preferred_node_id: Some("node-b".to_string()),
            excluded: vec![],
        };
        assert_eq!(scheduler.select(&vec![], &hints).unwrap(), "node-a");
    }

    #[test]
    fn excluded_nodes_are_skipped() {
        let state = state_with(vec![
            node("node-a", 1, 10, 0.1, NodeStatus::Healthy),
            node("node-b", 2, 10, 0.1, NodeStatus::Healthy),
        ]);
        let scheduler = Scheduler::new(state);
        let hints = SchedulingHints {
            preferred_node_id: None,
            excluded: vec!["node-a".to_string()],
        };
        assert_eq!(scheduler.select(&vec![], &hints).unwrap(), "node-b");
    }

    #[test]
    fn no_available_nodes_when_all_at_capacity() {
        let state = state_with(vec![node("node-a", 10, 10, 0.1, NodeStatus::Healthy)]);
        let scheduler = Scheduler::new(state);
        assert!(matches!(
            scheduler.select(&vec![], &SchedulingHints::default()),
            Err(SchedulerError::NoAvailableNodes)
        ));
    }

    #[test]
    fn no_capable_nodes_when_none_healthy() {
        let state = state_with(vec![node("node-a", 1, 10, 0.1, NodeStatus::Draining)]);
        let scheduler = Scheduler::new(state);
        assert!(matches!(
            scheduler.select(&vec![], &SchedulingHints::default()),
            Err(SchedulerError::NoCapableNodes)
        ));
    }
}
