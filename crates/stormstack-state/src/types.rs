//! Domain types persisted by the control plane's state store.
//!
//! These mirror the data model owned by C1/C2/C3 (nodes, match registry
//! entries, module metadata). All types are JSON-serialized into redb for
//! storage.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use stormstack_core::ids::{MatchId, ModuleName, ModuleVersion, NodeId};

// ── Node (C1) ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Healthy,
    Unhealthy,
    Draining,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeCapacity {
    pub max_containers: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeMetrics {
    pub containers: u32,
    pub matches: u32,
    pub cpu_usage: f64,
    pub mem_used_mb: u64,
    pub mem_max_mb: u64,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        NodeMetrics {
            containers: 0,
            matches: 0,
            cpu_usage: 0.0,
            mem_used_mb: 0,
            mem_max_mb: 0,
        }
    }
}

/// A registered engine node (spec.md §3 `Node`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub node_id: NodeId,
    pub advertise_address: String,
    pub status: NodeStatus,
    pub capacity: NodeCapacity,
    pub metrics: NodeMetrics,
    pub registered_at: u64,
    pub last_heartbeat: u64,
}

impl Node {
    pub fn table_key(&self) -> &str {
        &self.node_id
    }
}

// ── MatchRegistryEntry (C2) ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Running,
    Full,
    Finished,
    Error,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Error)
    }
}

/// Authoritative record of a match's hosting node and player roster
/// (spec.md §3 `MatchRegistryEntry`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRegistryEntry {
    pub match_id: MatchId,
    pub node_id: NodeId,
    pub container_id: String,
    pub status: MatchStatus,
    pub module_names: Vec<ModuleName>,
    pub created_at: u64,
    /// Snapshot of the node's address at creation time, so routing keeps
    /// working even if the node record later disappears.
    pub advertise_address: String,
    pub websocket_url: String,
    pub player_count: u32,
    /// 0 means unlimited.
    pub player_limit: u32,
}

impl MatchRegistryEntry {
    pub fn table_key(&self) -> &str {
        &self.match_id
    }

    pub fn is_full(&self) -> bool {
        self.player_limit > 0 && self.player_count >= self.player_limit
    }
}

// ── ModuleMetadata (C3) ──────────────────────────────────────────────

/// Metadata for an uploadable module artifact (spec.md §3
/// `ModuleMetadata`). Blob bytes live in `ModuleBlobStore`, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleMetadata {
    pub name: ModuleName,
    pub version: ModuleVersion,
    pub file_name: String,
    pub file_size: u64,
    /// SHA-256 hex digest of the uploaded bytes.
    pub checksum: String,
    pub uploaded_at: u64,
    pub uploaded_by: String,
    pub distributed_to: HashSet<NodeId>,
}

impl ModuleMetadata {
    pub fn table_key(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}
