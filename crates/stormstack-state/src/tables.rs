//! redb table definitions for the control-plane state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Keys follow spec.md §6's persisted state layout.

use redb::TableDefinition;

/// Nodes keyed by `node_id`.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Match registry entries keyed by `match_id`.
pub const MATCHES: TableDefinition<&str, &[u8]> = TableDefinition::new("matches");

/// Module metadata keyed by `{name}:{version}`.
pub const MODULES: TableDefinition<&str, &[u8]> = TableDefinition::new("modules");
