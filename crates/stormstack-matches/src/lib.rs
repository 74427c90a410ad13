//! stormstack-matches — the control plane's match registry (C2).
//!
//! Owns the authoritative mapping from `match_id` to hosting node,
//! container, status, and player roster. Other components only ever
//! read through this crate's views; writes go through its operations so
//! the fullness and terminal-state invariants stay centralised.

pub mod error;
pub mod registry;

pub use error::{MatchError, MatchResult};
pub use registry::MatchRegistry;
