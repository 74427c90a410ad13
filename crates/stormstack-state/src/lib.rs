//! stormstack-state — embedded state store for the control plane.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and
//! in-memory state management for nodes, match registry entries, and
//! module metadata (the records owned by C1, C2, and C3 respectively).
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns,
//! keyed per spec.md §6's persisted state layout.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
