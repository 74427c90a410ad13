//! stormstack-scheduler — picks a node for a new match (C4).
//!
//! Reads the live `Node` set from `stormstack-state` and applies a
//! least-loaded-with-hint selection (spec.md §4.4). Stateless beyond the
//! store itself: every call re-reads the current registry snapshot.

pub mod error;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{RequiredCapabilities, Scheduler, SchedulingHints};
