//! stormstack-coordinator — MatchCoordinator (C5): end-to-end match
//! creation/teardown and join/leave, the transactional glue over
//! NodeRegistry, MatchRegistry, Scheduler, TokenIssuer, and `EngineNode`.

pub mod coordinator;
pub mod engine_node;
pub mod error;

pub use coordinator::{JoinResponse, MatchCoordinator, MatchResponse};
pub use engine_node::{ContainerHandle, EngineNode, HttpEngineNode};
pub use error::{CoordinatorError, CoordinatorResult};
