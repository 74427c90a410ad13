//! Scheduler error types.

use stormstack_core::error::{ErrorCode, HasErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no available nodes: HEALTHY nodes exist but all are at capacity")]
    NoAvailableNodes,

    #[error("no capable nodes: no HEALTHY nodes in the cluster")]
    NoCapableNodes,

    #[error("state store error: {0}")]
    State(#[from] stormstack_state::StateError),
}

impl HasErrorCode for SchedulerError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SchedulerError::NoAvailableNodes => ErrorCode::NoAvailableNodes,
            SchedulerError::NoCapableNodes => ErrorCode::NoCapableNodes,
            SchedulerError::State(_) => ErrorCode::Internal,
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
