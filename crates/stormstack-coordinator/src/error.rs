//! MatchCoordinator error types.

use stormstack_core::error::{ErrorCode, HasErrorCode};
use stormstack_matches::MatchError;
use stormstack_registry::RegistryError;
use stormstack_scheduler::SchedulerError;
use stormstack_tokens::TokenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("deployment failed after exhausting retries: {0}")]
    DeploymentFailed(String),

    #[error("match precondition failed: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl HasErrorCode for CoordinatorError {
    fn error_code(&self) -> ErrorCode {
        match self {
            CoordinatorError::DeploymentFailed(_) => ErrorCode::DeploymentFailed,
            CoordinatorError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            CoordinatorError::Scheduler(e) => e.error_code(),
            CoordinatorError::Match(e) => e.error_code(),
            CoordinatorError::Registry(e) => e.error_code(),
            CoordinatorError::Token(e) => e.error_code(),
        }
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
