use stormstack_core::error::{ErrorCode, HasErrorCode};
use thiserror::Error;

pub type MatchResult<T> = Result<T, MatchError>;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("match not found: {0}")]
    NotFound(String),

    #[error("match already exists: {0}")]
    AlreadyExists(String),

    #[error("match is full: {0}")]
    Full(String),

    #[error("state store error: {0}")]
    State(#[from] stormstack_state::StateError),
}

impl HasErrorCode for MatchError {
    fn error_code(&self) -> ErrorCode {
        match self {
            MatchError::NotFound(_) => ErrorCode::MatchNotFound,
            MatchError::AlreadyExists(_) => ErrorCode::MatchAlreadyExists,
            MatchError::Full(_) => ErrorCode::MatchFull,
            MatchError::State(_) => ErrorCode::Internal,
        }
    }
}
