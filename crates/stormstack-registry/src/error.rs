use stormstack_core::error::{ErrorCode, HasErrorCode};
use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node {0} is draining and must call register() to rejoin")]
    DrainingNodeReregister(String),

    #[error("state store error: {0}")]
    State(#[from] stormstack_state::StateError),
}

impl HasErrorCode for RegistryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RegistryError::NodeNotFound(_) => ErrorCode::NodeNotFound,
            RegistryError::DrainingNodeReregister(_) => ErrorCode::DrainingNodeReregister,
            RegistryError::State(_) => ErrorCode::Internal,
        }
    }
}
