//! TokenIssuer and identity pass-through error types.

use stormstack_core::error::{ErrorCode, HasErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token authentication failed: {0}")]
    NodeAuthenticationFailed(String),

    #[error("identity service error: {0}")]
    AuthServiceError(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl HasErrorCode for TokenError {
    fn error_code(&self) -> ErrorCode {
        match self {
            TokenError::NodeAuthenticationFailed(_) => ErrorCode::NodeAuthenticationFailed,
            TokenError::AuthServiceError(_) => ErrorCode::AuthServiceError,
            TokenError::Unauthorized(_) => ErrorCode::Unauthorized,
        }
    }
}

pub type TokenResult<T> = Result<T, TokenError>;
