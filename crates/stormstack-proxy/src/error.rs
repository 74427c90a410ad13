//! ProxyRouter error types.

use stormstack_core::error::{ErrorCode, HasErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxying is globally disabled")]
    Disabled,

    #[error("match {0} not found")]
    MatchNotFound(String),

    #[error("hosting node unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("hosting node did not respond within the deadline")]
    UpstreamTimeout,

    #[error(transparent)]
    Match(#[from] stormstack_matches::MatchError),
}

impl HasErrorCode for ProxyError {
    fn error_code(&self) -> ErrorCode {
        match self {
            ProxyError::Disabled => ErrorCode::ProxyDisabled,
            ProxyError::MatchNotFound(_) => ErrorCode::MatchNotFound,
            ProxyError::UpstreamUnreachable(_) => ErrorCode::UpstreamUnreachable,
            ProxyError::UpstreamTimeout => ErrorCode::UpstreamTimeout,
            ProxyError::Match(_) => ErrorCode::MatchNotFound,
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
