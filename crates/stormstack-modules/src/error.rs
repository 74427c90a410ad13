use stormstack_core::error::{ErrorCode, HasErrorCode};
use thiserror::Error;

pub type ModuleResult<T> = Result<T, ModuleError>;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module not found: {0}:{1}")]
    NotFound(String, String),

    #[error("module {0}:{1} already exists with a different checksum")]
    VersionConflict(String, String),

    #[error("module exceeds max_file_size ({0} > {1} bytes)")]
    TooLarge(u64, u64),

    #[error("distribution to one or more nodes failed")]
    DistributionFailed,

    #[error("blob store error: {0}")]
    Blob(#[from] std::io::Error),

    #[error("state store error: {0}")]
    State(#[from] stormstack_state::StateError),
}

impl HasErrorCode for ModuleError {
    fn error_code(&self) -> ErrorCode {
        match self {
            ModuleError::NotFound(..) => ErrorCode::ModuleNotFound,
            ModuleError::VersionConflict(..) => ErrorCode::ModuleVersionConflict,
            ModuleError::DistributionFailed => ErrorCode::ModuleDistributionFailed,
            ModuleError::TooLarge(..) => ErrorCode::InvalidRequest,
            ModuleError::Blob(_) | ModuleError::State(_) => ErrorCode::Internal,
        }
    }
}
