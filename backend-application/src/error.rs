use thiserror::Error;

use backend_domain::{BackendError, StoreError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unknown scanner '{0}', reconnect first")]
    UnknownScanner(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Network(#[from] BackendError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
