use anyhow::anyhow;

use backend_domain::StoreError;

use crate::AppError;

/// Runs synchronous store work on the blocking pool.
pub async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Internal(anyhow!("store task aborted: {}", err)))?
        .map_err(AppError::from)
}
