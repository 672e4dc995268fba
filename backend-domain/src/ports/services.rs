use async_trait::async_trait;

use crate::entities::{RegistryDownload, SyncAck, SyncBatch};
use crate::errors::BackendError;

/// The authoritative remote registry.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    async fn fetch_registry(&self, event_id: &str) -> Result<RegistryDownload, BackendError>;
    /// `idempotency_key` identifies the exact set of scans in `batch`.
    async fn upload_scans(
        &self,
        batch: &SyncBatch,
        idempotency_key: &str,
    ) -> Result<SyncAck, BackendError>;
}
