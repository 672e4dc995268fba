use std::collections::BTreeSet;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::blocking::run_blocking;
use crate::AppError;
use backend_domain::ports::{
    run_in_transaction, RegistryBackend, ScanLogFilter, TicketFilter, TicketStore,
};
use backend_domain::{ScanLog, SyncBatch, SyncReport, SyncResult};

/// Uploads unsynced scans of one event and marks them synced once the
/// backend acknowledges. Retry policy belongs to the caller.
///
/// Syncs through one reconciler run one at a time; a caller that overlaps
/// them waits and then only sees scans the first sync did not mark.
pub struct SyncReconciler {
    store: Arc<dyn TicketStore>,
    backend: Arc<dyn RegistryBackend>,
    in_flight: Mutex<()>,
}

impl SyncReconciler {
    pub fn new(store: Arc<dyn TicketStore>, backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            store,
            backend,
            in_flight: Mutex::new(()),
        }
    }

    pub async fn sync_event(&self, event_id: &str) -> Result<SyncResult, AppError> {
        let event_id = event_id.trim().to_string();
        if event_id.is_empty() {
            return Err(AppError::Validation("event id is required".to_string()));
        }
        let _guard = self.in_flight.lock().await;

        let pending = {
            let store = self.store.clone();
            let event_id = event_id.clone();
            run_blocking(move || {
                if store.event(&event_id)?.is_none() {
                    return Ok(None);
                }
                let logs = store.scan_logs(&ScanLogFilter::for_event(&event_id).unsynced())?;
                let verified = store
                    .tickets(&TicketFilter::for_event(&event_id).verified(true))?
                    .len();
                Ok(Some((logs, verified)))
            })
            .await?
        };
        let Some((logs, verified)) = pending else {
            return Err(AppError::NotFound(format!("event {}", event_id)));
        };

        let Some(batch) = SyncBatch::from_logs(&event_id, verified as u64, &logs) else {
            info!("nothing to sync for event {}", event_id);
            return Ok(SyncResult::NothingToSync { event_id });
        };

        let log_ids: Vec<String> = logs.iter().map(|log| log.id.clone()).collect();
        let idempotency_key = batch_idempotency_key(&log_ids);
        info!(
            "uploading {} scans for event {} (batch {})",
            log_ids.len(),
            event_id,
            &idempotency_key[..12]
        );

        let ack = self
            .backend
            .upload_scans(&batch, &idempotency_key)
            .await
            .map_err(|err| {
                warn!("sync upload for event {} failed: {}", event_id, err);
                AppError::Network(err)
            })?;

        let ticket_ids = verified_ticket_ids(&logs);
        let scans_sent = log_ids.len();
        let tickets_marked = {
            let store = self.store.clone();
            let event_id = event_id.clone();
            let synced_at = ack.synced_at;
            run_blocking(move || {
                run_in_transaction(store.as_ref(), |tx| {
                    tx.mark_scan_logs_synced(&log_ids)?;
                    let marked = tx.mark_tickets_synced(&event_id, &ticket_ids)?;
                    tx.set_event_synced(&event_id, synced_at)?;
                    Ok(marked)
                })
            })
            .await?
        };

        info!(
            "synced {} scans and {} tickets for event {}",
            scans_sent, tickets_marked, event_id
        );
        Ok(SyncResult::Synced(SyncReport {
            event_id,
            scans_sent,
            tickets_marked,
            synced_at: ack.synced_at,
        }))
    }
}

/// SHA-256 over the sorted scan log ids, hex encoded.
pub fn batch_idempotency_key(log_ids: &[String]) -> String {
    let mut ids: Vec<&str> = log_ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn verified_ticket_ids(logs: &[ScanLog]) -> Vec<String> {
    logs.iter()
        .filter(|log| log.status.is_success())
        .map(|log| log.ticket_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_ignores_input_order() {
        let a = batch_idempotency_key(&["b".to_string(), "a".to_string()]);
        let b = batch_idempotency_key(&["a".to_string(), "b".to_string()]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, batch_idempotency_key(&["a".to_string()]));
    }
}
