use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::blocking::run_blocking;
use crate::AppError;
use backend_domain::ports::{run_in_transaction, RegistryBackend, ScanLogFilter, TicketStore};
use backend_domain::{utc_now, RegistrySummary, Ticket};

/// Pulls the event registry and replaces the local snapshot of that event.
///
/// Refuses with `Conflict` while scans of the event are still unsynced,
/// unless `force` is set. Scan logs themselves are never deleted here.
pub async fn download_registry(
    store: Arc<dyn TicketStore>,
    backend: &dyn RegistryBackend,
    event_id: &str,
    force: bool,
) -> Result<RegistrySummary, AppError> {
    let event_id = event_id.trim().to_string();
    if event_id.is_empty() {
        return Err(AppError::Validation("event id is required".to_string()));
    }

    if !force {
        let pending = {
            let store = store.clone();
            let filter = ScanLogFilter::for_event(&event_id).unsynced();
            run_blocking(move || store.scan_logs(&filter)).await?.len()
        };
        if pending > 0 {
            return Err(unsynced_conflict(&event_id, pending));
        }
    }

    let registry = backend.fetch_registry(&event_id).await?;
    if registry.event_id.trim() != event_id {
        return Err(AppError::Validation(format!(
            "backend returned registry for event '{}' instead of '{}'",
            registry.event_id, event_id
        )));
    }

    let mut seen = HashSet::new();
    let mut tickets: Vec<Ticket> = Vec::with_capacity(registry.tickets.len());
    let mut skipped = 0usize;
    for entry in registry.tickets.iter().cloned() {
        let foreign = !entry.event_id.trim().is_empty() && entry.event_id.trim() != event_id;
        let ticket = entry.into_ticket(&event_id);
        if foreign || ticket.ticket_id.is_empty() || !seen.insert(ticket.ticket_id.clone()) {
            skipped += 1;
            continue;
        }
        tickets.push(ticket);
    }
    if skipped > 0 {
        warn!(
            "skipped {} registry entries for event {} (blank, duplicate or foreign ticket ids)",
            skipped, event_id
        );
    }

    let downloaded_at = utc_now();
    let event = registry.to_event(downloaded_at, tickets.len());
    let stored = tickets.len();
    let pending = {
        let store = store.clone();
        let event_id = event_id.clone();
        run_blocking(move || {
            run_in_transaction(store.as_ref(), |tx| {
                if !force {
                    let pending =
                        tx.count_scan_logs(&ScanLogFilter::for_event(&event_id).unsynced())?;
                    if pending > 0 {
                        return Ok(Some(pending));
                    }
                }
                tx.delete_tickets(&event_id)?;
                tx.put_event(&event)?;
                for ticket in &tickets {
                    tx.put_ticket(ticket)?;
                }
                Ok(None)
            })
        })
        .await?
    };
    if let Some(pending) = pending {
        return Err(unsynced_conflict(&event_id, pending));
    }

    info!(
        "downloaded registry for event {} ({} tickets)",
        event_id, stored
    );
    Ok(RegistrySummary {
        event_id,
        event_name: registry.event_name,
        tickets_stored: stored,
        tickets_skipped: skipped,
        downloaded_at,
    })
}

/// Logout: removes every local event, ticket and scan log.
pub async fn purge_local_data(store: Arc<dyn TicketStore>) -> Result<(), AppError> {
    run_blocking(move || run_in_transaction(store.as_ref(), |tx| tx.purge())).await?;
    warn!("purged all local events, tickets and scan logs");
    Ok(())
}

fn unsynced_conflict(event_id: &str, pending: usize) -> AppError {
    AppError::Conflict(format!(
        "{} scans for event {} are not synced yet; sync first or force the download",
        pending, event_id
    ))
}
