use std::sync::Arc;

use crate::blocking::run_blocking;
use crate::AppError;
use backend_domain::ports::{ScanLogFilter, TicketFilter, TicketStore};
use backend_domain::{Event, EventSummary, ScanLog};

const MAX_LOG_LIMIT: usize = 1000;

/// Looks up an event that is ready for scanning.
pub async fn scannable_event(store: Arc<dyn TicketStore>, event_id: &str) -> Result<Event, AppError> {
    let id = event_id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::Validation("event id is required".to_string()));
    }
    let event = {
        let id = id.clone();
        run_blocking(move || store.event(&id)).await?
    };
    match event {
        Some(event) if event.has_registry() => Ok(event),
        Some(_) => Err(AppError::NotFound(format!(
            "registry for event {} has not been downloaded",
            id
        ))),
        None => Err(AppError::NotFound(format!("event {}", id))),
    }
}

pub async fn list_events(store: Arc<dyn TicketStore>) -> Result<Vec<EventSummary>, AppError> {
    run_blocking(move || {
        let mut summaries = Vec::new();
        for event in store.events()? {
            let tickets = store.tickets(&TicketFilter::for_event(&event.event_id))?;
            let verified_count = tickets.iter().filter(|ticket| ticket.verified).count();
            let unsynced_scans = store
                .scan_logs(&ScanLogFilter::for_event(&event.event_id).unsynced())?
                .len();
            summaries.push(EventSummary {
                event,
                ticket_count: tickets.len(),
                verified_count,
                unsynced_scans,
            });
        }
        Ok(summaries)
    })
    .await
}

/// Most recent scan logs of an event, newest first.
pub async fn list_scan_logs(
    store: Arc<dyn TicketStore>,
    event_id: &str,
    limit: usize,
) -> Result<Vec<ScanLog>, AppError> {
    let filter = ScanLogFilter::for_event(event_id.trim()).newest_first(limit.clamp(1, MAX_LOG_LIMIT));
    run_blocking(move || store.scan_logs(&filter)).await
}
