use std::time::Instant;

use tracing::{error, info, warn};

use crate::blocking::run_blocking;
use crate::{AppError, AppState};
use backend_domain::{
    AdminFeedMessage, ScanStatus, ScannerId, VerifyAttempt, VerifyRequest, VerifyResponse,
};

/// Verifies one scanned ticket for the event this server was started with.
///
/// Not-found and already-verified tickets are outcomes, not errors: they come
/// back as a response with `success == false`.
pub async fn verify_ticket(
    state: &AppState,
    request: VerifyRequest,
    received_at: Instant,
) -> Result<VerifyResponse, AppError> {
    let ticket_id = required(request.ticket_id, "ticketId")?;
    let scanner_id = ScannerId(required(request.scanner_id, "scannerId")?);

    let scanner = {
        let scanners = state.scanners.read().await;
        scanners.get(&scanner_id).map(|session| session.identity())
    }
    .ok_or_else(|| AppError::UnknownScanner(scanner_id.0.clone()))?;

    let attempt = VerifyAttempt::new(&state.event.event_id, &ticket_id, scanner, received_at);
    let store = state.store.clone();
    let engine = state.engine;
    let outcome = run_blocking(move || engine.verify(store.as_ref(), &attempt))
        .await
        .map_err(|err| {
            error!("verify of ticket {} failed: {}", ticket_id, err);
            err
        })?;

    if outcome.is_success() {
        let mut scanners = state.scanners.write().await;
        if let Some(session) = scanners.get_mut(&scanner_id) {
            session.record_scan(outcome.scan_log.timestamp);
        }
    }
    state.metrics.record_scan(outcome.status);
    state.scan_feed.record_scan(outcome.scan_log.clone()).await;
    let stats = state.metrics.snapshot(state.active_scanners().await);
    state.scan_feed.publish(AdminFeedMessage::Scan {
        scan: outcome.scan_log.clone(),
        stats,
    });

    let log = &outcome.scan_log;
    match outcome.status {
        ScanStatus::Success => info!(
            "ticket {} verified by {} in {:.1}ms",
            log.ticket_id, log.scanner_name, outcome.committed_latency_ms
        ),
        ScanStatus::AlreadyVerified => warn!(
            "ticket {} rescanned by {}: {}",
            log.ticket_id, log.scanner_name, outcome.message
        ),
        ScanStatus::Failed => warn!(
            "ticket {} scanned by {} not found for event {}",
            log.ticket_id, log.scanner_name, log.event_id
        ),
    }

    Ok(outcome.to_response())
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}
