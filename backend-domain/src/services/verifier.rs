use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::entities::{ScanLog, Ticket, TicketData, VerifyResponse};
use crate::errors::StoreError;
use crate::ports::{run_in_transaction, StoreTx, TicketStore};
use crate::utils::utc_now;
use crate::value_objects::{ScanStatus, ScannerIdentity, TicketKey};

/// One scan request as it reaches the engine.
#[derive(Debug, Clone)]
pub struct VerifyAttempt {
    pub key: TicketKey,
    pub scanner: ScannerIdentity,
    pub received_at: Instant,
}

impl VerifyAttempt {
    /// Ticket ids are matched case-sensitively; only surrounding whitespace is dropped.
    pub fn new(event_id: &str, raw_ticket_id: &str, scanner: ScannerIdentity, received_at: Instant) -> Self {
        Self {
            key: TicketKey::new(event_id, raw_ticket_id.trim()),
            scanner,
            received_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub status: ScanStatus,
    pub message: String,
    /// The ticket after the attempt, if it exists.
    pub ticket: Option<Ticket>,
    pub scan_log: ScanLog,
    /// Receipt to transaction commit. Equals `scan_log.latency_ms` until
    /// [`VerificationEngine::verify`] has committed.
    pub committed_latency_ms: f64,
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Original verifier of the ticket, for success and already-verified outcomes.
    pub fn verified_by(&self) -> Option<(&str, DateTime<Utc>)> {
        self.ticket.as_ref().and_then(Ticket::verified_by)
    }

    pub fn to_response(&self) -> VerifyResponse {
        let ticket_data = self.ticket.as_ref().map(|ticket| {
            let verifier = ticket.verified_by();
            TicketData {
                attendee_name: ticket.attendee_name.clone(),
                ticket_type: ticket.ticket_type.clone(),
                verified_at: verifier.map(|(_, at)| at),
                verified_by: verifier.map(|(name, _)| name.to_string()),
            }
        });
        VerifyResponse {
            success: self.is_success(),
            status: self.status,
            message: self.message.clone(),
            ticket_data,
        }
    }
}

/// Decides scan outcomes. Every attempt leaves exactly one scan log row.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerificationEngine;

impl VerificationEngine {
    /// Runs the whole check-then-set inside one store transaction, so two
    /// scanners racing on the same ticket cannot both succeed.
    pub fn verify(
        &self,
        store: &dyn TicketStore,
        attempt: &VerifyAttempt,
    ) -> Result<VerificationOutcome, StoreError> {
        let mut outcome = run_in_transaction(store, |tx| self.verify_in(tx, attempt))?;
        outcome.committed_latency_ms = elapsed_ms(attempt.received_at);
        Ok(outcome)
    }

    pub fn verify_in(
        &self,
        tx: &mut dyn StoreTx,
        attempt: &VerifyAttempt,
    ) -> Result<VerificationOutcome, StoreError> {
        let now = utc_now();

        let Some(mut ticket) = tx.ticket(&attempt.key)? else {
            let scan_log = ScanLog::record(
                &attempt.key,
                &attempt.scanner,
                ScanStatus::Failed,
                now,
                elapsed_ms(attempt.received_at),
                Some("ticket not found".to_string()),
            );
            tx.append_scan_log(&scan_log)?;
            return Ok(VerificationOutcome {
                status: ScanStatus::Failed,
                message: format!("Ticket {} not found for this event", attempt.key.ticket_id),
                ticket: None,
                committed_latency_ms: scan_log.latency_ms,
                scan_log,
            });
        };

        if !ticket.stamp_verification(&attempt.scanner, now) {
            let (message, error_message) = match ticket.verified_by() {
                Some((name, at)) => (
                    format!("Ticket already verified by {} at {}", name, at.to_rfc3339()),
                    format!("already verified by {}", name),
                ),
                None => (
                    "Ticket already verified".to_string(),
                    "already verified".to_string(),
                ),
            };
            let scan_log = ScanLog::record(
                &attempt.key,
                &attempt.scanner,
                ScanStatus::AlreadyVerified,
                now,
                elapsed_ms(attempt.received_at),
                Some(error_message),
            );
            tx.append_scan_log(&scan_log)?;
            return Ok(VerificationOutcome {
                status: ScanStatus::AlreadyVerified,
                message,
                ticket: Some(ticket),
                committed_latency_ms: scan_log.latency_ms,
                scan_log,
            });
        }

        tx.put_ticket(&ticket)?;
        let scan_log = ScanLog::record(
            &attempt.key,
            &attempt.scanner,
            ScanStatus::Success,
            now,
            elapsed_ms(attempt.received_at),
            None,
        );
        tx.append_scan_log(&scan_log)?;

        Ok(VerificationOutcome {
            status: ScanStatus::Success,
            message: format!("Welcome, {}", ticket.attendee_name),
            ticket: Some(ticket),
            committed_latency_ms: scan_log.latency_ms,
            scan_log,
        })
    }
}

/// The stored latency stops just before the log row is written, since the row
/// carries it. The commit-inclusive figure is `committed_latency_ms`.
fn elapsed_ms(received_at: Instant) -> f64 {
    received_at.elapsed().as_secs_f64() * 1000.0
}
