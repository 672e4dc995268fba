use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use backend_domain::ports::{run_in_transaction, ScanLogFilter, StoreTx, TicketStore};
use backend_domain::{
    Event, ScanLog, ScanStatus, ScannerId, ScannerIdentity, StoreError, Ticket, TicketKey,
    VerificationEngine, VerifyAttempt,
};
use backend_infrastructure::SqliteTicketStore;

fn seed(store: &dyn TicketStore, event_id: &str, ticket_ids: &[&str]) {
    let event = Event {
        event_id: event_id.to_string(),
        name: "Harbour Festival".to_string(),
        venue: None,
        event_date: None,
        total_tickets: ticket_ids.len() as u32,
        downloaded_at: Some(backend_domain::utc_now()),
        last_synced_at: None,
    };
    run_in_transaction(store, |tx| {
        tx.put_event(&event)?;
        for ticket_id in ticket_ids {
            tx.put_ticket(&Ticket {
                ticket_id: ticket_id.to_string(),
                event_id: event_id.to_string(),
                attendee_name: format!("Guest {ticket_id}"),
                attendee_email: "guest@example.com".to_string(),
                ticket_type: "General".to_string(),
                purchase_date: "2026-05-01".to_string(),
                purchase_time: "08:00:00".to_string(),
                ticket_reference: format!("REF-{ticket_id}"),
                verified: false,
                verification_date: None,
                verification_time: None,
                scanned_offline: false,
                scanner_name: None,
                scanner_uid: None,
                scan_timestamp: None,
                synced_to_server: false,
            })?;
        }
        Ok(())
    })
    .expect("seed store");
}

fn attempt(event_id: &str, ticket_id: &str, scanner: &str) -> VerifyAttempt {
    VerifyAttempt::new(
        event_id,
        ticket_id,
        ScannerIdentity {
            id: ScannerId(format!("{scanner}-uid")),
            name: scanner.to_string(),
        },
        Instant::now(),
    )
}

#[test]
fn concurrent_verifies_of_one_ticket_succeed_exactly_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SqliteTicketStore::open_path(dir.path().join("scan.db")).expect("store"));
    seed(&*store, "E1", &["T-2"]);

    const SCANNERS: usize = 16;
    let statuses: Vec<ScanStatus> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..SCANNERS)
            .map(|n| {
                let store = store.clone();
                scope.spawn(move || {
                    VerificationEngine
                        .verify(&*store, &attempt("E1", "T-2", &format!("gate-{n}")))
                        .expect("verify")
                        .status
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect()
    });

    let successes = statuses.iter().filter(|status| status.is_success()).count();
    let repeats = statuses
        .iter()
        .filter(|status| **status == ScanStatus::AlreadyVerified)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(repeats, SCANNERS - 1);

    let logs = store.scan_logs(&ScanLogFilter::for_event("E1")).expect("logs");
    assert_eq!(logs.len(), SCANNERS);
}

#[test]
fn concurrent_verifies_of_unknown_ticket_all_fail() {
    let store = Arc::new(SqliteTicketStore::in_memory().expect("store"));
    seed(&*store, "E1", &["T-1"]);

    let statuses: Vec<ScanStatus> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = store.clone();
                scope.spawn(move || {
                    VerificationEngine
                        .verify(&*store, &attempt("E1", "T-404", &format!("gate-{n}")))
                        .expect("verify")
                        .status
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect()
    });

    assert!(statuses.iter().all(|status| *status == ScanStatus::Failed));
}

/// Delegates to the real transaction but fails the scan log append.
struct FailingAppend<'a> {
    inner: &'a mut dyn StoreTx,
}

impl StoreTx for FailingAppend<'_> {
    fn event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        self.inner.event(event_id)
    }

    fn ticket(&self, key: &TicketKey) -> Result<Option<Ticket>, StoreError> {
        self.inner.ticket(key)
    }

    fn count_scan_logs(&self, filter: &ScanLogFilter) -> Result<usize, StoreError> {
        self.inner.count_scan_logs(filter)
    }

    fn put_event(&mut self, event: &Event) -> Result<(), StoreError> {
        self.inner.put_event(event)
    }

    fn put_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.inner.put_ticket(ticket)
    }

    fn delete_tickets(&mut self, event_id: &str) -> Result<usize, StoreError> {
        self.inner.delete_tickets(event_id)
    }

    fn append_scan_log(&mut self, _log: &ScanLog) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("simulated disk failure".to_string()))
    }

    fn mark_scan_logs_synced(&mut self, ids: &[String]) -> Result<usize, StoreError> {
        self.inner.mark_scan_logs_synced(ids)
    }

    fn mark_tickets_synced(&mut self, event_id: &str, ticket_ids: &[String]) -> Result<usize, StoreError> {
        self.inner.mark_tickets_synced(event_id, ticket_ids)
    }

    fn set_event_synced(&mut self, event_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.set_event_synced(event_id, at)
    }

    fn purge(&mut self) -> Result<(), StoreError> {
        self.inner.purge()
    }
}

#[test]
fn failure_mid_verify_leaves_neither_ticket_flag_nor_log() {
    let store = SqliteTicketStore::in_memory().expect("store");
    seed(&store, "E1", &["T-1"]);

    let result = store.transact(&mut |tx| {
        let mut failing = FailingAppend { inner: tx };
        VerificationEngine
            .verify_in(&mut failing, &attempt("E1", "T-1", "gate-a"))
            .map(|_| ())
    });
    assert!(matches!(result, Err(StoreError::Unavailable(_))));

    let ticket = store
        .ticket(&TicketKey::new("E1", "T-1"))
        .expect("read")
        .expect("ticket");
    assert!(!ticket.verified);
    assert!(store
        .scan_logs(&ScanLogFilter::for_event("E1"))
        .expect("logs")
        .is_empty());

    let outcome = VerificationEngine
        .verify(&store, &attempt("E1", "T-1", "gate-a"))
        .expect("retry");
    assert_eq!(outcome.status, ScanStatus::Success);
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("persist.db");
    {
        let store = SqliteTicketStore::open_path(&path).expect("store");
        seed(&store, "E1", &["T-1"]);
        VerificationEngine
            .verify(&store, &attempt("E1", "T-1", "gate-a"))
            .expect("verify");
    }

    let store = SqliteTicketStore::open_path(&path).expect("reopen");
    let ticket = store
        .ticket(&TicketKey::new("E1", "T-1"))
        .expect("read")
        .expect("ticket");
    assert!(ticket.verified);
    assert_eq!(ticket.scanner_name.as_deref(), Some("gate-a"));
    let logs = store
        .scan_logs(&ScanLogFilter::for_event("E1").unsynced())
        .expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ScanStatus::Success);
}

#[test]
fn committed_latency_covers_the_logged_latency() {
    let store = SqliteTicketStore::in_memory().expect("store");
    seed(&store, "E1", &["T-1"]);

    for ticket_id in ["T-1", "T-1", "T-404"] {
        let outcome = VerificationEngine
            .verify(&store, &attempt("E1", ticket_id, "gate-a"))
            .expect("verify");
        assert!(outcome.scan_log.latency_ms >= 0.0);
        assert!(outcome.committed_latency_ms >= outcome.scan_log.latency_ms);
    }
}
