#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use backend_application::AppState;
use backend_domain::ports::{run_in_transaction, RegistryBackend, TicketStore};
use backend_domain::{
    utc_now, BackendError, Event, RegistryDownload, RegistryTicket, RuntimeConfig, SyncAck,
    SyncBatch, Ticket,
};
use backend_infrastructure::SqliteTicketStore;

pub fn store() -> Arc<dyn TicketStore> {
    Arc::new(SqliteTicketStore::in_memory().expect("store"))
}

pub fn event(event_id: &str) -> Event {
    Event {
        event_id: event_id.to_string(),
        name: "Harbour Festival".to_string(),
        venue: Some("Pier 4".to_string()),
        event_date: Some("2026-07-01".to_string()),
        total_tickets: 3,
        downloaded_at: Some(utc_now()),
        last_synced_at: None,
    }
}

pub fn ticket(event_id: &str, ticket_id: &str) -> Ticket {
    RegistryTicket {
        ticket_id: ticket_id.to_string(),
        event_id: event_id.to_string(),
        attendee_name: format!("Guest {ticket_id}"),
        attendee_email: "guest@example.com".to_string(),
        ticket_type: "General".to_string(),
        purchase_date: "2026-05-01".to_string(),
        purchase_time: "08:00:00".to_string(),
        ticket_reference: format!("REF-{ticket_id}"),
    }
    .into_ticket(event_id)
}

pub fn seed(store: &Arc<dyn TicketStore>, event_id: &str, ticket_ids: &[&str]) -> Event {
    let event = event(event_id);
    run_in_transaction(store.as_ref(), |tx| {
        tx.put_event(&event)?;
        for ticket_id in ticket_ids {
            tx.put_ticket(&ticket(event_id, ticket_id))?;
        }
        Ok(())
    })
    .expect("seed");
    event
}

pub fn app_state(store: Arc<dyn TicketStore>, event: Event) -> AppState {
    let (_tx, rx) = watch::channel(false);
    AppState::new(RuntimeConfig::default(), event, store, rx)
}

/// In-memory stand-in for the remote registry.
#[derive(Default)]
pub struct FakeBackend {
    pub registry: Mutex<Option<RegistryDownload>>,
    pub uploads: Mutex<Vec<(SyncBatch, String)>>,
    pub offline: Mutex<bool>,
    pub synced_at: Mutex<Option<DateTime<Utc>>>,
}

impl FakeBackend {
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().expect("lock") = offline;
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().expect("lock").len()
    }

    pub fn with_registry(registry: RegistryDownload) -> Self {
        Self {
            registry: Mutex::new(Some(registry)),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RegistryBackend for FakeBackend {
    async fn fetch_registry(&self, event_id: &str) -> Result<RegistryDownload, BackendError> {
        if *self.offline.lock().expect("lock") {
            return Err(BackendError::Unreachable("connection refused".to_string()));
        }
        self.registry
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| BackendError::Rejected {
                status: 404,
                message: format!("no registry for {event_id}"),
            })
    }

    async fn upload_scans(
        &self,
        batch: &SyncBatch,
        idempotency_key: &str,
    ) -> Result<SyncAck, BackendError> {
        if *self.offline.lock().expect("lock") {
            return Err(BackendError::Unreachable("connection refused".to_string()));
        }
        self.uploads
            .lock()
            .expect("lock")
            .push((batch.clone(), idempotency_key.to_string()));
        let synced_at = self.synced_at.lock().expect("lock").unwrap_or_else(utc_now);
        Ok(SyncAck { synced_at })
    }
}
