use chrono::{DateTime, Utc};

use crate::entities::{Event, ScanLog, Ticket};
use crate::errors::StoreError;
use crate::value_objects::TicketKey;

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub event_id: Option<String>,
    pub verified: Option<bool>,
    pub synced: Option<bool>,
}

impl TicketFilter {
    pub fn for_event(event_id: &str) -> Self {
        Self {
            event_id: Some(event_id.to_string()),
            ..Self::default()
        }
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogOrder {
    /// Timestamp ascending, insertion order breaking ties.
    #[default]
    OldestFirst,
    NewestFirst,
}

#[derive(Debug, Clone, Default)]
pub struct ScanLogFilter {
    pub event_id: Option<String>,
    pub synced: Option<bool>,
    pub order: LogOrder,
    pub limit: Option<usize>,
}

impl ScanLogFilter {
    pub fn for_event(event_id: &str) -> Self {
        Self {
            event_id: Some(event_id.to_string()),
            ..Self::default()
        }
    }

    pub fn unsynced(mut self) -> Self {
        self.synced = Some(false);
        self
    }

    pub fn newest_first(mut self, limit: usize) -> Self {
        self.order = LogOrder::NewestFirst;
        self.limit = Some(limit);
        self
    }
}

/// Local embedded store of events, tickets and scan logs.
///
/// Reads return a snapshot as of the call. Writes only happen inside
/// [`TicketStore::transact`], which serializes writers and commits all
/// mutations of `work` or none of them.
pub trait TicketStore: Send + Sync {
    fn event(&self, event_id: &str) -> Result<Option<Event>, StoreError>;
    fn events(&self) -> Result<Vec<Event>, StoreError>;
    fn ticket(&self, key: &TicketKey) -> Result<Option<Ticket>, StoreError>;
    fn tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;
    fn scan_logs(&self, filter: &ScanLogFilter) -> Result<Vec<ScanLog>, StoreError>;
    fn transact(
        &self,
        work: &mut dyn FnMut(&mut dyn StoreTx) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    fn ping(&self) -> Result<(), StoreError>;
}

/// Write access handed to a [`TicketStore::transact`] closure.
pub trait StoreTx {
    fn event(&self, event_id: &str) -> Result<Option<Event>, StoreError>;
    fn ticket(&self, key: &TicketKey) -> Result<Option<Ticket>, StoreError>;
    fn count_scan_logs(&self, filter: &ScanLogFilter) -> Result<usize, StoreError>;

    fn put_event(&mut self, event: &Event) -> Result<(), StoreError>;
    /// Inserts or replaces the ticket stored under the same key.
    fn put_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;
    fn delete_tickets(&mut self, event_id: &str) -> Result<usize, StoreError>;
    fn append_scan_log(&mut self, log: &ScanLog) -> Result<(), StoreError>;
    fn mark_scan_logs_synced(&mut self, ids: &[String]) -> Result<usize, StoreError>;
    /// Only flips tickets that are verified.
    fn mark_tickets_synced(&mut self, event_id: &str, ticket_ids: &[String]) -> Result<usize, StoreError>;
    fn set_event_synced(&mut self, event_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
    fn purge(&mut self) -> Result<(), StoreError>;
}

/// Runs `work` in one store transaction and hands back its result.
pub fn run_in_transaction<T>(
    store: &dyn TicketStore,
    mut work: impl FnMut(&mut dyn StoreTx) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut output = None;
    store.transact(&mut |tx| {
        output = Some(work(tx)?);
        Ok(())
    })?;
    output.ok_or_else(|| StoreError::Unavailable("transaction finished without a result".to_string()))
}
