use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use tracing::info;

use backend_domain::ports::{LogOrder, ScanLogFilter, StoreTx, TicketFilter, TicketStore};
use backend_domain::{
    millis_to_utc, Event, ScanLog, ScanStatus, StoreConfig, StoreError, Ticket, TicketKey,
};

use crate::utils::ensure_parent_dir;

const READER_CONNECTIONS: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    event_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    venue TEXT,
    event_date TEXT,
    total_tickets INTEGER NOT NULL DEFAULT 0,
    downloaded_at_ms INTEGER,
    last_synced_at_ms INTEGER
);
CREATE TABLE IF NOT EXISTS tickets (
    event_id TEXT NOT NULL,
    ticket_id TEXT NOT NULL,
    attendee_name TEXT NOT NULL,
    attendee_email TEXT NOT NULL,
    ticket_type TEXT NOT NULL,
    purchase_date TEXT NOT NULL,
    purchase_time TEXT NOT NULL,
    ticket_reference TEXT NOT NULL,
    verified INTEGER NOT NULL DEFAULT 0,
    verification_date TEXT,
    verification_time TEXT,
    scanned_offline INTEGER NOT NULL DEFAULT 0,
    scanner_name TEXT,
    scanner_uid TEXT,
    scan_timestamp_ms INTEGER,
    synced_to_server INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (event_id, ticket_id)
);
CREATE INDEX IF NOT EXISTS idx_tickets_event_verified ON tickets (event_id, verified);
CREATE TABLE IF NOT EXISTS scan_logs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    ticket_id TEXT NOT NULL,
    event_id TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    scanner_name TEXT NOT NULL,
    scanner_uid TEXT NOT NULL,
    latency_ms REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    error_message TEXT,
    is_offline_scan INTEGER NOT NULL DEFAULT 1,
    synced_to_server INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_scan_logs_event_sync ON scan_logs (event_id, synced_to_server, timestamp_ms);
";

const EVENT_COLUMNS: &str =
    "event_id, name, venue, event_date, total_tickets, downloaded_at_ms, last_synced_at_ms";

const TICKET_COLUMNS: &str = "event_id, ticket_id, attendee_name, attendee_email, ticket_type, \
     purchase_date, purchase_time, ticket_reference, verified, verification_date, verification_time, \
     scanned_offline, scanner_name, scanner_uid, scan_timestamp_ms, synced_to_server";

const SCAN_LOG_COLUMNS: &str = "id, ticket_id, event_id, timestamp_ms, scanner_name, scanner_uid, \
     latency_ms, status, error_message, is_offline_scan, synced_to_server";

/// SQLite-backed [`TicketStore`].
///
/// One writer connection serializes transactions (`BEGIN IMMEDIATE`). File
/// stores also keep a few WAL reader connections so reads never queue behind
/// a write; in-memory stores read through the writer.
pub struct SqliteTicketStore {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl SqliteTicketStore {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open_path(&config.database_path)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        ensure_parent_dir(path).map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let writer = Connection::open(path).map_err(store_err)?;
        configure(&writer)?;
        writer
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(store_err)?;
        writer.execute_batch(SCHEMA).map_err(store_err)?;

        let mut readers = Vec::with_capacity(READER_CONNECTIONS);
        for _ in 0..READER_CONNECTIONS {
            let reader = Connection::open(path).map_err(store_err)?;
            configure(&reader)?;
            readers.push(Mutex::new(reader));
        }

        info!("opened ticket store at {}", path.display());
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let writer = Connection::open_in_memory().map_err(store_err)?;
        configure(&writer)?;
        writer.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Unavailable("store writer lock poisoned".to_string()))
    }

    fn read<T>(&self, query: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T, StoreError> {
        if self.readers.is_empty() {
            let conn = self.lock_writer()?;
            return query(&conn).map_err(store_err);
        }
        let slot = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[slot]
            .lock()
            .map_err(|_| StoreError::Unavailable("store reader lock poisoned".to_string()))?;
        query(&conn).map_err(store_err)
    }
}

impl TicketStore for SqliteTicketStore {
    fn event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        self.read(|conn| select_event(conn, event_id))
    }

    fn events(&self) -> Result<Vec<Event>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM events ORDER BY event_id",
                EVENT_COLUMNS
            ))?;
            let rows = stmt.query_map([], event_from_row)?;
            rows.collect()
        })
    }

    fn ticket(&self, key: &TicketKey) -> Result<Option<Ticket>, StoreError> {
        self.read(|conn| select_ticket(conn, key))
    }

    fn tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let (clause, values) = ticket_where(filter);
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tickets{} ORDER BY event_id, ticket_id",
                TICKET_COLUMNS, clause
            ))?;
            let rows = stmt.query_map(params_from_iter(values.iter()), ticket_from_row)?;
            rows.collect()
        })
    }

    fn scan_logs(&self, filter: &ScanLogFilter) -> Result<Vec<ScanLog>, StoreError> {
        let (clause, mut values) = scan_log_where(filter);
        let direction = match filter.order {
            LogOrder::OldestFirst => "ASC",
            LogOrder::NewestFirst => "DESC",
        };
        let mut sql = format!(
            "SELECT {} FROM scan_logs{} ORDER BY timestamp_ms {}, seq {}",
            SCAN_LOG_COLUMNS, clause, direction, direction
        );
        if let Some(limit) = filter.limit {
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }
        self.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), scan_log_from_row)?;
            rows.collect()
        })
    }

    fn transact(
        &self,
        work: &mut dyn FnMut(&mut dyn StoreTx) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock_writer()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;
        {
            let mut scope = SqliteTx { conn: &tx };
            work(&mut scope)?;
        }
        tx.commit().map_err(store_err)
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.read(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .map(|_| ())
    }
}

struct SqliteTx<'c> {
    conn: &'c Connection,
}

impl StoreTx for SqliteTx<'_> {
    fn event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        select_event(self.conn, event_id).map_err(store_err)
    }

    fn ticket(&self, key: &TicketKey) -> Result<Option<Ticket>, StoreError> {
        select_ticket(self.conn, key).map_err(store_err)
    }

    fn count_scan_logs(&self, filter: &ScanLogFilter) -> Result<usize, StoreError> {
        let (clause, values) = scan_log_where(filter);
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM scan_logs{}", clause),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn put_event(&mut self, event: &Event) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO events ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    EVENT_COLUMNS
                ),
                params![
                    event.event_id,
                    event.name,
                    event.venue,
                    event.event_date,
                    event.total_tickets,
                    event.downloaded_at.map(|at| at.timestamp_millis()),
                    event.last_synced_at.map(|at| at.timestamp_millis()),
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn put_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO tickets ({}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    TICKET_COLUMNS
                ),
                params![
                    ticket.event_id,
                    ticket.ticket_id,
                    ticket.attendee_name,
                    ticket.attendee_email,
                    ticket.ticket_type,
                    ticket.purchase_date,
                    ticket.purchase_time,
                    ticket.ticket_reference,
                    ticket.verified,
                    ticket.verification_date,
                    ticket.verification_time,
                    ticket.scanned_offline,
                    ticket.scanner_name,
                    ticket.scanner_uid,
                    ticket.scan_timestamp.map(|at| at.timestamp_millis()),
                    ticket.synced_to_server,
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn delete_tickets(&mut self, event_id: &str) -> Result<usize, StoreError> {
        self.conn
            .execute("DELETE FROM tickets WHERE event_id = ?1", params![event_id])
            .map_err(store_err)
    }

    fn append_scan_log(&mut self, log: &ScanLog) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO scan_logs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    SCAN_LOG_COLUMNS
                ),
                params![
                    log.id,
                    log.ticket_id,
                    log.event_id,
                    log.timestamp.timestamp_millis(),
                    log.scanner_name,
                    log.scanner_uid,
                    log.latency_ms,
                    log.status.as_str(),
                    log.error_message,
                    log.is_offline_scan,
                    log.synced_to_server,
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn mark_scan_logs_synced(&mut self, ids: &[String]) -> Result<usize, StoreError> {
        let mut stmt = self
            .conn
            .prepare("UPDATE scan_logs SET synced_to_server = 1 WHERE id = ?1 AND synced_to_server = 0")
            .map_err(store_err)?;
        let mut changed = 0;
        for id in ids {
            changed += stmt.execute(params![id]).map_err(store_err)?;
        }
        Ok(changed)
    }

    fn mark_tickets_synced(&mut self, event_id: &str, ticket_ids: &[String]) -> Result<usize, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "UPDATE tickets SET synced_to_server = 1 \
                 WHERE event_id = ?1 AND ticket_id = ?2 AND verified = 1 AND synced_to_server = 0",
            )
            .map_err(store_err)?;
        let mut changed = 0;
        for ticket_id in ticket_ids {
            changed += stmt.execute(params![event_id, ticket_id]).map_err(store_err)?;
        }
        Ok(changed)
    }

    fn set_event_synced(&mut self, event_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn
            .execute(
                "UPDATE events SET last_synced_at_ms = ?2 WHERE event_id = ?1",
                params![event_id, at.timestamp_millis()],
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn purge(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("DELETE FROM scan_logs; DELETE FROM tickets; DELETE FROM events;")
            .map_err(store_err)
    }
}

fn configure(conn: &Connection) -> Result<(), StoreError> {
    conn.busy_timeout(BUSY_TIMEOUT).map_err(store_err)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(store_err)
}

fn store_err(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) =>
        {
            StoreError::Corrupt(err.to_string())
        }
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => StoreError::Corrupt(err.to_string()),
        _ => StoreError::Unavailable(err.to_string()),
    }
}

fn ticket_where(filter: &TicketFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(event_id) = &filter.event_id {
        values.push(Value::Text(event_id.clone()));
        conditions.push(format!("event_id = ?{}", values.len()));
    }
    if let Some(verified) = filter.verified {
        values.push(Value::Integer(i64::from(verified)));
        conditions.push(format!("verified = ?{}", values.len()));
    }
    if let Some(synced) = filter.synced {
        values.push(Value::Integer(i64::from(synced)));
        conditions.push(format!("synced_to_server = ?{}", values.len()));
    }
    (where_clause(&conditions), values)
}

fn scan_log_where(filter: &ScanLogFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(event_id) = &filter.event_id {
        values.push(Value::Text(event_id.clone()));
        conditions.push(format!("event_id = ?{}", values.len()));
    }
    if let Some(synced) = filter.synced {
        values.push(Value::Integer(i64::from(synced)));
        conditions.push(format!("synced_to_server = ?{}", values.len()));
    }
    (where_clause(&conditions), values)
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn select_event(conn: &Connection, event_id: &str) -> rusqlite::Result<Option<Event>> {
    conn.query_row(
        &format!("SELECT {} FROM events WHERE event_id = ?1", EVENT_COLUMNS),
        params![event_id],
        event_from_row,
    )
    .optional()
}

fn select_ticket(conn: &Connection, key: &TicketKey) -> rusqlite::Result<Option<Ticket>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tickets WHERE event_id = ?1 AND ticket_id = ?2",
            TICKET_COLUMNS
        ),
        params![key.event_id, key.ticket_id],
        ticket_from_row,
    )
    .optional()
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        event_id: row.get(0)?,
        name: row.get(1)?,
        venue: row.get(2)?,
        event_date: row.get(3)?,
        total_tickets: row.get(4)?,
        downloaded_at: row.get::<_, Option<i64>>(5)?.map(millis_to_utc),
        last_synced_at: row.get::<_, Option<i64>>(6)?.map(millis_to_utc),
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        event_id: row.get(0)?,
        ticket_id: row.get(1)?,
        attendee_name: row.get(2)?,
        attendee_email: row.get(3)?,
        ticket_type: row.get(4)?,
        purchase_date: row.get(5)?,
        purchase_time: row.get(6)?,
        ticket_reference: row.get(7)?,
        verified: row.get(8)?,
        verification_date: row.get(9)?,
        verification_time: row.get(10)?,
        scanned_offline: row.get(11)?,
        scanner_name: row.get(12)?,
        scanner_uid: row.get(13)?,
        scan_timestamp: row.get::<_, Option<i64>>(14)?.map(millis_to_utc),
        synced_to_server: row.get(15)?,
    })
}

fn scan_log_from_row(row: &Row<'_>) -> rusqlite::Result<ScanLog> {
    let status: String = row.get(7)?;
    Ok(ScanLog {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        event_id: row.get(2)?,
        timestamp: millis_to_utc(row.get(3)?),
        scanner_name: row.get(4)?,
        scanner_uid: row.get(5)?,
        latency_ms: row.get(6)?,
        status: ScanStatus::from(status.as_str()),
        error_message: row.get(8)?,
        is_offline_scan: row.get(9)?,
        synced_to_server: row.get(10)?,
    })
}
