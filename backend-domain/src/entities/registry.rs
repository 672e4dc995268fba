// Registry download payload
// Snapshot of an event's tickets as served by the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Event, Ticket};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDownload {
    pub event_id: String,
    pub event_name: String,
    #[serde(default)]
    pub event_venue: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub total_tickets: Option<u32>,
    #[serde(default)]
    pub downloaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tickets: Vec<RegistryTicket>,
}

impl RegistryDownload {
    pub fn to_event(&self, downloaded_at: DateTime<Utc>, stored_tickets: usize) -> Event {
        Event {
            event_id: self.event_id.trim().to_string(),
            name: self.event_name.clone(),
            venue: self.event_venue.clone(),
            event_date: self.event_date.clone(),
            total_tickets: self
                .total_tickets
                .unwrap_or_else(|| u32::try_from(stored_tickets).unwrap_or(u32::MAX)),
            downloaded_at: Some(downloaded_at),
            last_synced_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryTicket {
    pub ticket_id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub attendee_name: String,
    #[serde(default)]
    pub attendee_email: String,
    #[serde(default)]
    pub ticket_type: String,
    #[serde(default)]
    pub purchase_date: String,
    #[serde(default)]
    pub purchase_time: String,
    #[serde(default)]
    pub ticket_reference: String,
}

impl RegistryTicket {
    /// Builds the unverified local ticket, trimming the id the same way scans are trimmed.
    pub fn into_ticket(self, event_id: &str) -> Ticket {
        Ticket {
            ticket_id: self.ticket_id.trim().to_string(),
            event_id: event_id.to_string(),
            attendee_name: self.attendee_name,
            attendee_email: self.attendee_email,
            ticket_type: self.ticket_type,
            purchase_date: self.purchase_date,
            purchase_time: self.purchase_time,
            ticket_reference: self.ticket_reference,
            verified: false,
            verification_date: None,
            verification_time: None,
            scanned_offline: false,
            scanner_name: None,
            scanner_uid: None,
            scan_timestamp: None,
            synced_to_server: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    pub event_id: String,
    pub event_name: String,
    pub tickets_stored: usize,
    pub tickets_skipped: usize,
    pub downloaded_at: DateTime<Utc>,
}
