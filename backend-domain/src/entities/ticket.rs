// Ticket entity
// One admission record; verification state flips false -> true exactly once

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ScannerIdentity, TicketKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub ticket_id: String,
    pub event_id: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub ticket_type: String,
    pub purchase_date: String,
    pub purchase_time: String,
    pub ticket_reference: String,
    pub verified: bool,
    pub verification_date: Option<String>,
    pub verification_time: Option<String>,
    pub scanned_offline: bool,
    pub scanner_name: Option<String>,
    pub scanner_uid: Option<String>,
    pub scan_timestamp: Option<DateTime<Utc>>,
    pub synced_to_server: bool,
}

impl Ticket {
    pub fn key(&self) -> TicketKey {
        TicketKey::new(self.event_id.clone(), self.ticket_id.clone())
    }

    /// Records the first verification of this ticket.
    ///
    /// Returns `false` without touching any field when the ticket was already
    /// verified.
    pub fn stamp_verification(&mut self, scanner: &ScannerIdentity, at: DateTime<Utc>) -> bool {
        if self.verified {
            return false;
        }
        self.verified = true;
        self.verification_date = Some(at.format("%Y-%m-%d").to_string());
        self.verification_time = Some(at.format("%H:%M:%S").to_string());
        self.scanned_offline = true;
        self.scanner_name = Some(scanner.name.clone());
        self.scanner_uid = Some(scanner.id.0.clone());
        self.scan_timestamp = Some(at);
        self.synced_to_server = false;
        true
    }

    /// Name and time of the scan that verified this ticket.
    pub fn verified_by(&self) -> Option<(&str, DateTime<Utc>)> {
        if !self.verified {
            return None;
        }
        let name = self.scanner_name.as_deref().unwrap_or("unknown scanner");
        self.scan_timestamp.map(|at| (name, at))
    }
}
