// Scan log entity
// Append-only audit record of one verification attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{ScanStatus, ScannerIdentity, TicketKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLog {
    pub id: String,
    pub ticket_id: String,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub scanner_name: String,
    pub scanner_uid: String,
    #[serde(rename = "latency")]
    pub latency_ms: f64,
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub is_offline_scan: bool,
    pub synced_to_server: bool,
}

impl ScanLog {
    pub fn record(
        key: &TicketKey,
        scanner: &ScannerIdentity,
        status: ScanStatus,
        timestamp: DateTime<Utc>,
        latency_ms: f64,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticket_id: key.ticket_id.clone(),
            event_id: key.event_id.clone(),
            timestamp,
            scanner_name: scanner.name.clone(),
            scanner_uid: scanner.id.0.clone(),
            latency_ms,
            status,
            error_message,
            is_offline_scan: true,
            synced_to_server: false,
        }
    }
}
