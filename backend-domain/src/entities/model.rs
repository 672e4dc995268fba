use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Event, ScanLog, ScannerSession};
use crate::value_objects::{ScanStatus, ScannerId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(default)]
    pub scanner_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub scanner_id: ScannerId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub scanner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub status: ScanStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_data: Option<TicketData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketData {
    pub attendee_name: String,
    pub ticket_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total_scans: u64,
    pub successful_scans: u64,
    pub already_verified_scans: u64,
    /// Every attempt that did not verify a ticket.
    pub failed_scans: u64,
    pub active_scanners_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub event: EventRef,
    pub scanners: Vec<ScannerSession>,
    pub recent_scans: Vec<ScanLog>,
    pub stats: ScanStats,
}

/// Message pushed to admin viewers over the live feed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminFeedMessage {
    Snapshot { stats: AdminStats },
    Scan { scan: ScanLog, stats: ScanStats },
    ScannerConnected { scanner: ScannerSession },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub ticket_count: usize,
    pub verified_count: usize,
    pub unsynced_scans: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}
