// Sync batch and acknowledgement
// Wire shapes for uploading offline scans to the backend registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::ScanLog;
use crate::value_objects::ScanStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    pub event_id: String,
    pub total_scanned: u64,
    pub first_scan_timestamp: DateTime<Utc>,
    pub last_scan_timestamp: DateTime<Utc>,
    pub scan_results: Vec<SyncScanResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncScanResult {
    pub ticket_id: String,
    pub timestamp: DateTime<Utc>,
    pub scanner_name: String,
    pub latency: f64,
    pub status: ScanStatus,
    pub event_id: String,
}

impl From<&ScanLog> for SyncScanResult {
    fn from(log: &ScanLog) -> Self {
        Self {
            ticket_id: log.ticket_id.clone(),
            timestamp: log.timestamp,
            scanner_name: log.scanner_name.clone(),
            latency: log.latency_ms,
            status: log.status,
            event_id: log.event_id.clone(),
        }
    }
}

impl SyncBatch {
    /// Builds one upload batch. Returns `None` when there is nothing to send.
    ///
    /// Results are ordered by timestamp; the sort is stable so rows with equal
    /// timestamps keep the insertion order they were read in.
    pub fn from_logs(event_id: &str, total_scanned: u64, logs: &[ScanLog]) -> Option<Self> {
        let mut scan_results: Vec<SyncScanResult> = logs.iter().map(SyncScanResult::from).collect();
        scan_results.sort_by_key(|result| result.timestamp);
        let first = scan_results.first()?.timestamp;
        let last = scan_results.last()?.timestamp;
        Some(Self {
            event_id: event_id.to_string(),
            total_scanned,
            first_scan_timestamp: first,
            last_scan_timestamp: last,
            scan_results,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAck {
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub event_id: String,
    pub scans_sent: usize,
    pub tickets_marked: usize,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncResult {
    NothingToSync { event_id: String },
    Synced(SyncReport),
}
