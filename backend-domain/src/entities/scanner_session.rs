// Scanner session
// Lives only while the local scan server runs; never persisted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::utc_now;
use crate::value_objects::{ScannerId, ScannerIdentity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerSession {
    pub scanner_id: ScannerId,
    pub name: String,
    pub connected_at: DateTime<Utc>,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub total_scans: u64,
}

impl ScannerSession {
    pub fn open(name: &str) -> Self {
        Self {
            scanner_id: ScannerId::generate(),
            name: name.to_string(),
            connected_at: utc_now(),
            last_scan_at: None,
            total_scans: 0,
        }
    }

    pub fn identity(&self) -> ScannerIdentity {
        ScannerIdentity {
            id: self.scanner_id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn record_scan(&mut self, at: DateTime<Utc>) {
        self.total_scans += 1;
        self.last_scan_at = Some(at);
    }
}
