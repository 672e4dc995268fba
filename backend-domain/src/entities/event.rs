// Event entity
// One ticketed event whose registry lives on this device

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    pub total_tickets: u32,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Scanning is only possible once the registry has been pulled.
    pub fn has_registry(&self) -> bool {
        self.downloaded_at.is_some()
    }
}
