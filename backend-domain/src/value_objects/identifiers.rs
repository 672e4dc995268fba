// Identifier value objects

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScannerId(pub String);

impl ScannerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tickets are only unique within their event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketKey {
    pub event_id: String,
    pub ticket_id: String,
}

impl TicketKey {
    pub fn new(event_id: impl Into<String>, ticket_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            ticket_id: ticket_id.into(),
        }
    }
}

/// Who performed a scan, as recorded on tickets and scan logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerIdentity {
    pub id: ScannerId,
    pub name: String,
}
