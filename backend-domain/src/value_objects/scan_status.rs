// Scan status value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Success,
    AlreadyVerified,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Success => "success",
            ScanStatus::AlreadyVerified => "already_verified",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScanStatus::Success)
    }
}

impl From<&str> for ScanStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "success" => ScanStatus::Success,
            "already_verified" => ScanStatus::AlreadyVerified,
            _ => ScanStatus::Failed,
        }
    }
}
