// Local scan server lifecycle phase

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerPhase {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ServerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerPhase::Stopped => "stopped",
            ServerPhase::Starting => "starting",
            ServerPhase::Running => "running",
            ServerPhase::Stopping => "stopping",
        }
    }
}
