use tracing::info;

use crate::{AppError, AppState};
use backend_domain::{AdminFeedMessage, ConnectRequest, ConnectResponse, ScannerSession};

const MAX_SCANNER_NAME_CHARS: usize = 64;

pub async fn connect_scanner(
    state: &AppState,
    request: ConnectRequest,
) -> Result<ConnectResponse, AppError> {
    let name = request
        .scanner_name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::Validation("scannerName is required".to_string()));
    }
    if name.chars().count() > MAX_SCANNER_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "scannerName must be at most {} characters",
            MAX_SCANNER_NAME_CHARS
        )));
    }

    let session = ScannerSession::open(name);
    {
        let mut scanners = state.scanners.write().await;
        scanners.insert(session.scanner_id.clone(), session.clone());
    }
    state.metrics.record_connect();
    info!("scanner '{}' connected as {}", session.name, session.scanner_id);

    let scanner_id = session.scanner_id.clone();
    state
        .scan_feed
        .publish(AdminFeedMessage::ScannerConnected { scanner: session });
    Ok(ConnectResponse { scanner_id })
}
