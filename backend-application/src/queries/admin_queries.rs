use crate::AppState;
use backend_domain::{AdminStats, EventRef, ScannerSession};

pub async fn admin_stats(state: &AppState) -> AdminStats {
    let mut scanners: Vec<ScannerSession> = {
        let scanners = state.scanners.read().await;
        scanners.values().cloned().collect()
    };
    scanners.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));

    let recent_scans = state
        .scan_feed
        .recent(state.config.admin_recent_scans)
        .await;
    let stats = state.metrics.snapshot(scanners.len());

    AdminStats {
        event: EventRef {
            id: state.event.event_id.clone(),
            name: state.event.name.clone(),
        },
        scanners,
        recent_scans,
        stats,
    }
}

pub fn metrics_text(state: &AppState) -> String {
    state.metrics.render_prometheus()
}
