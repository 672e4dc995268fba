use std::sync::atomic::{AtomicU64, Ordering};

use backend_domain::{ScanStats, ScanStatus};

#[derive(Debug, Default)]
pub struct Metrics {
    scanner_connects: AtomicU64,
    scans_total: AtomicU64,
    scans_success: AtomicU64,
    scans_already_verified: AtomicU64,
    scans_failed: AtomicU64,
}

impl Metrics {
    pub fn record_connect(&self) {
        self.scanner_connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan(&self, status: ScanStatus) {
        self.scans_total.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            ScanStatus::Success => &self.scans_success,
            ScanStatus::AlreadyVerified => &self.scans_already_verified,
            ScanStatus::Failed => &self.scans_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, active_scanners: usize) -> ScanStats {
        let total = self.scans_total.load(Ordering::Relaxed);
        let successful = self.scans_success.load(Ordering::Relaxed);
        ScanStats {
            total_scans: total,
            successful_scans: successful,
            already_verified_scans: self.scans_already_verified.load(Ordering::Relaxed),
            failed_scans: total.saturating_sub(successful),
            active_scanners_count: active_scanners,
        }
    }

    pub fn render_prometheus(&self) -> String {
        let connects = self.scanner_connects.load(Ordering::Relaxed);
        let total = self.scans_total.load(Ordering::Relaxed);
        let success = self.scans_success.load(Ordering::Relaxed);
        let already = self.scans_already_verified.load(Ordering::Relaxed);
        let failed = self.scans_failed.load(Ordering::Relaxed);

        format!(
            "# TYPE scangate_scanner_connects_total counter\n\
scangate_scanner_connects_total {}\n\
# TYPE scangate_scans_total counter\n\
scangate_scans_total {}\n\
# TYPE scangate_scans_success_total counter\n\
scangate_scans_success_total {}\n\
# TYPE scangate_scans_already_verified_total counter\n\
scangate_scans_already_verified_total {}\n\
# TYPE scangate_scans_failed_total counter\n\
scangate_scans_failed_total {}\n",
            connects, total, success, already, failed
        )
    }
}
