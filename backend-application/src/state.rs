use std::collections::HashMap;
use std::sync::Arc;

use backend_domain::ports::TicketStore;
use backend_domain::services::VerificationEngine;
use backend_domain::{Event, RuntimeConfig, ScannerId, ScannerSession};
use tokio::sync::{watch, RwLock};

use crate::{IdleTimer, Metrics, ScanFeedHub};

/// Shared state of one local scan server run. Dropped wholesale on stop.
#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub event: Event,
    pub store: Arc<dyn TicketStore>,
    pub engine: VerificationEngine,
    pub scanners: Arc<RwLock<HashMap<ScannerId, ScannerSession>>>,
    pub scan_feed: Arc<ScanFeedHub>,
    pub metrics: Arc<Metrics>,
    pub idle_timer: Arc<IdleTimer>,
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        event: Event,
        store: Arc<dyn TicketStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let idle_timer = Arc::new(IdleTimer::new(config.idle_timeout));
        let scan_feed = Arc::new(ScanFeedHub::new(config.recent_scan_capacity));
        Self {
            config,
            event,
            store,
            engine: VerificationEngine,
            scanners: Arc::new(RwLock::new(HashMap::new())),
            scan_feed,
            metrics: Arc::new(Metrics::default()),
            idle_timer,
            shutdown,
        }
    }

    pub async fn active_scanners(&self) -> usize {
        self.scanners.read().await.len()
    }

    /// Drops every scanner session and the recent scan mirror.
    pub async fn clear_sessions(&self) {
        self.scanners.write().await.clear();
        self.scan_feed.clear().await;
    }
}
