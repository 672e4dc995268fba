use std::sync::Arc;

use anyhow::Result;

use backend_domain::ports::{RegistryBackend, TicketStore};
use backend_infrastructure::{AppConfig, HttpRegistryBackend, SqliteTicketStore};

use crate::lifecycle::ScanServer;

pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn TicketStore>,
    pub backend: Arc<dyn RegistryBackend>,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        let store = SqliteTicketStore::open(&config.to_store_config())?;
        let backend = HttpRegistryBackend::new(&config.to_backend_config())?;
        Ok(Self {
            config,
            store: Arc::new(store),
            backend: Arc::new(backend),
        })
    }

    pub fn scan_server(&self, port: Option<u16>) -> ScanServer {
        let mut runtime = self.config.to_runtime_config();
        if let Some(port) = port {
            runtime.port = port;
        }
        ScanServer::new(self.store.clone(), runtime)
    }
}
