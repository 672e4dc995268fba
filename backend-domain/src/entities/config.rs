use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_host: String,
    pub port: u16,
    pub public_host: Option<String>,
    pub idle_timeout: Duration,
    pub recent_scan_capacity: usize,
    pub admin_recent_scans: usize,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            public_host: None,
            idle_timeout: Duration::from_secs(30 * 60),
            recent_scan_capacity: 1000,
            admin_recent_scans: 50,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: String,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}
