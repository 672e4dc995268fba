use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use backend_domain::{BackendConfig, RuntimeConfig, StoreConfig};

use crate::config::validation::{validate_backend_url, validate_host};

pub const CONFIG_ENV: &str = "SCANGATE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./scangate.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_host: String,
    pub port: u16,
    pub public_host: Option<String>,
    pub idle_timeout_minutes: u64,
    pub recent_scan_capacity: usize,
    pub admin_recent_scans: usize,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub database_path: String,
    pub backend_url: String,
    pub backend_token: Option<String>,
    pub backend_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            public_host: None,
            idle_timeout_minutes: 30,
            recent_scan_capacity: 1000,
            admin_recent_scans: 50,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 15,
            database_path: "./scangate.db".to_string(),
            backend_url: "http://localhost:3001/v1".to_string(),
            backend_token: None,
            backend_timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str(&content)
                .map_err(|err| anyhow!("invalid config {}: {}", file_path.display(), err))?
        } else {
            warn!("{} not found, using defaults", file_path.display());
            AppConfig::default()
        };
        config.finish(base_dir, |key| env::var(key).ok())?;
        Ok(config)
    }

    /// Paths from the file resolve against its directory; overrides are taken
    /// as given, so a relative `SCANGATE_DATABASE_PATH` stays relative to the
    /// working directory.
    fn finish(
        &mut self,
        base_dir: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        self.resolve_paths(base_dir);
        self.apply_overrides(lookup);
        self.normalize();
        self.validate()
    }

    pub fn normalize(&mut self) {
        self.bind_host = self.bind_host.trim().to_string();
        self.backend_url = self.backend_url.trim().trim_end_matches('/').to_string();
        if let Some(host) = &self.public_host {
            if host.trim().is_empty() {
                self.public_host = None;
            }
        }
        if let Some(token) = &self.backend_token {
            if token.trim().is_empty() {
                self.backend_token = None;
            }
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.database_path = resolve_path(base, &self.database_path);
    }

    pub fn validate(&self) -> Result<()> {
        validate_host("bind_host", &self.bind_host)?;
        if let Some(host) = &self.public_host {
            validate_host("public_host", host)?;
        }
        validate_backend_url(&self.backend_url)?;
        if self.database_path.trim().is_empty() {
            return Err(anyhow!("database_path must not be empty"));
        }
        if self.idle_timeout_minutes == 0 {
            return Err(anyhow!("idle_timeout_minutes must be greater than 0"));
        }
        if self.recent_scan_capacity == 0 {
            return Err(anyhow!("recent_scan_capacity must be greater than 0"));
        }
        if self.admin_recent_scans == 0 || self.admin_recent_scans > self.recent_scan_capacity {
            return Err(anyhow!(
                "admin_recent_scans must be between 1 and recent_scan_capacity"
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 || self.backend_timeout_seconds == 0 {
            return Err(anyhow!("timeouts must be greater than 0"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_host: self.bind_host.clone(),
            port: self.port,
            public_host: self.public_host.clone(),
            idle_timeout: Duration::from_secs(self.idle_timeout_minutes.saturating_mul(60)),
            recent_scan_capacity: self.recent_scan_capacity,
            admin_recent_scans: self.admin_recent_scans,
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            database_path: self.database_path.clone(),
        }
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.backend_url.clone(),
            token: self.backend_token.clone(),
            timeout_seconds: self.backend_timeout_seconds,
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("SCANGATE_BIND_HOST") {
            self.bind_host = value;
        }
        if let Some(value) = lookup("SCANGATE_PORT") {
            self.port = value.parse().unwrap_or(self.port);
        }
        if let Some(value) = lookup("SCANGATE_PUBLIC_HOST") {
            self.public_host = Some(value);
        }
        if let Some(value) = lookup("SCANGATE_IDLE_TIMEOUT_MINUTES") {
            self.idle_timeout_minutes = value.parse().unwrap_or(self.idle_timeout_minutes);
        }
        if let Some(value) = lookup("SCANGATE_RECENT_SCAN_CAPACITY") {
            self.recent_scan_capacity = value.parse().unwrap_or(self.recent_scan_capacity);
        }
        if let Some(value) = lookup("SCANGATE_ADMIN_RECENT_SCANS") {
            self.admin_recent_scans = value.parse().unwrap_or(self.admin_recent_scans);
        }
        if let Some(value) = lookup("SCANGATE_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Some(value) = lookup("SCANGATE_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
        if let Some(value) = lookup("SCANGATE_DATABASE_PATH") {
            self.database_path = value;
        }
        if let Some(value) = lookup("SCANGATE_BACKEND_URL") {
            self.backend_url = value;
        }
        if let Some(value) = lookup("SCANGATE_BACKEND_TOKEN") {
            self.backend_token = Some(value);
        }
        if let Some(value) = lookup("SCANGATE_BACKEND_TIMEOUT_SECONDS") {
            self.backend_timeout_seconds = value.parse().unwrap_or(self.backend_timeout_seconds);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults validate");
        let runtime = config.to_runtime_config();
        assert_eq!(runtime.port, 8080);
        assert_eq!(runtime.idle_timeout, Duration::from_secs(30 * 60));
        assert_eq!(runtime.recent_scan_capacity, 1000);
        assert_eq!(runtime.admin_recent_scans, 50);
    }

    #[test]
    fn partial_file_falls_back_to_defaults_and_normalizes() {
        let mut config: AppConfig = toml::from_str(
            r#"
            port = 9090
            public_host = "  "
            backend_url = "https://tickets.example.com/v1/"
            backend_token = ""
            database_path = "data/scangate.db"
            "#,
        )
        .expect("parse");
        config.resolve_paths(Some(Path::new("/etc/scangate")));
        config.normalize();
        config.validate().expect("validate");

        assert_eq!(config.port, 9090);
        assert_eq!(config.public_host, None);
        assert_eq!(config.backend_token, None);
        assert_eq!(config.backend_url, "https://tickets.example.com/v1");
        assert_eq!(config.database_path, "/etc/scangate/data/scangate.db");
        assert_eq!(config.idle_timeout_minutes, 30);
    }

    #[test]
    fn env_database_path_is_not_resolved_against_the_config_dir() {
        let mut config: AppConfig =
            toml::from_str(r#"database_path = "data/scangate.db""#).expect("parse");
        config
            .finish(Some(Path::new("/etc/scangate")), |key| {
                (key == "SCANGATE_DATABASE_PATH").then(|| "local.db".to_string())
            })
            .expect("finish");
        assert_eq!(config.database_path, "local.db");

        let mut config: AppConfig =
            toml::from_str(r#"database_path = "data/scangate.db""#).expect("parse");
        config
            .finish(Some(Path::new("/etc/scangate")), |_| None)
            .expect("finish");
        assert_eq!(config.database_path, "/etc/scangate/data/scangate.db");
    }

    #[test]
    fn rejects_invalid_values() {
        let config = AppConfig {
            idle_timeout_minutes: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            admin_recent_scans: 2000,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            backend_url: "localhost:3001".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
