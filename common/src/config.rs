// Configuration management with layered configuration (defaults, file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub monitor: MonitorConfig,
    pub dispatch: DispatchConfig,
    pub persistence: PersistenceConfig,
    pub observability: ObservabilityConfig,
}

/// Remote value source (spreadsheet API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the values API; source id and range are appended as
    /// path segments
    pub base_url: String,
    /// API key appended as a query parameter, if the source requires one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Bearer token sent in the Authorization header, if required
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Upper bound on any single fetch, initial or recurring
    pub fetch_timeout_seconds: u64,
}

/// Fetch cache and upstream throttle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched snapshot is served without a new fetch
    pub ttl_seconds: u64,
    /// Floor between two real fetches of the same (source, range) key
    pub min_fetch_interval_seconds: u64,
}

/// Check scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Mandatory floor on job check intervals; requests below it are raised
    /// to it to protect the upstream source
    pub min_check_interval_seconds: u64,
    /// Cap on changes reported per check cycle, to keep one burst of edits
    /// from flooding a webhook
    pub max_reported_changes: usize,
}

/// Notification delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Delivery attempts per notification before it is dropped
    pub max_attempts: u32,
    /// Backoff base; attempt n waits base * 2^n
    pub backoff_base_ms: u64,
    /// Upper bound on any single webhook POST
    pub request_timeout_seconds: u64,
    /// Deep-link template; `{id}` is replaced with the source id
    pub document_url_template: String,
}

/// Job definition store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON job store file
    pub path: String,
    /// How often the active job set is flushed to the store, in addition to
    /// the flush on every create/stop
    pub flush_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.source.base_url.is_empty() {
            return Err("Source base_url cannot be empty".to_string());
        }
        if self.source.fetch_timeout_seconds == 0 {
            return Err("Source fetch_timeout_seconds must be greater than 0".to_string());
        }

        if self.monitor.min_check_interval_seconds == 0 {
            return Err("Monitor min_check_interval_seconds must be greater than 0".to_string());
        }
        if self.monitor.max_reported_changes == 0 {
            return Err("Monitor max_reported_changes must be greater than 0".to_string());
        }

        if self.dispatch.max_attempts == 0 {
            return Err("Dispatch max_attempts must be greater than 0".to_string());
        }
        if self.dispatch.request_timeout_seconds == 0 {
            return Err("Dispatch request_timeout_seconds must be greater than 0".to_string());
        }

        if self.persistence.path.is_empty() {
            return Err("Persistence path cannot be empty".to_string());
        }
        if self.persistence.flush_interval_seconds == 0 {
            return Err("Persistence flush_interval_seconds must be greater than 0".to_string());
        }

        if self.observability.metrics_port == 0 {
            return Err("Metrics port must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
                api_key: None,
                bearer_token: None,
                fetch_timeout_seconds: 10,
            },
            cache: CacheConfig {
                ttl_seconds: 30,
                min_fetch_interval_seconds: 60,
            },
            monitor: MonitorConfig {
                min_check_interval_seconds: 60,
                max_reported_changes: 3,
            },
            dispatch: DispatchConfig {
                max_attempts: 3,
                backoff_base_ms: 500,
                request_timeout_seconds: 10,
                document_url_template: "https://docs.google.com/spreadsheets/d/{id}".to_string(),
            },
            persistence: PersistenceConfig {
                path: "data/jobs.json".to_string(),
                flush_interval_seconds: 300,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_catches_empty_base_url() {
        let mut settings = Settings::default();
        settings.source.base_url = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_check_interval_floor() {
        let mut settings = Settings::default();
        settings.monitor.min_check_interval_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_dispatch_attempts() {
        let mut settings = Settings::default();
        settings.dispatch.max_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_allows_zero_cache_intervals() {
        // A zero TTL and zero throttle disable caching; both are legal.
        let mut settings = Settings::default();
        settings.cache.ttl_seconds = 0;
        settings.cache.min_fetch_interval_seconds = 0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[source]
base_url = "https://sheets.example.com/v4/spreadsheets"
fetch_timeout_seconds = 5

[cache]
ttl_seconds = 15
min_fetch_interval_seconds = 30

[monitor]
min_check_interval_seconds = 45
max_reported_changes = 5

[dispatch]
max_attempts = 2
backoff_base_ms = 250
request_timeout_seconds = 5
document_url_template = "https://sheets.example.com/open/{id}"

[persistence]
path = "jobs.json"
flush_interval_seconds = 60

[observability]
log_level = "debug"
metrics_port = 9100
"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(dir.path()).unwrap();
        assert_eq!(
            settings.source.base_url,
            "https://sheets.example.com/v4/spreadsheets"
        );
        assert_eq!(settings.source.api_key, None);
        assert_eq!(settings.cache.min_fetch_interval_seconds, 30);
        assert_eq!(settings.monitor.min_check_interval_seconds, 45);
        assert_eq!(settings.monitor.max_reported_changes, 5);
        assert_eq!(settings.dispatch.max_attempts, 2);
        assert_eq!(settings.persistence.path, "jobs.json");
        assert_eq!(settings.observability.log_level, "debug");
        assert!(settings.validate().is_ok());
    }
}
