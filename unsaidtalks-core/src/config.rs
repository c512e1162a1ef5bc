//! Configuration management

use crate::error::{DashboardError, DashboardResult, ErrorContext};
use crate::logging::LoggingConfig;
use crate::types::{ApiConfig, DashboardConfig, FetchConfig, PollingConfig, StorageConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Key the session record is stored under
pub const DEFAULT_SESSION_KEY: &str = "unsaidtalks_user";

/// Default poll interval (30 seconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

const API_URL_ENV: &str = "UNSAIDTALKS_API_URL";
const API_KEY_ENV: &str = "UNSAIDTALKS_API_KEY";

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: "~/.unsaidtalks/data".to_string(),
                session_key: DEFAULT_SESSION_KEY.to_string(),
            },
            api: ApiConfig {
                base_url: "http://127.0.0.1:3001".to_string(),
                api_key: String::new(),
            },
            polling: PollingConfig {
                interval_ms: DEFAULT_POLL_INTERVAL_MS,
            },
            fetch: FetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DashboardResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DashboardError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DashboardConfig =
            toml::from_str(&content).map_err(|e| DashboardError::Config {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DashboardResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DashboardError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| DashboardError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Apply `UNSAIDTALKS_API_URL` / `UNSAIDTALKS_API_KEY` overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.api.api_key = key;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> DashboardResult<()> {
        if self.storage.session_key.trim().is_empty() {
            return Err(crate::config_error!(
                "storage.session_key must not be empty",
                "config"
            ));
        }

        if self.polling.interval_ms == 0 {
            return Err(DashboardError::Config {
                message: "polling.interval_ms must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set polling.interval_ms to a positive value"),
            });
        }

        if self.fetch.timeout_ms == Some(0) {
            return Err(DashboardError::Config {
                message: "fetch.timeout_ms must be greater than 0 when set".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Remove fetch.timeout_ms to disable the timeout"),
            });
        }

        url::Url::parse(&self.api.base_url).map_err(|e| DashboardError::Config {
            message: format!("api.base_url is not a valid URL: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("validate"),
        })?;

        Ok(())
    }

    /// Storage directory with `~` expanded to the home directory
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.storage.data_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch.timeout_ms.map(Duration::from_millis)
    }

    /// Default location of the config file (`~/.unsaidtalks/config.toml`)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".unsaidtalks")
            .join("config.toml")
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
