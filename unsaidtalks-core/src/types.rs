//! Core data type definitions

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the dashboard runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub fetch: FetchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the durable session slot lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding slot files; `~` is expanded
    pub data_dir: String,
    /// Fixed key of the persisted session record
    pub session_key: String,
}

/// Remote data service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between the end of one poll and the start of the next
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Optional producer timeout; `None` leaves hung calls loading forever
    pub timeout_ms: Option<u64>,
}
