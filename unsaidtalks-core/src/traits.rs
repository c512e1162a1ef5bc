//! Core trait definitions

use crate::error::DashboardResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Persistent client-side key-value slot
///
/// Implementations are synchronous; a failed write surfaces as a
/// `DashboardError::Persistence` to the caller.
pub trait KeyValueSlot: Send + Sync {
    /// Read the raw value stored under `key`
    fn get(&self, key: &str) -> DashboardResult<Option<String>>;

    /// Overwrite the value stored under `key`
    fn set(&self, key: &str, value: &str) -> DashboardResult<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> DashboardResult<()>;
}

/// HTTP-like verb for data service writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMethod::Post => write!(f, "POST"),
            WriteMethod::Put => write!(f, "PUT"),
            WriteMethod::Patch => write!(f, "PATCH"),
            WriteMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Opaque request/response boundary every controller talks to
#[async_trait]
pub trait DataService: Send + Sync {
    /// Read a resource
    async fn get(&self, endpoint: &str) -> DashboardResult<Value>;

    /// Perform a state-changing call
    async fn send(
        &self,
        method: WriteMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> DashboardResult<Value>;
}

/// Source of "now" for session timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
