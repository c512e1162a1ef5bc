//! Fetch runtime types

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use unsaidtalks_core::DashboardResult;

/// Zero-argument async producer of a resource
pub type Producer<T> = Arc<dyn Fn() -> BoxFuture<'static, DashboardResult<T>> + Send + Sync>;

/// Wrap an async closure as a [`Producer`]
pub fn producer<T, F, Fut>(f: F) -> Producer<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DashboardResult<T>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Observable state of one resource
///
/// `data` and `error` are never both written by the same resolution; a
/// failure after an earlier success keeps the old `data` next to the new
/// `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub loading: bool,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

/// Coarse lifecycle phase derived from a [`FetchState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl<T> FetchState<T> {
    pub fn phase(&self) -> FetchPhase {
        if self.loading {
            FetchPhase::Loading
        } else if self.error.is_some() {
            FetchPhase::Failed
        } else if self.data.is_some() {
            FetchPhase::Ready
        } else {
            FetchPhase::Idle
        }
    }

    /// Map the data, keeping loading/error as they are
    pub fn map<U, F: FnOnce(&T) -> U>(&self, f: F) -> FetchState<U> {
        FetchState {
            data: self.data.as_ref().map(f),
            error: self.error.clone(),
            loading: self.loading,
        }
    }
}

/// Per-controller fetch behaviour
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Name used in logs and generated messages
    pub label: String,
    /// Keep the previous data visible while a new invocation is loading
    pub retain_data: bool,
    /// Optional producer timeout
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            label: "resource".to_string(),
            retain_data: true,
            timeout: None,
        }
    }
}

impl FetchOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn clear_on_restart(mut self) -> Self {
        self.retain_data = false;
        self
    }
}
