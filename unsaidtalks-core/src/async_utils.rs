//! Async utilities and patterns

use crate::error::{DashboardError, DashboardResult, ErrorContext};
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Timeout wrapper for fallible async operations
pub async fn with_timeout<F, T>(future: F, limit: Duration, operation_name: &str) -> DashboardResult<T>
where
    F: Future<Output = DashboardResult<T>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            let duration_ms = limit.as_millis() as u64;
            warn!(operation = operation_name, duration_ms, "Operation timed out");
            Err(DashboardError::Timeout {
                operation: operation_name.to_string(),
                duration_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation("timeout")
                    .with_metadata("timeout_ms", &duration_ms.to_string())
                    .with_suggestion("Increase fetch.timeout_ms")
                    .with_suggestion("Check network connectivity"),
            })
        }
    }
}

/// Apply `limit` when present, otherwise await the future unbounded
pub async fn maybe_timeout<F, T>(
    future: F,
    limit: Option<Duration>,
    operation_name: &str,
) -> DashboardResult<T>
where
    F: Future<Output = DashboardResult<T>>,
{
    match limit {
        Some(limit) => with_timeout(future, limit, operation_name).await,
        None => future.await,
    }
}
