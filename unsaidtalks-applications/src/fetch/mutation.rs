//! Mutation Controller

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use unsaidtalks_core::{DashboardError, DashboardResult, ErrorContext};

/// Observable state of a mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    pub loading: bool,
    pub error: Option<String>,
}

type Operation<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, DashboardResult<R>> + Send + Sync>;

/// Wraps a write operation, tracking loading/error and re-raising failures.
///
/// Concurrent invocations share one state; the last to settle wins.
pub struct Mutation<A, R> {
    label: String,
    operation: Operation<A, R>,
    state: watch::Sender<MutationState>,
}

impl<A, R> Mutation<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F, Fut>(label: impl Into<String>, operation: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DashboardResult<R>> + Send + 'static,
    {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            label: label.into(),
            operation: Arc::new(move |args| operation(args).boxed()),
            state,
        }
    }

    /// Run the operation. A failure is recorded and returned as a mutation error.
    ///
    /// Dropping the returned future before it settles clears `loading`.
    pub async fn invoke(&self, args: A) -> DashboardResult<R> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        let pending = Pending::new(&self.state);
        debug!(mutation = %self.label, "Invoking mutation");

        let outcome = (self.operation)(args).await;
        pending.disarm();

        match outcome {
            Ok(result) => {
                self.state.send_modify(|state| state.loading = false);
                Ok(result)
            }
            Err(e) => {
                let message = self.failure_message(&e);
                debug!(mutation = %self.label, "Mutation failed");
                e.log();
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message.clone());
                });
                Err(match e {
                    DashboardError::Mutation { .. } => e,
                    other => DashboardError::Mutation {
                        message,
                        source: Some(Box::new(other)),
                        context: ErrorContext::new("mutation").with_operation(&self.label),
                    },
                })
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    fn failure_message(&self, error: &DashboardError) -> String {
        let message = error.to_string();
        if message.trim().is_empty() {
            format!("Failed to {}", self.label)
        } else {
            message
        }
    }
}

/// Clears `loading` if an invocation is dropped mid-flight
struct Pending<'a> {
    state: Option<&'a watch::Sender<MutationState>>,
}

impl<'a> Pending<'a> {
    fn new(state: &'a watch::Sender<MutationState>) -> Self {
        Self { state: Some(state) }
    }

    fn disarm(mut self) {
        self.state = None;
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
        }
    }
}
