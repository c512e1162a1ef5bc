//! Generation-guarded state cell shared by the fetch and polling controllers
//!
//! Every invocation takes a token from `begin`. `settle` only applies an
//! outcome whose token is still current, so a response that arrives after
//! disposal or after a newer invocation started is dropped.

use super::FetchState;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::debug;
use unsaidtalks_core::DashboardResult;

#[derive(Debug, Default)]
struct Generation {
    current: u64,
    disposed: bool,
}

pub(crate) struct FetchCell<T> {
    label: String,
    generation: Mutex<Generation>,
    state: watch::Sender<FetchState<T>>,
}

impl<T: Clone + Send + Sync + 'static> FetchCell<T> {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            label: label.into(),
            generation: Mutex::new(Generation::default()),
            state,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// Start an invocation. Returns `None` once disposed.
    pub(crate) fn begin(&self, retain_data: bool) -> Option<u64> {
        let mut generation = self.lock();
        if generation.disposed {
            return None;
        }
        generation.current += 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            if !retain_data {
                state.data = None;
            }
        });
        Some(generation.current)
    }

    /// Start the invocation that follows `previous`, unless anything else
    /// (a halt, a reject, another invocation) has moved the generation since.
    pub(crate) fn begin_after(&self, previous: u64, retain_data: bool) -> Option<u64> {
        let mut generation = self.lock();
        if generation.disposed || generation.current != previous {
            return None;
        }
        generation.current += 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            if !retain_data {
                state.data = None;
            }
        });
        Some(generation.current)
    }

    /// Apply an outcome if `token` is still current. Returns whether it was applied.
    pub(crate) fn settle(&self, token: u64, outcome: DashboardResult<T>) -> bool {
        let generation = self.lock();
        if generation.disposed || generation.current != token {
            debug!(
                resource = %self.label,
                token,
                current = generation.current,
                disposed = generation.disposed,
                "Discarding stale resolution"
            );
            return false;
        }
        self.state.send_modify(|state| {
            state.loading = false;
            match outcome {
                Ok(data) => {
                    state.data = Some(data);
                    state.error = None;
                }
                Err(e) => state.error = Some(e.display_message()),
            }
        });
        true
    }

    /// Orphan any in-flight invocation and stop showing it as loading
    pub(crate) fn halt(&self) {
        let mut generation = self.lock();
        if generation.disposed {
            return;
        }
        generation.current += 1;
        self.state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
    }

    /// Settle immediately with an error and no data, without an invocation
    pub(crate) fn reject(&self, message: String) {
        let mut generation = self.lock();
        if generation.disposed {
            return;
        }
        generation.current += 1;
        self.state.send_modify(|state| {
            state.data = None;
            state.error = Some(message);
            state.loading = false;
        });
    }

    /// Permanently stop applying updates; observable state is left as is
    pub(crate) fn dispose(&self) {
        let mut generation = self.lock();
        if !generation.disposed {
            generation.disposed = true;
            generation.current += 1;
            debug!(resource = %self.label, "Disposed");
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Local edit of the current data (optimistic updates)
    pub(crate) fn update_data<F: FnOnce(&mut T)>(&self, f: F) -> bool {
        let generation = self.lock();
        if generation.disposed {
            return false;
        }
        self.state.send_if_modified(|state| match state.data.as_mut() {
            Some(data) => {
                f(data);
                true
            }
            None => false,
        })
    }

    pub(crate) fn snapshot(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Generation> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unsaidtalks_core::DashboardError;

    #[test]
    fn test_stale_token_is_ignored() {
        let cell = FetchCell::<&'static str>::new("stats");
        let first = cell.begin(true).unwrap();
        let second = cell.begin(true).unwrap();

        assert!(cell.settle(second, Ok("B")));
        assert!(!cell.settle(first, Ok("A")));
        assert_eq!(cell.snapshot().data, Some("B"));
    }

    #[test]
    fn test_error_keeps_previous_data() {
        let cell = FetchCell::<u32>::new("stats");
        let token = cell.begin(true).unwrap();
        cell.settle(token, Ok(1));

        let token = cell.begin(true).unwrap();
        assert!(cell.snapshot().loading);
        assert_eq!(cell.snapshot().data, Some(1));

        cell.settle(token, Err(DashboardError::fetch("offline")));
        let state = cell.snapshot();
        assert_eq!(state.data, Some(1));
        assert_eq!(state.error.as_deref(), Some("offline"));
        assert!(!state.loading);
    }

    #[test]
    fn test_dispose_freezes_state() {
        let cell = FetchCell::<u32>::new("stats");
        let token = cell.begin(true).unwrap();
        let frozen = cell.snapshot();
        cell.dispose();

        assert!(!cell.settle(token, Ok(5)));
        assert!(!cell.update_data(|n| *n += 1));
        assert!(cell.begin(true).is_none());
        assert_eq!(cell.snapshot(), frozen);
    }

    #[test]
    fn test_begin_after_refuses_once_halted() {
        let cell = FetchCell::<u32>::new("stats");
        let token = cell.begin(true).unwrap();
        assert!(cell.settle(token, Ok(1)));

        let next = cell.begin_after(token, true).unwrap();
        assert!(cell.snapshot().loading);
        assert!(cell.settle(next, Ok(2)));

        cell.halt();
        assert_eq!(cell.begin_after(next, true), None);
        let state = cell.snapshot();
        assert!(!state.loading);
        assert_eq!(state.data, Some(2));
    }

    #[test]
    fn test_reject_clears_data() {
        let cell = FetchCell::<u32>::new("session");
        let token = cell.begin(true).unwrap();
        cell.settle(token, Ok(9));
        cell.reject("No session ID provided".to_string());

        let state = cell.snapshot();
        assert_eq!(state.data, None);
        assert_eq!(state.error.as_deref(), Some("No session ID provided"));
        assert!(!state.loading);
    }
}
