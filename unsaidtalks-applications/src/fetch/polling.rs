//! Polling Controller
//!
//! Re-runs a producer on a fixed cadence while enabled. The next tick is
//! scheduled only after the previous one has settled, so ticks never
//! overlap and consecutive starts are at least `duration + interval` apart.

use super::cell::FetchCell;
use super::{FetchState, Producer};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use unsaidtalks_core::{maybe_timeout, DEFAULT_POLL_INTERVAL_MS};

/// Polling behaviour
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub label: String,
    pub interval: Duration,
    pub enabled: bool,
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            label: "poll".to_string(),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            enabled: true,
            timeout: None,
        }
    }
}

impl PollOptions {
    pub fn new(label: impl Into<String>, interval: Duration) -> Self {
        Self {
            label: label.into(),
            interval,
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

struct PollLoop {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PollLoop {
    fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
    }
}

struct PollControl {
    interval: Duration,
    enabled: bool,
    running: Option<PollLoop>,
}

/// Periodic fetch controller
pub struct PollingResource<T: Clone + Send + Sync + 'static> {
    cell: Arc<FetchCell<T>>,
    producer: Producer<T>,
    timeout: Option<Duration>,
    control: Mutex<PollControl>,
}

impl<T: Clone + Send + Sync + 'static> PollingResource<T> {
    pub fn new(producer: Producer<T>, interval: Duration) -> Self {
        Self::with_options(producer, PollOptions::new("poll", interval))
    }

    pub fn with_options(producer: Producer<T>, options: PollOptions) -> Self {
        Self {
            cell: Arc::new(FetchCell::new(options.label)),
            producer,
            timeout: options.timeout,
            control: Mutex::new(PollControl {
                interval: options.interval,
                enabled: options.enabled,
                running: None,
            }),
        }
    }

    /// Fetch immediately and keep polling while enabled
    pub fn start(&self) {
        let mut control = self.control();
        if !control.enabled {
            debug!(resource = %self.cell.label(), "Polling disabled, not starting");
            return;
        }
        self.restart(&mut control);
    }

    /// Stop scheduling; an in-flight tick's result is discarded
    pub fn stop(&self) {
        let mut control = self.control();
        if let Some(running) = control.running.take() {
            running.stop();
            self.cell.halt();
            info!(resource = %self.cell.label(), "Polling stopped");
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut control = self.control();
        if control.enabled == enabled {
            return;
        }
        control.enabled = enabled;
        if enabled {
            self.restart(&mut control);
        } else if let Some(running) = control.running.take() {
            running.stop();
            self.cell.halt();
            info!(resource = %self.cell.label(), "Polling disabled");
        }
    }

    /// Change the cadence; a running loop restarts with an immediate tick
    pub fn set_interval(&self, interval: Duration) {
        let mut control = self.control();
        if control.interval == interval {
            return;
        }
        control.interval = interval;
        if control.running.is_some() {
            self.restart(&mut control);
        }
    }

    pub fn interval(&self) -> Duration {
        self.control().interval
    }

    pub fn is_enabled(&self) -> bool {
        self.control().enabled
    }

    pub fn is_running(&self) -> bool {
        self.control()
            .running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Stop polling for good. Idempotent.
    pub fn dispose(&self) {
        self.cell.dispose();
        if let Some(running) = self.control().running.take() {
            running.stop();
        }
    }

    pub fn state(&self) -> FetchState<T> {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.cell.subscribe()
    }

    fn restart(&self, control: &mut PollControl) {
        if self.cell.is_disposed() {
            return;
        }
        if let Some(previous) = control.running.take() {
            previous.stop();
            self.cell.halt();
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(resource = %self.cell.label(), error = %e, "Cannot poll without an async runtime");
                return;
            }
        };

        let Some(first) = self.cell.begin(true) else {
            return;
        };
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = runtime.spawn(poll_loop(
            Arc::clone(&self.cell),
            self.producer.clone(),
            control.interval,
            self.timeout,
            first,
            shutdown_rx,
        ));
        info!(
            resource = %self.cell.label(),
            interval_ms = control.interval.as_millis() as u64,
            "Polling started"
        );
        control.running = Some(PollLoop {
            shutdown: Some(shutdown),
            handle,
        });
    }

    fn control(&self) -> MutexGuard<'_, PollControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for PollingResource<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn poll_loop<T: Clone + Send + Sync + 'static>(
    cell: Arc<FetchCell<T>>,
    producer: Producer<T>,
    interval: Duration,
    timeout: Option<Duration>,
    first: u64,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut token = first;
    let mut tick: u64 = 1;
    loop {
        let outcome = tokio::select! {
            outcome = maybe_timeout(producer(), timeout, cell.label()) => outcome,
            _ = &mut shutdown => break,
        };
        match &outcome {
            Err(e) if e.is_recoverable() => {
                warn!(resource = %cell.label(), tick, error = %e, "Poll tick failed, retrying next tick");
            }
            Err(e) => e.log(),
            Ok(_) => {}
        }
        if !cell.settle(token, outcome) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => break,
        }

        // A stop or restart halts the cell, which moves the generation on.
        let Some(next) = cell.begin_after(token, true) else {
            break;
        };
        token = next;
        tick += 1;
    }
    debug!(resource = %cell.label(), ticks = tick, "Poll loop exited");
}
