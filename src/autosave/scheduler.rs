//! Auto-Save Scheduler
//!
//! Debounced delivery of workflow snapshots to a persistence callback.
//!
//! Every [`arm`](AutoSaveScheduler::arm) replaces the pending snapshot and
//! restarts the debounce timer, so rapid edits keep deferring the save until
//! the user pauses. When the timer fires, the snapshot is saved only if at
//! least `min_interval` has passed since the previous save; otherwise the
//! timer is pushed back to the end of that window.
//!
//! The timer lives on one worker thread fed through a channel. There is at
//! most one pending snapshot, so two saves for the same workflow can never
//! run at the same time.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::workflow::WorkflowState;

/// Default debounce delay and minimum spacing between saves.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Timing for the auto-save scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last change before a save fires
    pub debounce: Duration,
    /// Minimum time between two saves
    pub min_interval: Duration,
}

impl AutoSaveConfig {
    /// Uses the same duration for the debounce and the save floor.
    pub fn new(interval: Duration) -> Self {
        Self {
            debounce: interval,
            min_interval: interval,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL)
    }
}

/// Messages from the owning store to the worker.
enum Command {
    Arm(Box<WorkflowState>),
    Cancel,
    Flush(Sender<bool>),
    Shutdown,
}

/// What the worker reports back about completed saves.
#[derive(Debug, Default)]
struct SaveRecord {
    last_saved: Option<DateTime<Utc>>,
    saves: usize,
}

struct Pending {
    snapshot: WorkflowState,
    deadline: Instant,
}

/// Worker-side state, owned by the timer thread.
struct Worker<F> {
    config: AutoSaveConfig,
    callback: F,
    record: Arc<Mutex<SaveRecord>>,
    pending: Option<Pending>,
    last_saved_at: Option<Instant>,
}

impl<F> Worker<F>
where
    F: FnMut(WorkflowState),
{
    fn run(mut self, rx: Receiver<Command>) {
        loop {
            let received = match &self.pending {
                Some(pending) => {
                    let now = Instant::now();
                    if now >= pending.deadline {
                        Err(RecvTimeoutError::Timeout)
                    } else {
                        rx.recv_timeout(pending.deadline - now)
                    }
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Command::Arm(snapshot)) => {
                    self.pending = Some(Pending {
                        snapshot: *snapshot,
                        deadline: Instant::now() + self.config.debounce,
                    });
                }
                Ok(Command::Cancel) => {
                    self.pending = None;
                }
                Ok(Command::Flush(ack)) => {
                    let saved = match self.pending.take() {
                        Some(pending) => {
                            self.save(pending.snapshot);
                            true
                        }
                        None => false,
                    };
                    let _ = ack.send(saved);
                }
                Err(RecvTimeoutError::Timeout) => self.fire(),
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if self.pending.is_some() {
            debug!("Auto-save worker stopped with an unsaved pending snapshot");
        }
    }

    /// Timer expiry: save now or wait out the rest of the floor.
    fn fire(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        if let Some(last) = self.last_saved_at {
            let floor = last + self.config.min_interval;
            if Instant::now() < floor {
                debug!("Auto-save deferred until minimum interval has passed");
                self.pending = Some(Pending {
                    snapshot: pending.snapshot,
                    deadline: floor,
                });
                return;
            }
        }

        self.save(pending.snapshot);
    }

    fn save(&mut self, mut snapshot: WorkflowState) {
        let saved_at = Utc::now();
        snapshot.last_auto_save = Some(saved_at);

        debug!(
            "Auto-saving '{}' v{} at step '{}'",
            snapshot.base_name, snapshot.version, snapshot.current_step
        );
        (self.callback)(snapshot);

        self.last_saved_at = Some(Instant::now());
        match self.record.lock() {
            Ok(mut record) => {
                record.last_saved = Some(saved_at);
                record.saves += 1;
            }
            Err(_) => warn!("Auto-save record lock poisoned; save time not recorded"),
        }
    }
}

/// Handle to the auto-save worker thread.
///
/// Dropping the handle discards any pending snapshot and stops the worker.
pub struct AutoSaveScheduler {
    config: AutoSaveConfig,
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    record: Arc<Mutex<SaveRecord>>,
}

impl AutoSaveScheduler {
    /// Starts a worker that delivers snapshots to `callback`.
    ///
    /// The callback runs on the worker thread. It is fire-and-forget: the
    /// scheduler does not retry, and errors are the callback's concern.
    pub fn spawn<F>(config: AutoSaveConfig, callback: F) -> Self
    where
        F: FnMut(WorkflowState) + Send + 'static,
    {
        let (tx, rx) = channel();
        let record = Arc::new(Mutex::new(SaveRecord::default()));

        let worker = Worker {
            config,
            callback,
            record: Arc::clone(&record),
            pending: None,
            last_saved_at: None,
        };
        let handle = thread::spawn(move || worker.run(rx));

        Self {
            config,
            tx,
            worker: Some(handle),
            record,
        }
    }

    pub fn config(&self) -> AutoSaveConfig {
        self.config
    }

    /// Replaces the pending snapshot and restarts the debounce timer.
    pub fn arm(&self, snapshot: WorkflowState) {
        self.send(Command::Arm(Box::new(snapshot)));
    }

    /// Drops the pending snapshot, if any.
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    /// Saves the pending snapshot immediately, ignoring both timers.
    ///
    /// Blocks until the callback has returned. Returns true if a snapshot
    /// was saved.
    pub fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = channel();
        self.send(Command::Flush(ack_tx));
        ack_rx.recv().unwrap_or(false)
    }

    /// When the most recent save went out.
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.record.lock().ok().and_then(|record| record.last_saved)
    }

    /// Number of saves delivered so far.
    pub fn save_count(&self) -> usize {
        self.record.lock().map(|record| record.saves).unwrap_or(0)
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("Auto-save worker is not running; command dropped");
        }
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Auto-save worker panicked");
            }
        }
    }
}
