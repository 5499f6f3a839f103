//! Workflow Events
//!
//! Structured notifications emitted by the workflow store. The store never
//! logs directly; it reports to a [`WorkflowObserver`] injected at
//! construction.
//!
//! Two observers are provided:
//! - [`LogObserver`]: forwards events to the `log` facade
//! - [`EventLog`]: records events in memory for reports and tests

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::workflow::{StepId, VersionStatus};

/// Something that happened to a workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    StepDataUpdated { step: StepId },
    StepCompleted { step: StepId, warnings: usize },
    StepFailed { step: StepId, errors: usize },
    StepErrorSet { step: StepId, errors: usize },
    StepValidated { step: StepId, is_valid: bool },
    Navigated { from: StepId, to: StepId },
    NavigationRejected { from: StepId, to: StepId },
    StatusChanged { from: VersionStatus, to: VersionStatus, version: u32 },
    Published { version: u32 },
    Reset,
    AutoSaveArmed,
}

impl WorkflowEvent {
    /// The step this event concerns, if any.
    pub fn step(&self) -> Option<StepId> {
        match self {
            Self::StepDataUpdated { step }
            | Self::StepCompleted { step, .. }
            | Self::StepFailed { step, .. }
            | Self::StepErrorSet { step, .. }
            | Self::StepValidated { step, .. } => Some(*step),
            Self::Navigated { to, .. } | Self::NavigationRejected { to, .. } => Some(*to),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepDataUpdated { step } => write!(f, "step '{}' updated", step),
            Self::StepCompleted { step, warnings } => {
                write!(f, "step '{}' completed ({} warnings)", step, warnings)
            }
            Self::StepFailed { step, errors } => {
                write!(f, "step '{}' failed validation ({} errors)", step, errors)
            }
            Self::StepErrorSet { step, errors } => {
                write!(f, "step '{}' marked as failed ({} errors)", step, errors)
            }
            Self::StepValidated { step, is_valid } => {
                write!(f, "step '{}' validated (valid: {})", step, is_valid)
            }
            Self::Navigated { from, to } => write!(f, "moved from '{}' to '{}'", from, to),
            Self::NavigationRejected { from, to } => {
                write!(f, "rejected move from '{}' to '{}'", from, to)
            }
            Self::StatusChanged { from, to, version } => {
                write!(f, "version {} changed from {} to {}", version, from, to)
            }
            Self::Published { version } => write!(f, "version {} published", version),
            Self::Reset => write!(f, "workflow reset"),
            Self::AutoSaveArmed => write!(f, "auto-save scheduled"),
        }
    }
}

/// Receives workflow events.
pub trait WorkflowObserver {
    fn on_event(&self, event: &WorkflowEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {
    fn on_event(&self, _event: &WorkflowEvent) {}
}

/// Forwards events to the `log` facade under a fixed target.
#[derive(Debug, Clone)]
pub struct LogObserver {
    target: String,
}

impl LogObserver {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new("trainpack::workflow")
    }
}

impl WorkflowObserver for LogObserver {
    fn on_event(&self, event: &WorkflowEvent) {
        let target = self.target.as_str();
        match event {
            WorkflowEvent::StepFailed { .. }
            | WorkflowEvent::StepErrorSet { .. }
            | WorkflowEvent::NavigationRejected { .. } => warn!(target: target, "{}", event),
            WorkflowEvent::StepDataUpdated { .. }
            | WorkflowEvent::StepValidated { .. }
            | WorkflowEvent::AutoSaveArmed => debug!(target: target, "{}", event),
            _ => info!(target: target, "{}", event),
        }
    }
}

/// An event with the time it was observed.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: WorkflowEvent,
    pub timestamp: Instant,
}

/// Records events in memory.
///
/// Clones share the same log, so one handle can be given to the store
/// while another is kept for reading.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    start_time: Instant,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            start_time: Instant::now(),
        }
    }

    /// Returns a copy of all recorded events.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns just the events, without timestamps.
    pub fn kinds(&self) -> Vec<WorkflowEvent> {
        self.events().into_iter().map(|r| r.event).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&WorkflowEvent) -> bool) -> usize {
        self.events().iter().filter(|r| predicate(&r.event)).count()
    }

    /// Time from each step's first update to its last completion.
    ///
    /// Steps that were never completed are left out.
    pub fn step_durations(&self) -> HashMap<StepId, Duration> {
        let mut starts: HashMap<StepId, Instant> = HashMap::new();
        let mut durations: HashMap<StepId, Duration> = HashMap::new();

        for recorded in self.events() {
            match recorded.event {
                WorkflowEvent::StepDataUpdated { step } => {
                    starts.entry(step).or_insert(recorded.timestamp);
                }
                WorkflowEvent::StepCompleted { step, .. } => {
                    if let Some(start) = starts.get(&step) {
                        durations.insert(step, recorded.timestamp.duration_since(*start));
                    }
                }
                WorkflowEvent::Reset => {
                    starts.clear();
                    durations.clear();
                }
                _ => {}
            }
        }

        durations
    }

    /// Renders a short per-step report.
    pub fn summary(&self) -> String {
        let durations = self.step_durations();
        let mut output = String::from("Step timings:\n");

        for step in StepId::ALL {
            let line = match durations.get(&step) {
                Some(d) => format!("  {:8} {} ms\n", step.as_str(), d.as_millis()),
                None => format!("  {:8} -\n", step.as_str()),
            };
            output.push_str(&line);
        }

        output.push_str(&format!(
            "\n{} events over {} ms\n",
            self.len(),
            self.start_time.elapsed().as_millis()
        ));
        output
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowObserver for EventLog {
    fn on_event(&self, event: &WorkflowEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                event: event.clone(),
                timestamp: Instant::now(),
            });
        }
    }
}

/// Sends each event to several observers.
#[derive(Default)]
pub struct FanoutObserver {
    observers: Vec<Box<dyn WorkflowObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: impl WorkflowObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }
}

impl WorkflowObserver for FanoutObserver {
    fn on_event(&self, event: &WorkflowEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
