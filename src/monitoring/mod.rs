//! Monitoring Module
//!
//! Structured workflow events and the observers that consume them.
//!
//! # Components
//!
//! - [`WorkflowObserver`]: the trait the store reports to
//! - [`LogObserver`]: forwards events to the `log` facade
//! - [`EventLog`]: in-memory event history with per-step timings

pub mod events;

pub use events::{
    EventLog, FanoutObserver, LogObserver, NoopObserver, RecordedEvent, WorkflowEvent,
    WorkflowObserver,
};
