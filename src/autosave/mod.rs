//! Auto-Save Module
//!
//! Keeps draft workflows persisted without the caller having to ask.
//!
//! # Components
//!
//! - [`AutoSaveScheduler`]: debounced snapshot delivery on a worker thread
//! - [`SnapshotStore`]: JSON snapshot files for drafts and published versions

pub mod scheduler;
pub mod snapshot;

pub use scheduler::{AutoSaveConfig, AutoSaveScheduler, DEFAULT_AUTOSAVE_INTERVAL};
pub use snapshot::{SnapshotStore, DEFAULT_SNAPSHOT_DIR};
