//! trainpack - Training-Package Wizard Engine
//!
//! The state machine behind a four-step wizard for assembling LLM
//! fine-tuning packages: pick a base model, configure training, select
//! datasets, choose a deployment target.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`workflow`]: Wizard state, validation rules, navigation and the store
//! - [`autosave`]: Debounced auto-save and on-disk snapshots
//! - [`monitoring`]: Structured events and observers
//! - [`session`]: Replaying scripted sessions against a store
//!
//! # Example
//!
//! ```rust,no_run
//! use trainpack::autosave::{AutoSaveConfig, SnapshotStore};
//! use trainpack::monitoring::LogObserver;
//! use trainpack::workflow::{ModelData, ModelInfo, StepId, WorkflowStore};
//!
//! let snapshots = SnapshotStore::default();
//! let mut store = WorkflowStore::new("support-bot")
//!     .with_observer(LogObserver::default())
//!     .with_error_handler(|e| eprintln!("{}", e))
//!     .with_auto_save(AutoSaveConfig::default(), move |state| {
//!         let _ = snapshots.save_draft(&state);
//!     });
//!
//! store.update_step_data(ModelData::with_model(ModelInfo::new("phi-3", "Phi-3 Mini", 7.6)).into());
//! store.complete_step(StepId::Model);
//! store.navigate_to_step(StepId::Config).ok();
//! ```

pub mod autosave;
pub mod error;
pub mod monitoring;
pub mod session;
pub mod workflow;

// Re-export commonly used types
pub use error::{NavigationError, ScriptError, SnapshotError};
pub use workflow::store::WorkflowStore;
pub use workflow::{StepData, StepId, StepStatus, ValidationResult, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "trainpack";
