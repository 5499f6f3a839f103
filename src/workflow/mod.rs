//! Wizard Workflow Module
//!
//! The four-step training-package wizard: its data model, validation rules,
//! navigation guard and the store that ties them together.
//!
//! # Structure
//!
//! - [`model`]: Step identifiers, step state and the workflow aggregate
//! - [`payload`]: Per-step user selections
//! - [`validator`]: Pure validation rules per step
//! - [`navigation`]: Forward/backward navigation guard
//! - [`store`]: The mutable workflow store
//! - [`script`]: YAML session scripts

pub mod model;
pub mod navigation;
pub mod payload;
pub mod script;
pub mod store;
pub mod validator;

pub use model::{StepId, StepState, StepStates, StepStatus, VersionStatus, WorkflowState};
pub use navigation::can_advance;
pub use payload::{
    ConfigData, CostEstimate, DatasetData, DatasetRef, DeployData, DeploymentTarget, ModelData,
    ModelInfo, SpaceConfig, StepData, TrainingConfig, TrainingMethod,
};
pub use script::{load_script, parse_script, Action, SessionScript};
pub use store::WorkflowStore;
pub use validator::{validate, Severity, ValidationIssue, ValidationResult};
