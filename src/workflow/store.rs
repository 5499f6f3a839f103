//! Workflow Store
//!
//! Single source of truth for one wizard session. All mutations go through
//! the store, which keeps step statuses, validation results and the version
//! status consistent, reports events to its observer and re-arms the
//! auto-save timer after every change.
//!
//! # Example
//!
//! ```rust
//! use trainpack::workflow::{ModelData, ModelInfo, StepId, WorkflowStore};
//!
//! let mut store = WorkflowStore::new("support-bot");
//! store.update_step_data(ModelData::with_model(ModelInfo::new("phi-3", "Phi-3 Mini", 7.6)).into());
//!
//! let result = store.complete_step(StepId::Model);
//! assert!(result.is_valid);
//! assert!(store.navigate_to_step(StepId::Config).is_ok());
//! ```

use chrono::{DateTime, Utc};

use crate::autosave::{AutoSaveConfig, AutoSaveScheduler};
use crate::error::NavigationError;
use crate::monitoring::{NoopObserver, WorkflowEvent, WorkflowObserver};

use super::model::{StepId, StepStatus, VersionStatus, WorkflowState};
use super::navigation;
use super::payload::StepData;
use super::validator::{self, ValidationResult};

/// Callback for rejected navigation requests.
pub type ErrorHandler = Box<dyn Fn(&NavigationError)>;

/// Owns and mutates the state of one wizard session.
pub struct WorkflowStore {
    state: WorkflowState,
    published: Vec<WorkflowState>,
    /// Highest version already published outside this session
    published_floor: u32,
    observer: Box<dyn WorkflowObserver>,
    on_error: Option<ErrorHandler>,
    autosave: Option<AutoSaveScheduler>,
}

impl WorkflowStore {
    /// Starts a fresh wizard session for a package base name.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self::from_state(WorkflowState::new(base_name))
    }

    /// Resumes a session from an existing state, e.g. a loaded draft.
    pub fn from_state(state: WorkflowState) -> Self {
        Self {
            state,
            published: Vec::new(),
            published_floor: 0,
            observer: Box::new(NoopObserver),
            on_error: None,
            autosave: None,
        }
    }

    /// Declares versions up to `latest` as already published, e.g. found on
    /// disk. An unpublished state at or below it moves to `latest + 1`, and
    /// later versions never reuse those numbers.
    pub fn with_published_floor(mut self, latest: u32) -> Self {
        self.published_floor = latest;
        if !self.state.is_published() && self.state.version <= latest {
            self.state.version = latest + 1;
        }
        self
    }

    /// Sets the observer that receives workflow events.
    pub fn with_observer(mut self, observer: impl WorkflowObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Sets the callback invoked when navigation is rejected.
    pub fn with_error_handler(mut self, handler: impl Fn(&NavigationError) + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Enables auto-save of draft snapshots through `callback`.
    pub fn with_auto_save<F>(mut self, config: AutoSaveConfig, callback: F) -> Self
    where
        F: FnMut(WorkflowState) + Send + 'static,
    {
        self.autosave = Some(AutoSaveScheduler::spawn(config, callback));
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn current_step(&self) -> StepId {
        self.state.current_step
    }

    pub fn can_go_next(&self) -> bool {
        navigation::can_go_next(self.state.current_step, &self.state.steps)
    }

    pub fn can_go_previous(&self) -> bool {
        navigation::can_go_previous(self.state.current_step)
    }

    /// Fraction of completed steps.
    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    /// Versions published during this session, oldest first.
    pub fn published_versions(&self) -> &[WorkflowState] {
        &self.published
    }

    /// When the last auto-save went out.
    pub fn last_auto_save(&self) -> Option<DateTime<Utc>> {
        self.autosave
            .as_ref()
            .and_then(AutoSaveScheduler::last_saved)
            .or(self.state.last_auto_save)
    }

    /// Pushes any pending auto-save out now. Returns true if one was saved.
    pub fn flush_auto_save(&mut self) -> bool {
        let saved = self
            .autosave
            .as_ref()
            .is_some_and(AutoSaveScheduler::flush);
        self.sync_last_auto_save();
        saved
    }

    /// Consumes the store, returning its state.
    pub fn into_state(mut self) -> WorkflowState {
        self.sync_last_auto_save();
        self.state
    }

    /// Moves to `target` if the navigation guard allows it.
    ///
    /// On rejection the error is also passed to the error handler and the
    /// state is left untouched.
    pub fn navigate_to_step(&mut self, target: StepId) -> Result<(), NavigationError> {
        let from = self.state.current_step;

        if !navigation::can_advance(from, target, &self.state.steps) {
            let err = NavigationError::StepNotCompleted { from, to: target };
            self.emit(WorkflowEvent::NavigationRejected { from, to: target });
            if let Some(handler) = &self.on_error {
                handler(&err);
            }
            return Err(err);
        }

        if from == target {
            return Ok(());
        }

        self.state.current_step = target;
        self.state.updated_at = Utc::now();
        self.emit(WorkflowEvent::Navigated { from, to: target });
        self.changed();
        Ok(())
    }

    /// Moves to the next step, if allowed.
    pub fn go_next(&mut self) -> Result<(), NavigationError> {
        match self.state.current_step.next() {
            Some(next) => self.navigate_to_step(next),
            None => Ok(()),
        }
    }

    /// Moves to the previous step. Staying on the first step is a no-op.
    pub fn go_previous(&mut self) -> Result<(), NavigationError> {
        match self.state.current_step.previous() {
            Some(previous) => self.navigate_to_step(previous),
            None => Ok(()),
        }
    }

    /// Replaces a step's payload and marks the workflow as a draft.
    ///
    /// The target step is the one the payload is tagged with. A step that
    /// has not started moves to in-progress; other statuses are kept.
    pub fn update_step_data(&mut self, data: StepData) {
        let step_id = data.step_id();
        let now = Utc::now();

        let step = self.state.steps.get_mut(step_id);
        step.data = Some(data);
        if step.status == StepStatus::NotStarted {
            step.status = StepStatus::InProgress;
        }
        step.last_modified = now;

        self.transition(VersionStatus::Draft);
        self.state.updated_at = now;
        self.emit(WorkflowEvent::StepDataUpdated { step: step_id });
        self.changed();
    }

    /// Validates a step and marks it completed or failed accordingly.
    pub fn complete_step(&mut self, step_id: StepId) -> ValidationResult {
        let now = Utc::now();
        let step = self.state.steps.get_mut(step_id);
        let result = validator::validate(step_id, step.data.as_ref());

        step.status = if result.is_valid {
            StepStatus::Completed
        } else {
            StepStatus::Error
        };
        step.validation = Some(result.clone());
        step.last_modified = now;
        self.state.updated_at = now;

        let event = if result.is_valid {
            WorkflowEvent::StepCompleted {
                step: step_id,
                warnings: result.warnings.len(),
            }
        } else {
            WorkflowEvent::StepFailed {
                step: step_id,
                errors: result.errors.len(),
            }
        };
        self.emit(event);
        self.changed();
        result
    }

    /// Marks a step as failed with externally detected errors.
    pub fn set_step_error(&mut self, step_id: StepId, errors: Vec<String>) {
        let now = Utc::now();
        let step = self.state.steps.get_mut(step_id);

        step.status = StepStatus::Error;
        step.validation = Some(ValidationResult::from_messages(step_id.as_str(), &errors));
        step.last_modified = now;
        self.state.updated_at = now;

        self.emit(WorkflowEvent::StepErrorSet {
            step: step_id,
            errors: errors.len(),
        });
        self.changed();
    }

    /// Re-validates a step and stores the result without touching its status.
    pub fn validate_step(&mut self, step_id: StepId) -> ValidationResult {
        let step = self.state.steps.get_mut(step_id);
        let result = validator::validate(step_id, step.data.as_ref());
        step.validation = Some(result.clone());

        self.emit(WorkflowEvent::StepValidated {
            step: step_id,
            is_valid: result.is_valid,
        });
        self.changed();
        result
    }

    /// Returns the workflow to draft. Leaving a published version starts
    /// the next version number.
    pub fn mark_as_draft(&mut self) {
        if self.transition(VersionStatus::Draft) {
            self.state.updated_at = Utc::now();
            self.changed();
        }
    }

    /// Publishes the current version and returns the published snapshot.
    ///
    /// Publishing an already published version returns it unchanged.
    pub fn publish_version(&mut self) -> WorkflowState {
        if self.state.is_published() {
            return self.state.clone();
        }

        self.transition(VersionStatus::Published);
        self.state.updated_at = Utc::now();
        self.sync_last_auto_save();

        let snapshot = self.state.clone();
        self.published.push(snapshot.clone());
        self.emit(WorkflowEvent::Published {
            version: snapshot.version,
        });
        self.changed();
        snapshot
    }

    /// Starts over with a fresh state under the same base name.
    ///
    /// Published versions are kept, and the fresh draft continues after the
    /// newest of them.
    pub fn reset_workflow(&mut self) {
        let mut fresh = WorkflowState::new(self.state.base_name.clone());
        fresh.version = self.latest_published() + 1;

        self.state = fresh;
        self.emit(WorkflowEvent::Reset);
        self.changed();
    }

    /// Moves to a new version status. Returns false if already there.
    fn transition(&mut self, to: VersionStatus) -> bool {
        let from = self.state.status;
        if from == to {
            return false;
        }

        if from == VersionStatus::Published && to == VersionStatus::Draft {
            self.state.version = self.state.version.max(self.latest_published()) + 1;
        }
        self.state.status = to;

        self.emit(WorkflowEvent::StatusChanged {
            from,
            to,
            version: self.state.version,
        });
        true
    }

    /// Called after every mutation: (re)arms or cancels the auto-save.
    fn changed(&mut self) {
        self.sync_last_auto_save();

        let Some(scheduler) = &self.autosave else {
            return;
        };

        if self.state.is_draft() {
            scheduler.arm(self.state.clone());
            self.observer.on_event(&WorkflowEvent::AutoSaveArmed);
        } else {
            scheduler.cancel();
        }
    }

    fn latest_published(&self) -> u32 {
        self.published
            .iter()
            .map(|s| s.version)
            .fold(self.published_floor, u32::max)
    }

    fn sync_last_auto_save(&mut self) {
        if let Some(saved) = self.autosave.as_ref().and_then(AutoSaveScheduler::last_saved) {
            self.state.last_auto_save = Some(saved);
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::EventLog;
    use crate::workflow::payload::{
        ConfigData, DatasetData, DatasetRef, DeployData, DeploymentTarget, ModelData, ModelInfo,
        TrainingConfig,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    fn model_data() -> StepData {
        ModelData::with_model(ModelInfo::new("phi-3", "Phi-3 Mini", 7.6)).into()
    }

    fn dataset_data(count: usize, split: f64) -> StepData {
        let datasets = (0..count)
            .map(|i| DatasetRef::new(format!("ds{}", i), format!("Dataset {}", i)))
            .collect();
        DatasetData::new(datasets, split).into()
    }

    fn completed_through(step: StepId) -> WorkflowStore {
        let mut store = WorkflowStore::new("bot");
        let payloads: [StepData; 4] = [
            model_data(),
            ConfigData::validated(TrainingConfig::default()).into(),
            dataset_data(1, 80.0),
            DeployData {
                package_name: "bot".to_string(),
                deployment_target: Some(DeploymentTarget::Download),
                cost_estimate: None,
            }
            .into(),
        ];

        for payload in payloads.into_iter().take(step.index() + 1) {
            let id = payload.step_id();
            store.update_step_data(payload);
            assert!(store.complete_step(id).is_valid);
            if let Some(next) = id.next() {
                if id != step {
                    store.navigate_to_step(next).unwrap();
                }
            }
        }
        store
    }

    #[test]
    fn test_update_fresh_model() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(model_data());

        assert_eq!(store.state().steps.model.status, StepStatus::InProgress);
        assert!(store.state().is_draft());
        assert!(store.state().steps.model.data.is_some());
    }

    #[test]
    fn test_update_starts_untouched_step() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(dataset_data(1, 80.0));

        assert_eq!(store.state().steps.dataset.status, StepStatus::InProgress);
    }

    #[test]
    fn test_update_keeps_further_status() {
        let mut store = completed_through(StepId::Model);
        store.update_step_data(model_data());

        assert_eq!(store.state().steps.model.status, StepStatus::Completed);
    }

    #[test]
    fn test_complete_dataset_empty() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(dataset_data(0, 80.0));
        let result = store.complete_step(StepId::Dataset);

        let step = &store.state().steps.dataset;
        assert_eq!(step.status, StepStatus::Error);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "selectedDatasets");
        assert_eq!(step.validation.as_ref(), Some(&result));
    }

    #[test]
    fn test_complete_dataset_valid() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(dataset_data(1, 80.0));
        let result = store.complete_step(StepId::Dataset);

        assert_eq!(store.state().steps.dataset.status, StepStatus::Completed);
        assert!(result.warnings.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_complete_dataset_warning_does_not_block() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(dataset_data(1, 40.0));
        let result = store.complete_step(StepId::Dataset);

        assert_eq!(store.state().steps.dataset.status, StepStatus::Completed);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_complete_without_data_fails() {
        let mut store = WorkflowStore::new("bot");
        let before = store.state().steps.model.last_modified;

        let result = store.complete_step(StepId::Model);
        assert!(!result.is_valid);
        assert_eq!(store.state().steps.model.status, StepStatus::Error);
        assert!(store.state().steps.model.last_modified >= before);
    }

    #[test]
    fn test_set_step_error() {
        let mut store = completed_through(StepId::Model);
        store.set_step_error(StepId::Model, vec!["model download failed".to_string()]);

        let step = &store.state().steps.model;
        assert_eq!(step.status, StepStatus::Error);
        let validation = step.validation.as_ref().unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.errors[0].message, "model download failed");
    }

    #[test]
    fn test_set_step_error_without_messages() {
        let mut store = WorkflowStore::new("bot");
        store.set_step_error(StepId::Config, Vec::new());

        let validation = store.state().steps.config.validation.as_ref().unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.errors.len(), 1);
    }

    #[test]
    fn test_validate_step_keeps_status() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(dataset_data(0, 80.0));

        let result = store.validate_step(StepId::Dataset);
        assert!(!result.is_valid);
        assert_eq!(store.state().steps.dataset.status, StepStatus::InProgress);
        assert_eq!(store.state().steps.dataset.validation, Some(result));
    }

    #[test]
    fn test_navigation_forward_blocked() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        let mut store = WorkflowStore::new("bot")
            .with_error_handler(move |e| sink.borrow_mut().push(e.clone()));

        let before = store.state().clone();
        let result = store.navigate_to_step(StepId::Config);

        assert!(result.is_err());
        assert_eq!(store.current_step(), StepId::Model);
        assert_eq!(store.state(), &before);
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(
            errors.borrow()[0],
            NavigationError::StepNotCompleted {
                from: StepId::Model,
                to: StepId::Config
            }
        );
    }

    #[test]
    fn test_navigation_forward_after_completion() {
        let mut store = completed_through(StepId::Model);
        assert!(store.can_go_next());
        assert!(store.navigate_to_step(StepId::Config).is_ok());
        assert_eq!(store.current_step(), StepId::Config);
        assert!(store.can_go_previous());
    }

    #[test]
    fn test_navigation_back_always_allowed() {
        let mut store = completed_through(StepId::Dataset);
        assert_eq!(store.current_step(), StepId::Dataset);

        store.set_step_error(StepId::Dataset, vec!["boom".to_string()]);
        assert!(store.navigate_to_step(StepId::Model).is_ok());
        assert_eq!(store.current_step(), StepId::Model);
        assert!(store.navigate_to_step(StepId::Model).is_ok());
    }

    #[test]
    fn test_go_next_and_previous() {
        let mut store = completed_through(StepId::Model);
        store.go_next().unwrap();
        assert_eq!(store.current_step(), StepId::Config);
        assert!(store.go_next().is_err());

        store.go_previous().unwrap();
        store.go_previous().unwrap();
        assert_eq!(store.current_step(), StepId::Model);
    }

    #[test]
    fn test_reset() {
        let mut store = completed_through(StepId::Dataset);
        store.publish_version();
        store.reset_workflow();

        let state = store.state();
        assert_eq!(state.current_step, StepId::Model);
        assert_eq!(state.steps.model.status, StepStatus::InProgress);
        assert_eq!(state.steps.config.status, StepStatus::NotStarted);
        assert_eq!(state.steps.dataset.status, StepStatus::NotStarted);
        assert_eq!(state.steps.deploy.status, StepStatus::NotStarted);
        assert!(state.is_draft());
        assert_eq!(state.base_name, "bot");
        assert_eq!(state.version, 2);
    }

    #[test]
    fn test_published_floor_moves_fresh_state() {
        let mut store = WorkflowStore::new("bot").with_published_floor(3);
        assert_eq!(store.state().version, 4);

        assert_eq!(store.publish_version().version, 4);
        store.mark_as_draft();
        assert_eq!(store.state().version, 5);
    }

    #[test]
    fn test_published_floor_keeps_newer_draft() {
        let mut state = WorkflowState::new("bot");
        state.version = 7;
        let store = WorkflowStore::from_state(state).with_published_floor(3);
        assert_eq!(store.state().version, 7);
    }

    #[test]
    fn test_reset_respects_published_floor() {
        let mut state = WorkflowState::new("bot");
        state.version = 4;
        let mut store = WorkflowStore::from_state(state).with_published_floor(4);
        assert_eq!(store.state().version, 5);

        store.reset_workflow();
        assert_eq!(store.state().version, 5);
        assert_eq!(store.publish_version().version, 5);
    }

    #[test]
    fn test_publish_then_draft_flags_exclusive() {
        let mut store = WorkflowStore::new("bot");
        let check = |s: &WorkflowStore| {
            assert!(s.state().is_draft() ^ s.state().is_published());
        };

        check(&store);
        let published = store.publish_version();
        check(&store);
        assert!(published.is_published());
        assert_eq!(published.version, 1);

        store.mark_as_draft();
        check(&store);
        assert!(store.state().is_draft());
        assert_eq!(store.state().version, 2);
    }

    #[test]
    fn test_publish_history() {
        let mut store = WorkflowStore::new("bot");
        store.publish_version();
        store.publish_version();
        assert_eq!(store.published_versions().len(), 1);

        store.update_step_data(model_data());
        assert!(store.state().is_draft());
        assert_eq!(store.state().version, 2);

        store.publish_version();
        let versions: Vec<u32> = store.published_versions().iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_mark_as_draft_from_unsaved() {
        let mut state = WorkflowState::new("bot");
        state.status = VersionStatus::Unsaved;
        let mut store = WorkflowStore::from_state(state);

        store.mark_as_draft();
        assert!(store.state().is_draft());
        assert_eq!(store.state().version, 1);
    }

    #[test]
    fn test_progress() {
        let store = completed_through(StepId::Config);
        assert_eq!(store.progress(), 0.5);
    }

    #[test]
    fn test_observer_receives_events() {
        let log = EventLog::new();
        let mut store = WorkflowStore::new("bot").with_observer(log.clone());

        store.update_step_data(model_data());
        store.complete_step(StepId::Model);
        store.navigate_to_step(StepId::Config).unwrap();
        let _ = store.navigate_to_step(StepId::Deploy);

        let events = log.kinds();
        assert_eq!(events[0], WorkflowEvent::StepDataUpdated { step: StepId::Model });
        assert_eq!(
            events[1],
            WorkflowEvent::StepCompleted {
                step: StepId::Model,
                warnings: 0
            }
        );
        assert_eq!(
            events[2],
            WorkflowEvent::Navigated {
                from: StepId::Model,
                to: StepId::Config
            }
        );
        assert_eq!(
            events[3],
            WorkflowEvent::NavigationRejected {
                from: StepId::Config,
                to: StepId::Deploy
            }
        );
    }

    fn saving_store(interval_ms: u64) -> (WorkflowStore, Arc<Mutex<Vec<WorkflowState>>>) {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let store = WorkflowStore::new("bot").with_auto_save(
            AutoSaveConfig::from_millis(interval_ms),
            move |state| sink.lock().unwrap().push(state),
        );
        (store, saved)
    }

    #[test]
    fn test_auto_save_debounces_updates() {
        let (mut store, saved) = saving_store(100);

        store.update_step_data(model_data());
        thread::sleep(Duration::from_millis(20));
        store.update_step_data(dataset_data(1, 80.0));

        thread::sleep(Duration::from_millis(60));
        assert!(saved.lock().unwrap().is_empty());

        thread::sleep(Duration::from_millis(250));
        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].steps.dataset.data.is_some());
    }

    #[test]
    fn test_auto_save_records_time() {
        let (mut store, _saved) = saving_store(30);
        store.update_step_data(model_data());
        thread::sleep(Duration::from_millis(150));

        assert!(store.last_auto_save().is_some());
        store.validate_step(StepId::Model);
        assert!(store.state().last_auto_save.is_some());
    }

    #[test]
    fn test_auto_save_skipped_when_published() {
        let (mut store, saved) = saving_store(50);

        store.update_step_data(model_data());
        store.publish_version();

        thread::sleep(Duration::from_millis(200));
        assert!(saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_flush_auto_save() {
        let (mut store, saved) = saving_store(10_000);
        store.update_step_data(model_data());

        assert!(store.flush_auto_save());
        assert_eq!(saved.lock().unwrap().len(), 1);
        assert!(store.state().last_auto_save.is_some());
    }

    #[test]
    fn test_no_auto_save_without_callback() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(model_data());
        assert!(!store.flush_auto_save());
        assert!(store.last_auto_save().is_none());
    }

    #[test]
    fn test_into_state() {
        let mut store = WorkflowStore::new("bot");
        store.update_step_data(model_data());
        let state = store.into_state();

        assert_eq!(state.base_name, "bot");
        assert!(state.steps.model.data.is_some());
    }
}
