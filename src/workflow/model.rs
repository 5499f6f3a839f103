//! Wizard Data Model
//!
//! Core data structures for the four-step training-package wizard: the
//! step identifiers, per-step state and the [`WorkflowState`] aggregate.
//!
//! # Example JSON Snapshot
//!
//! ```json
//! {
//!   "packageId": "support-bot-20261018120000000",
//!   "baseName": "support-bot",
//!   "version": 1,
//!   "currentStep": "config",
//!   "steps": {
//!     "model": { "status": "completed", "data": { "step": "model", "data": { ... } } },
//!     "config": { "status": "in_progress" },
//!     "dataset": { "status": "not_started" },
//!     "deploy": { "status": "not_started" }
//!   },
//!   "status": "draft"
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::StepData;
use super::validator::ValidationResult;

/// The four wizard steps, in their fixed order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Model,
    Config,
    Dataset,
    Deploy,
}

impl StepId {
    /// All steps in wizard order.
    pub const ALL: [StepId; 4] = [Self::Model, Self::Config, Self::Dataset, Self::Deploy];

    /// Zero-based position in the wizard.
    pub fn index(self) -> usize {
        match self {
            Self::Model => 0,
            Self::Config => 1,
            Self::Dataset => 2,
            Self::Deploy => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Config => "config",
            Self::Dataset => "dataset",
            Self::Deploy => "deploy",
        }
    }

    /// Title shown to users for this step.
    pub fn title(self) -> &'static str {
        match self {
            Self::Model => "Model selection",
            Self::Config => "Training configuration",
            Self::Dataset => "Dataset selection",
            Self::Deploy => "Deployment",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a single step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// State of one wizard step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub status: StepStatus,

    /// The user's selections for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StepData>,

    /// Result of the most recent validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,

    pub last_modified: DateTime<Utc>,
}

impl StepState {
    pub fn new(status: StepStatus) -> Self {
        Self {
            status,
            data: None,
            validation: None,
            last_modified: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

impl Default for StepState {
    fn default() -> Self {
        Self::new(StepStatus::NotStarted)
    }
}

/// The fixed set of four step states, addressed by [`StepId`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepStates {
    pub model: StepState,
    pub config: StepState,
    pub dataset: StepState,
    pub deploy: StepState,
}

impl StepStates {
    /// Initial step states: the first step in progress, the rest untouched.
    pub fn initial() -> Self {
        Self {
            model: StepState::new(StepStatus::InProgress),
            config: StepState::default(),
            dataset: StepState::default(),
            deploy: StepState::default(),
        }
    }

    pub fn get(&self, id: StepId) -> &StepState {
        match id {
            StepId::Model => &self.model,
            StepId::Config => &self.config,
            StepId::Dataset => &self.dataset,
            StepId::Deploy => &self.deploy,
        }
    }

    pub fn get_mut(&mut self, id: StepId) -> &mut StepState {
        match id {
            StepId::Model => &mut self.model,
            StepId::Config => &mut self.config,
            StepId::Dataset => &mut self.dataset,
            StepId::Deploy => &mut self.deploy,
        }
    }

    /// Iterates over the steps in wizard order.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &StepState)> {
        StepId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn completed_count(&self) -> usize {
        self.iter().filter(|(_, step)| step.is_completed()).count()
    }
}

impl std::ops::Index<StepId> for StepStates {
    type Output = StepState;

    fn index(&self, id: StepId) -> &StepState {
        self.get(id)
    }
}

/// Lifecycle of the package version being assembled.
///
/// Replaces a pair of independent `isDraft`/`isPublished` flags so that the
/// "neither" case is named instead of accidental.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Never marked as draft or published
    Unsaved,
    #[default]
    Draft,
    Published,
}

impl VersionStatus {
    /// Maps a legacy `(is_draft, is_published)` flag pair.
    ///
    /// Both flags set is treated as a draft, since edits were still possible.
    pub fn from_flags(is_draft: bool, is_published: bool) -> Self {
        match (is_draft, is_published) {
            (true, _) => Self::Draft,
            (false, true) => Self::Published,
            (false, false) => Self::Unsaved,
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsaved => "unsaved",
            Self::Draft => "draft",
            Self::Published => "published",
        };
        f.write_str(label)
    }
}

/// Complete state of one wizard session.
///
/// Snapshots written before `status` existed carry `isDraft`/`isPublished`
/// instead; those are mapped through [`VersionStatus::from_flags`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredState")]
pub struct WorkflowState {
    /// Identifier of the package being assembled
    pub package_id: String,

    /// Name the package versions share
    pub base_name: String,

    /// Version number, starting at 1
    pub version: u32,

    pub current_step: StepId,

    pub steps: StepStates,

    pub status: VersionStatus,

    /// When the last auto-save went out, if any
    #[serde(default)]
    pub last_auto_save: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Creates the initial state for a new wizard session.
    pub fn new(base_name: impl Into<String>) -> Self {
        let base_name = base_name.into().trim().to_string();
        let now = Utc::now();

        Self {
            package_id: package_id_for(&base_name, now),
            base_name,
            version: 1,
            current_step: StepId::Model,
            steps: StepStates::initial(),
            status: VersionStatus::Draft,
            last_auto_save: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::Draft
    }

    pub fn is_published(&self) -> bool {
        self.status == VersionStatus::Published
    }

    pub fn step(&self, id: StepId) -> &StepState {
        self.steps.get(id)
    }

    /// Versioned name, e.g. `support-bot-v2`.
    pub fn version_label(&self) -> String {
        format!("{}-v{}", self.base_name, self.version)
    }

    /// True once every step is completed.
    pub fn is_complete(&self) -> bool {
        self.steps.completed_count() == StepId::ALL.len()
    }

    /// Fraction of completed steps, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        self.steps.completed_count() as f64 / StepId::ALL.len() as f64
    }
}

/// On-disk form of [`WorkflowState`], accepting either `status` or the
/// legacy flag pair.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    package_id: String,
    base_name: String,
    version: u32,
    current_step: StepId,
    steps: StepStates,
    #[serde(default)]
    status: Option<VersionStatus>,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    is_published: bool,
    #[serde(default)]
    last_auto_save: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoredState> for WorkflowState {
    fn from(stored: StoredState) -> Self {
        let status = stored
            .status
            .unwrap_or_else(|| VersionStatus::from_flags(stored.is_draft, stored.is_published));

        Self {
            package_id: stored.package_id,
            base_name: stored.base_name,
            version: stored.version,
            current_step: stored.current_step,
            steps: stored.steps,
            status,
            last_auto_save: stored.last_auto_save,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

/// Builds a package identifier from a base name and creation time.
fn package_id_for(base_name: &str, created_at: DateTime<Utc>) -> String {
    let slug: String = base_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "package" } else { slug };

    format!("{}-{}", slug, created_at.format("%Y%m%d%H%M%S%3f"))
}
