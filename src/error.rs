//! Error Types
//!
//! Error enums shared across the crate. Validation problems are not errors:
//! they are carried as [`ValidationResult`](crate::workflow::ValidationResult)
//! values and never returned through `Err`.

use std::path::PathBuf;

use thiserror::Error;

use crate::workflow::StepId;

/// A rejected navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Moving forward requires the current step to be completed first.
    #[error("cannot move from '{from}' to '{to}': step '{from}' is not completed")]
    StepNotCompleted { from: StepId, to: StepId },
}

/// Failures reading or writing workflow snapshots on disk.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no snapshot found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("snapshot I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("version already published at {}", .0.display())]
    AlreadyPublished(PathBuf),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures loading a session script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read session script '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session script: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("session script has an empty name")]
    EmptyName,

    #[error("session script '{0}' has no actions")]
    NoActions(String),
}
