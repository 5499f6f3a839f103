//! Workflow Snapshot Files
//!
//! Stores workflow snapshots as pretty-printed JSON, enabling a wizard
//! session to resume from its last auto-saved draft.
//!
//! Layout under the snapshot directory:
//! - `{base_name}.draft.json`: the current draft, overwritten on each save
//! - `{base_name}.v{version}.json`: one file per published version

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::SnapshotError;
use crate::workflow::WorkflowState;

/// Default directory for snapshot files.
pub const DEFAULT_SNAPSHOT_DIR: &str = ".trainpack";

/// Reads and writes workflow snapshots in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the draft file for a base name.
    pub fn draft_path(&self, base_name: &str) -> PathBuf {
        self.dir.join(format!("{}.draft.json", file_stem(base_name)))
    }

    /// Path of a published version file.
    pub fn published_path(&self, base_name: &str, version: u32) -> PathBuf {
        self.dir
            .join(format!("{}.v{}.json", file_stem(base_name), version))
    }

    /// Writes the draft snapshot, replacing any previous one.
    pub fn save_draft(&self, state: &WorkflowState) -> Result<PathBuf, SnapshotError> {
        let path = self.draft_path(&state.base_name);
        self.write(&path, state)?;
        debug!("Saved draft snapshot to {}", path.display());
        Ok(path)
    }

    /// Loads the draft snapshot for a base name.
    pub fn load_draft(&self, base_name: &str) -> Result<WorkflowState, SnapshotError> {
        let path = self.draft_path(base_name);
        let state = self.read(&path)?;

        info!(
            "Loaded draft '{}' v{} (current step: {})",
            state.base_name, state.version, state.current_step
        );
        Ok(state)
    }

    /// Deletes the draft snapshot. Missing files are not an error.
    pub fn delete_draft(&self, base_name: &str) -> Result<(), SnapshotError> {
        let path = self.draft_path(base_name);
        if path.exists() {
            fs::remove_file(&path).map_err(|source| SnapshotError::Io {
                path: path.clone(),
                source,
            })?;
            info!("Deleted draft snapshot: {}", path.display());
        }
        Ok(())
    }

    /// Writes a published version. Published files are never overwritten:
    /// a second package under the same version is an error.
    pub fn save_published(&self, state: &WorkflowState) -> Result<PathBuf, SnapshotError> {
        let path = self.published_path(&state.base_name, state.version);
        if path.exists() {
            return Err(SnapshotError::AlreadyPublished(path));
        }

        self.write(&path, state)?;
        info!("Saved published version {} to {}", state.version, path.display());
        Ok(path)
    }

    /// Loads a published version.
    pub fn load_published(&self, base_name: &str, version: u32) -> Result<WorkflowState, SnapshotError> {
        self.read(&self.published_path(base_name, version))
    }

    /// Lists published version numbers for a base name, ascending.
    pub fn list_published(&self, base_name: &str) -> Result<Vec<u32>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}.v", file_stem(base_name));
        let entries = fs::read_dir(&self.dir).map_err(|source| SnapshotError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut versions: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(&prefix)?
                    .strip_suffix(".json")?
                    .parse()
                    .ok()
            })
            .collect();

        versions.sort_unstable();
        Ok(versions)
    }

    /// Highest published version for a base name, 0 if none.
    pub fn latest_published(&self, base_name: &str) -> Result<u32, SnapshotError> {
        Ok(self.list_published(base_name)?.last().copied().unwrap_or(0))
    }

    fn write(&self, path: &Path, state: &WorkflowState) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(state)?;
        fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read(&self, path: &Path) -> Result<WorkflowState, SnapshotError> {
        if !path.exists() {
            return Err(SnapshotError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_DIR)
    }
}

/// File-safe form of a base name.
fn file_stem(base_name: &str) -> String {
    let stem: String = base_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        "workflow".to_string()
    } else {
        stem
    }
}
