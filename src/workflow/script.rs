//! Session Scripts
//!
//! Loads scripted wizard sessions from YAML. A script names the package and
//! lists the actions a user would take, in order.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: support-bot
//! actions:
//!   - update:
//!       step: model
//!       data:
//!         selectedModel: { id: phi-3, name: Phi-3 Mini, sizeGb: 7.6 }
//!   - complete: model
//!   - navigate: config
//!   - set_error:
//!       step: config
//!       errors: ["GPU quota exceeded"]
//!   - wait: 250
//!   - publish
//! ```

use std::fs;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

use super::model::StepId;
use super::payload::StepData;

/// One user action in a scripted session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Replace a step's payload
    Update(StepData),
    /// Validate and complete a step
    Complete(StepId),
    /// Re-validate a step without changing its status
    Validate(StepId),
    /// Move to a step
    Navigate(StepId),
    /// Fail a step with external error messages
    SetError { step: StepId, errors: Vec<String> },
    MarkDraft,
    Publish,
    Reset,
    /// Pause for the given number of milliseconds
    Wait(u64),
}

impl Action {
    /// Short name used in reports.
    pub fn label(&self) -> String {
        match self {
            Self::Update(data) => format!("update {}", data.step_id()),
            Self::Complete(step) => format!("complete {}", step),
            Self::Validate(step) => format!("validate {}", step),
            Self::Navigate(step) => format!("navigate {}", step),
            Self::SetError { step, .. } => format!("set_error {}", step),
            Self::MarkDraft => "mark_draft".to_string(),
            Self::Publish => "publish".to_string(),
            Self::Reset => "reset".to_string(),
            Self::Wait(ms) => format!("wait {}ms", ms),
        }
    }
}

/// A named sequence of wizard actions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionScript {
    /// Package base name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: Vec<Action>,
}

/// Parses and checks a session script from YAML text.
pub fn parse_script(yaml: &str) -> Result<SessionScript, ScriptError> {
    let mut script: SessionScript = serde_yaml::from_str(yaml)?;
    script.name = script.name.trim().to_string();

    if script.name.is_empty() {
        return Err(ScriptError::EmptyName);
    }

    if script.actions.is_empty() {
        return Err(ScriptError::NoActions(script.name));
    }

    debug!(
        "Parsed script '{}' with {} actions",
        script.name,
        script.actions.len()
    );
    Ok(script)
}

/// Loads a session script from a YAML file.
pub fn load_script(path: &str) -> Result<SessionScript, ScriptError> {
    info!("Loading session script from: {}", path);

    let yaml = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_string(),
        source,
    })?;

    parse_script(&yaml)
}
