//! Session Replay
//!
//! Applies the actions of a [`SessionScript`] to a [`WorkflowStore`] and
//! reports what happened to each one.

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::workflow::{Action, SessionScript, WorkflowStore};

/// What happened when an action was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The action changed the state as requested
    Applied,
    /// A step passed validation
    Passed { warnings: Vec<String> },
    /// A step failed validation or was marked as failed
    Failed { errors: Vec<String> },
    /// Navigation was refused
    Rejected(String),
    /// A version was published
    Published { version: u32 },
}

impl Outcome {
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Rejected(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "ok"),
            Self::Passed { warnings } if warnings.is_empty() => write!(f, "valid"),
            Self::Passed { warnings } => write!(f, "valid with warnings: {}", warnings.join("; ")),
            Self::Failed { errors } => write!(f, "failed: {}", errors.join("; ")),
            Self::Rejected(reason) => write!(f, "rejected: {}", reason),
            Self::Published { version } => write!(f, "published v{}", version),
        }
    }
}

/// Result of one replayed action.
#[derive(Debug, Clone)]
pub struct ActionReport {
    pub index: usize,
    pub action: String,
    pub outcome: Outcome,
}

/// Result of a whole replayed session.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub name: String,
    pub actions: Vec<ActionReport>,
}

impl SessionReport {
    /// Number of actions that failed or were rejected.
    pub fn problem_count(&self) -> usize {
        self.actions.iter().filter(|a| a.outcome.is_problem()).count()
    }

    /// Versions published during the session.
    pub fn published_versions(&self) -> Vec<u32> {
        self.actions
            .iter()
            .filter_map(|a| match a.outcome {
                Outcome::Published { version } => Some(version),
                _ => None,
            })
            .collect()
    }
}

/// Applies a single action to the store.
pub fn apply_action(store: &mut WorkflowStore, action: &Action) -> Outcome {
    match action {
        Action::Update(data) => {
            store.update_step_data(data.clone());
            Outcome::Applied
        }
        Action::Complete(step) => {
            let result = store.complete_step(*step);
            if result.is_valid {
                Outcome::Passed {
                    warnings: result.warnings.iter().map(|w| w.to_string()).collect(),
                }
            } else {
                Outcome::Failed {
                    errors: result.error_messages(),
                }
            }
        }
        Action::Validate(step) => {
            let result = store.validate_step(*step);
            if result.is_valid {
                Outcome::Passed {
                    warnings: result.warnings.iter().map(|w| w.to_string()).collect(),
                }
            } else {
                Outcome::Failed {
                    errors: result.error_messages(),
                }
            }
        }
        Action::Navigate(step) => match store.navigate_to_step(*step) {
            Ok(()) => Outcome::Applied,
            Err(e) => Outcome::Rejected(e.to_string()),
        },
        Action::SetError { step, errors } => {
            store.set_step_error(*step, errors.clone());
            Outcome::Failed {
                errors: errors.clone(),
            }
        }
        Action::MarkDraft => {
            store.mark_as_draft();
            Outcome::Applied
        }
        Action::Publish => {
            let published = store.publish_version();
            Outcome::Published {
                version: published.version,
            }
        }
        Action::Reset => {
            store.reset_workflow();
            Outcome::Applied
        }
        Action::Wait(ms) => {
            thread::sleep(Duration::from_millis(*ms));
            Outcome::Applied
        }
    }
}

/// Replays every action of a script, in order.
///
/// Failed or rejected actions do not stop the replay, matching how a user
/// would simply carry on in the wizard.
pub fn run_session(store: &mut WorkflowStore, script: &SessionScript) -> SessionReport {
    let actions = script
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| ActionReport {
            index,
            action: action.label(),
            outcome: apply_action(store, action),
        })
        .collect();

    SessionReport {
        name: script.name.clone(),
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{
        parse_script, DatasetData, DatasetRef, ModelData, ModelInfo, StepId, StepStatus,
    };

    const SCRIPT: &str = r#"
name: support-bot
actions:
  - navigate: config
  - update:
      step: model
      data:
        selectedModel: { id: phi-3, name: Phi-3 Mini, sizeGb: 7.6 }
  - complete: model
  - navigate: config
  - complete: config
  - publish
"#;

    #[test]
    fn test_run_session() {
        let script = parse_script(SCRIPT).unwrap();
        let mut store = WorkflowStore::new(script.name.clone());

        let report = run_session(&mut store, &script);

        assert_eq!(report.name, "support-bot");
        assert_eq!(report.actions.len(), 6);
        assert!(matches!(report.actions[0].outcome, Outcome::Rejected(_)));
        assert_eq!(report.actions[1].outcome, Outcome::Applied);
        assert_eq!(report.actions[2].outcome, Outcome::Passed { warnings: vec![] });
        assert_eq!(report.actions[3].outcome, Outcome::Applied);
        assert!(matches!(report.actions[4].outcome, Outcome::Failed { .. }));
        assert_eq!(report.actions[5].outcome, Outcome::Published { version: 1 });

        assert_eq!(report.problem_count(), 2);
        assert_eq!(report.published_versions(), vec![1]);
        assert_eq!(store.current_step(), StepId::Config);
        assert_eq!(store.state().steps.config.status, StepStatus::Error);
    }

    #[test]
    fn test_apply_complete_with_warning() {
        let mut store = WorkflowStore::new("bot");
        apply_action(
            &mut store,
            &Action::Update(DatasetData::new(vec![DatasetRef::new("a", "A")], 30.0).into()),
        );

        match apply_action(&mut store, &Action::Complete(StepId::Dataset)) {
            Outcome::Passed { warnings } => {
                assert_eq!(warnings.len(), 1);
                assert!(warnings[0].starts_with("trainValSplit"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_apply_set_error() {
        let mut store = WorkflowStore::new("bot");
        let outcome = apply_action(
            &mut store,
            &Action::SetError {
                step: StepId::Model,
                errors: vec!["download failed".to_string()],
            },
        );

        assert!(outcome.is_problem());
        assert_eq!(store.state().steps.model.status, StepStatus::Error);
    }

    #[test]
    fn test_apply_reset_and_draft() {
        let mut store = WorkflowStore::new("bot");
        apply_action(
            &mut store,
            &Action::Update(ModelData::with_model(ModelInfo::new("m", "M", 1.0)).into()),
        );
        apply_action(&mut store, &Action::Publish);
        apply_action(&mut store, &Action::MarkDraft);
        assert_eq!(store.state().version, 2);

        apply_action(&mut store, &Action::Reset);
        assert!(store.state().steps.model.data.is_none());
        assert!(store.state().is_draft());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Applied.to_string(), "ok");
        assert_eq!(Outcome::Published { version: 3 }.to_string(), "published v3");
        assert_eq!(
            Outcome::Failed { errors: vec!["a".to_string(), "b".to_string()] }.to_string(),
            "failed: a; b"
        );
    }
}
