//! Step Validation
//!
//! Pure validation rules for each wizard step:
//! - model: a base model must be selected; very large models warn
//! - config: a configuration and its validation timestamp must be present
//! - dataset: at least one dataset; unusual splits warn
//! - deploy: package name and target required, plus target-specific fields
//!
//! Validation never fails with `Err`: problems are reported as
//! [`ValidationIssue`]s inside a [`ValidationResult`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::StepId;
use super::payload::{ConfigData, DatasetData, DeployData, DeploymentTarget, ModelData, StepData};

/// Models larger than this (in GB) produce a warning.
pub const LARGE_MODEL_GB: f64 = 10.0;

/// Recommended range for the train/validation split percentage.
pub const SPLIT_RANGE: (f64, f64) = (50.0, 95.0);

/// How serious a validation issue is.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A single field-level finding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating one step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Builds a result from collected issues; valid iff there are no errors.
    pub fn from_issues(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// A failed result carrying externally detected error messages.
    ///
    /// An empty message list still yields one generic error, so a failed
    /// result always says what failed.
    pub fn from_messages(field: &str, messages: &[String]) -> Self {
        let mut errors: Vec<ValidationIssue> = messages
            .iter()
            .map(|m| ValidationIssue::error(field, m.clone()))
            .collect();
        if errors.is_empty() {
            errors.push(ValidationIssue::error(field, "Step failed"));
        }
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
        }
    }

    /// Flattened error messages, for display.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/// Collects issues while a step is checked.
#[derive(Default)]
struct Findings {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Findings {
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue::error(field, message));
    }

    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::warning(field, message));
    }

    fn finish(self) -> ValidationResult {
        ValidationResult::from_issues(self.errors, self.warnings)
    }
}

/// Validates the payload of a step.
///
/// `payload` is the step's current data, `None` if the user has not
/// entered anything yet. A payload belonging to a different step is an
/// error on the `step` field.
pub fn validate(step: StepId, payload: Option<&StepData>) -> ValidationResult {
    let mut findings = Findings::default();

    if let Some(data) = payload {
        if data.step_id() != step {
            findings.error(
                "step",
                format!("Payload for '{}' given to step '{}'", data.step_id(), step),
            );
            return findings.finish();
        }
    }

    match step {
        StepId::Model => check_model(as_model(payload), &mut findings),
        StepId::Config => check_config(as_config(payload), &mut findings),
        StepId::Dataset => check_dataset(as_dataset(payload), &mut findings),
        StepId::Deploy => check_deploy(as_deploy(payload), &mut findings),
    }

    findings.finish()
}

fn as_model(payload: Option<&StepData>) -> Option<&ModelData> {
    match payload {
        Some(StepData::Model(data)) => Some(data),
        _ => None,
    }
}

fn as_config(payload: Option<&StepData>) -> Option<&ConfigData> {
    match payload {
        Some(StepData::Config(data)) => Some(data),
        _ => None,
    }
}

fn as_dataset(payload: Option<&StepData>) -> Option<&DatasetData> {
    match payload {
        Some(StepData::Dataset(data)) => Some(data),
        _ => None,
    }
}

fn as_deploy(payload: Option<&StepData>) -> Option<&DeployData> {
    match payload {
        Some(StepData::Deploy(data)) => Some(data),
        _ => None,
    }
}

fn check_model(data: Option<&ModelData>, findings: &mut Findings) {
    let Some(model) = data.and_then(|d| d.selected_model.as_ref()) else {
        findings.error("selectedModel", "Please select a base model");
        return;
    };

    if model.size_gb > LARGE_MODEL_GB {
        findings.warn(
            "selectedModel.size",
            format!(
                "Model '{}' is {:.1} GB; training may be slow and costly",
                model.name, model.size_gb
            ),
        );
    }
}

fn check_config(data: Option<&ConfigData>, findings: &mut Findings) {
    let configuration = data.and_then(|d| d.configuration.as_ref());
    let validated_at = data.and_then(|d| d.validated_at);

    if configuration.is_none() {
        findings.error("configuration", "Training configuration is required");
    }

    if validated_at.is_none() {
        findings.error("validatedAt", "Training configuration has not been validated");
    }
}

fn check_dataset(data: Option<&DatasetData>, findings: &mut Findings) {
    let Some(data) = data else {
        findings.error("selectedDatasets", "Select at least one dataset");
        return;
    };

    if data.selected_datasets.is_empty() {
        findings.error("selectedDatasets", "Select at least one dataset");
    }

    let (low, high) = SPLIT_RANGE;
    if !(low..=high).contains(&data.train_val_split) {
        findings.warn(
            "trainValSplit",
            format!(
                "Train/validation split of {}% is outside the recommended {}-{}% range",
                data.train_val_split, low, high
            ),
        );
    }
}

fn check_deploy(data: Option<&DeployData>, findings: &mut Findings) {
    let package_name = data.map(|d| d.package_name.trim()).unwrap_or_default();
    if package_name.is_empty() {
        findings.error("packageName", "Package name is required");
    }

    let Some(target) = data.and_then(|d| d.deployment_target.as_ref()) else {
        findings.error("deploymentTarget", "Select a deployment target");
        return;
    };

    match target {
        DeploymentTarget::RemoteSpace { space } => match space {
            Some(space) if !space.name.trim().is_empty() => {
                if space.budget_limit.is_none() {
                    findings.warn(
                        "spaceConfig.budgetLimit",
                        "No budget limit set; hosting costs are unbounded",
                    );
                }
            }
            _ => findings.error("spaceConfig.name", "Space name is required"),
        },
        DeploymentTarget::Local { server_url } => {
            let url = server_url.as_deref().map(str::trim).unwrap_or_default();
            if url.is_empty() {
                findings.error("localConfig.serverUrl", "Server URL is required");
            }
        }
        DeploymentTarget::Download => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::payload::{DatasetRef, ModelInfo, SpaceConfig, TrainingConfig};

    fn dataset(split: f64, count: usize) -> StepData {
        let datasets = (0..count)
            .map(|i| DatasetRef::new(format!("ds{}", i), format!("Dataset {}", i)))
            .collect();
        StepData::Dataset(DatasetData::new(datasets, split))
    }

    fn deploy(name: &str, target: Option<DeploymentTarget>) -> StepData {
        StepData::Deploy(DeployData {
            package_name: name.to_string(),
            deployment_target: target,
            cost_estimate: None,
        })
    }

    #[test]
    fn test_model_missing() {
        let result = validate(StepId::Model, None);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "selectedModel");

        let result = validate(StepId::Model, Some(&StepData::Model(ModelData::default())));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_model_large_is_warning_only() {
        let data = StepData::Model(ModelData::with_model(ModelInfo::new("llama-70b", "Llama 70B", 140.0)));
        let result = validate(StepId::Model, Some(&data));

        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "selectedModel.size");
        assert_eq!(result.warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_model_small_no_warning() {
        let data = StepData::Model(ModelData::with_model(ModelInfo::new("phi", "Phi", 10.0)));
        let result = validate(StepId::Model, Some(&data));

        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_config_requires_both_fields() {
        let result = validate(StepId::Config, None);
        assert_eq!(result.errors.len(), 2);

        let partial = StepData::Config(ConfigData {
            configuration: Some(TrainingConfig::default()),
            validated_at: None,
        });
        let result = validate(StepId::Config, Some(&partial));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "validatedAt");

        let full = StepData::Config(ConfigData::validated(TrainingConfig::default()));
        assert!(validate(StepId::Config, Some(&full)).is_valid);
    }

    #[test]
    fn test_dataset_empty_selection() {
        let result = validate(StepId::Dataset, Some(&dataset(80.0, 0)));

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "selectedDatasets");
    }

    #[test]
    fn test_dataset_split_bounds() {
        assert!(validate(StepId::Dataset, Some(&dataset(50.0, 1))).warnings.is_empty());
        assert!(validate(StepId::Dataset, Some(&dataset(95.0, 1))).warnings.is_empty());

        let low = validate(StepId::Dataset, Some(&dataset(40.0, 1)));
        assert!(low.is_valid);
        assert_eq!(low.warnings.len(), 1);
        assert_eq!(low.warnings[0].field, "trainValSplit");

        let high = validate(StepId::Dataset, Some(&dataset(99.0, 2)));
        assert!(high.is_valid);
        assert_eq!(high.warnings.len(), 1);
    }

    #[test]
    fn test_dataset_split_nan_warns() {
        let result = validate(StepId::Dataset, Some(&dataset(f64::NAN, 1)));

        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "trainValSplit");
    }

    #[test]
    fn test_deploy_requires_name_and_target() {
        let result = validate(StepId::Deploy, Some(&deploy("  ", None)));
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(fields, vec!["packageName", "deploymentTarget"]);
    }

    #[test]
    fn test_deploy_remote_space() {
        let missing = deploy("bot", Some(DeploymentTarget::RemoteSpace { space: None }));
        let result = validate(StepId::Deploy, Some(&missing));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "spaceConfig.name");

        let unbounded = deploy(
            "bot",
            Some(DeploymentTarget::RemoteSpace {
                space: Some(SpaceConfig {
                    name: "bot-space".to_string(),
                    hardware: "t4-small".to_string(),
                    budget_limit: None,
                }),
            }),
        );
        let result = validate(StepId::Deploy, Some(&unbounded));
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "spaceConfig.budgetLimit");
    }

    #[test]
    fn test_deploy_local_requires_url() {
        let missing = deploy("bot", Some(DeploymentTarget::Local { server_url: None }));
        let result = validate(StepId::Deploy, Some(&missing));
        assert_eq!(result.errors[0].field, "localConfig.serverUrl");

        let ok = deploy(
            "bot",
            Some(DeploymentTarget::Local {
                server_url: Some("http://localhost:11434".to_string()),
            }),
        );
        assert!(validate(StepId::Deploy, Some(&ok)).is_valid);
    }

    #[test]
    fn test_deploy_download_has_no_extra_requirements() {
        let data = deploy("bot", Some(DeploymentTarget::Download));
        let result = validate(StepId::Deploy, Some(&data));
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_mismatched_payload() {
        let result = validate(StepId::Deploy, Some(&dataset(80.0, 1)));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "step");
    }

    #[test]
    fn test_validate_is_pure() {
        let inputs = [
            (StepId::Model, None),
            (StepId::Dataset, Some(dataset(40.0, 0))),
            (StepId::Deploy, Some(deploy("", Some(DeploymentTarget::Download)))),
        ];

        for (step, payload) in &inputs {
            let first = validate(*step, payload.as_ref());
            let second = validate(*step, payload.as_ref());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_from_messages() {
        let result = ValidationResult::from_messages("dataset", &["upload failed".to_string()]);
        assert!(!result.is_valid);
        assert_eq!(result.error_messages(), vec!["dataset: upload failed"]);
    }

    #[test]
    fn test_from_messages_empty_keeps_an_error() {
        let result = ValidationResult::from_messages("deploy", &[]);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "deploy");
    }
}
