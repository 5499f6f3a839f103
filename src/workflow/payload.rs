//! Step Payloads
//!
//! The user's selections for each wizard step. The state machine treats
//! these as opaque apart from the presence and shape checks done by the
//! validator.
//!
//! # Example YAML Format
//!
//! ```yaml
//! step: dataset
//! data:
//!   selectedDatasets:
//!     - id: ds-support-tickets
//!       name: Support tickets
//!       rows: 12000
//!   trainValSplit: 80
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::StepId;

/// Payload for one step, tagged by the step it belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "step", content = "data", rename_all = "snake_case")]
pub enum StepData {
    Model(ModelData),
    Config(ConfigData),
    Dataset(DatasetData),
    Deploy(DeployData),
}

impl StepData {
    /// The step this payload belongs to.
    pub fn step_id(&self) -> StepId {
        match self {
            Self::Model(_) => StepId::Model,
            Self::Config(_) => StepId::Config,
            Self::Dataset(_) => StepId::Dataset,
            Self::Deploy(_) => StepId::Deploy,
        }
    }
}

impl From<ModelData> for StepData {
    fn from(data: ModelData) -> Self {
        Self::Model(data)
    }
}

impl From<ConfigData> for StepData {
    fn from(data: ConfigData) -> Self {
        Self::Config(data)
    }
}

impl From<DatasetData> for StepData {
    fn from(data: DatasetData) -> Self {
        Self::Dataset(data)
    }
}

impl From<DeployData> for StepData {
    fn from(data: DeployData) -> Self {
        Self::Deploy(data)
    }
}

/// Base model selection.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    #[serde(default)]
    pub selected_model: Option<ModelInfo>,
}

impl ModelData {
    pub fn with_model(model: ModelInfo) -> Self {
        Self {
            selected_model: Some(model),
        }
    }
}

/// Description of a base model available for fine-tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub provider: String,
    /// Weights size in gigabytes
    pub size_gb: f64,
    /// Human-readable parameter count, e.g. "7B"
    #[serde(default)]
    pub parameters: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, size_gb: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: String::new(),
            size_gb,
            parameters: String::new(),
        }
    }
}

/// Training hyperparameters plus the time they were last checked.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigData {
    #[serde(default)]
    pub configuration: Option<TrainingConfig>,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
}

impl ConfigData {
    /// Wraps a configuration stamped as validated now.
    pub fn validated(configuration: TrainingConfig) -> Self {
        Self {
            configuration: Some(configuration),
            validated_at: Some(Utc::now()),
        }
    }
}

/// Fine-tuning method.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMethod {
    #[default]
    Lora,
    Qlora,
    Full,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    #[serde(default)]
    pub method: TrainingMethod,
    pub epochs: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    #[serde(default)]
    pub lora_rank: Option<u32>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            method: TrainingMethod::Lora,
            epochs: 3,
            learning_rate: 2e-4,
            batch_size: 8,
            lora_rank: Some(16),
        }
    }
}

/// Default train/validation split percentage.
fn default_split() -> f64 {
    80.0
}

/// Datasets chosen for training and how they are split.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetData {
    #[serde(default)]
    pub selected_datasets: Vec<DatasetRef>,
    /// Percentage of rows used for training; the rest goes to validation
    #[serde(default = "default_split")]
    pub train_val_split: f64,
}

impl Default for DatasetData {
    fn default() -> Self {
        Self {
            selected_datasets: Vec::new(),
            train_val_split: default_split(),
        }
    }
}

impl DatasetData {
    pub fn new(selected_datasets: Vec<DatasetRef>, train_val_split: f64) -> Self {
        Self {
            selected_datasets,
            train_val_split,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rows: u64,
}

impl DatasetRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rows: 0,
        }
    }
}

/// Packaging and deployment choices.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeployData {
    #[serde(default)]
    pub package_name: String,
    #[serde(default)]
    pub deployment_target: Option<DeploymentTarget>,
    #[serde(default)]
    pub cost_estimate: Option<CostEstimate>,
}

/// Where the trained package ends up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeploymentTarget {
    /// Hosted inference space
    RemoteSpace {
        #[serde(default)]
        space: Option<SpaceConfig>,
    },
    /// Self-hosted inference server
    Local {
        #[serde(default, rename = "serverUrl")]
        server_url: Option<String>,
    },
    /// Artifact download only
    Download,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceConfig {
    pub name: String,
    #[serde(default)]
    pub hardware: String,
    #[serde(default)]
    pub budget_limit: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub training_usd: f64,
    pub hosting_usd_per_month: f64,
}

impl CostEstimate {
    /// Cost of training plus `months` of hosting.
    pub fn total_for(&self, months: u32) -> f64 {
        self.training_usd + self.hosting_usd_per_month * f64::from(months)
    }
}
