use crate::analysis::{DeployedComponent, Multiplicity};
use crate::error::LoadError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// Name shared by the log-collection output that closes every step's output list.
pub const LOGS_OUTPUT: &str = "logs";

/// One entry of a step's `input`, `params` or `output` list.
///
/// All three lists share this shape. Fields that do not apply to a list are left out
/// of the serialized JSON rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain: Option<bool>,
}

impl IoRecord {
    /// A command-line parameter.
    pub fn param(
        name: impl Into<String>,
        value: impl Into<String>,
        order: i32,
        id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            property: None,
            record_type: None,
            value: Some(value.into()),
            id: Some(id.into()),
            order: Some(order),
            multiplicity: None,
            retain: None,
        }
    }

    /// A declared output file of a step.
    pub fn output(
        name: impl Into<String>,
        info_type: impl Into<String>,
        multiplicity: Multiplicity,
        retain: bool,
    ) -> Self {
        let name = name.into();
        Self {
            property: Some(name.clone()),
            name,
            record_type: Some(info_type.into()),
            value: None,
            id: None,
            order: None,
            multiplicity: Some(multiplicity.as_str().to_string()),
            retain: Some(retain),
        }
    }

    /// The log collection appended to every step.
    pub fn logs() -> Self {
        Self::output(LOGS_OUTPUT, "File", Multiplicity::Collection, true)
    }

    /// The `order` of a record, with records that carry none sorting first.
    pub fn sort_order(&self) -> i32 {
        self.order.unwrap_or(i32::MIN)
    }
}

/// The files, arguments and outputs of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub input: Vec<IoRecord>,
    pub params: Vec<IoRecord>,
    pub output: Vec<IoRecord>,
}

impl StepConfig {
    /// Parameters in command-line order. The compiler leaves `params` in template
    /// order, so callers that need positional order sort here. The sort is stable.
    pub fn sorted_params(&self) -> Vec<&IoRecord> {
        self.params
            .iter()
            .sorted_by_key(|p| p.sort_order())
            .collect()
    }

    /// Finds the value of an input or, failing that, a parameter with the given id.
    pub fn value_of(&self, id: &str) -> Option<&str> {
        self.input
            .iter()
            .chain(self.params.iter())
            .find(|r| r.id.as_deref() == Some(id))
            .and_then(|r| r.value.as_deref())
    }
}

/// The tool a step runs, in the form the executor expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub description: String,
}

impl From<&DeployedComponent> for ComponentSpec {
    fn from(component: &DeployedComponent) -> Self {
        Self {
            name: component.name.clone(),
            location: component.location.clone(),
            component_type: component.component_type.clone(),
            description: component.description.clone(),
        }
    }
}

/// A fully resolved step of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub config: StepConfig,
    pub environment: BTreeMap<String, String>,
    pub component: ComponentSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// The job-submission request handed to the batch executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub analysis_id: String,
    pub analysis_name: String,
    pub analysis_description: String,
    pub name: String,
    pub description: String,
    pub username: String,
    pub email: String,
    pub workspace_id: String,
    pub output_dir: String,
    pub create_output_subdir: bool,
    pub notify: bool,
    pub request_type: String,
    pub execution_target: String,
    pub steps: Vec<CompiledStep>,
}

impl JobDescriptor {
    pub fn step(&self, name: &str) -> Option<&CompiledStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Saves the descriptor as pretty-printed JSON.
    pub fn save(&self, path: &str) -> Result<(), LoadError> {
        fs::write(path, self.to_json_pretty()?).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })
    }

    /// Loads a previously saved descriptor.
    pub fn from_file(path: &str) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Names of every step, joined for log lines.
    pub fn step_names(&self) -> String {
        self.steps.iter().map(|s| s.name.as_str()).join(", ")
    }
}
