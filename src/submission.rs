use crate::error::LoadError;
use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;

/// The values a user submitted for one job, keyed by `"<stepName>_<id>"`.
///
/// Multi-valued and structured values are carried as JSON text. When a submission
/// file holds them as native JSON arrays, objects, numbers or booleans they are
/// converted to that text form on load.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    values: AHashMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the configuration key for a property or data object of a step.
    pub fn key(step_name: &str, id: &str) -> String {
        format!("{}_{}", step_name, id)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert of a value for `id` in `step_name`.
    pub fn with(mut self, step_name: &str, id: &str, value: impl Into<String>) -> Self {
        self.insert(Self::key(step_name, id), value);
        self
    }

    pub fn get(&self, step_name: &str, id: &str) -> Option<&str> {
        self.values
            .get(&Self::key(step_name, id))
            .map(String::as_str)
    }

    pub fn contains(&self, step_name: &str, id: &str) -> bool {
        self.values.contains_key(&Self::key(step_name, id))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { values }
    }
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: AHashMap<String, serde_json::Value> = AHashMap::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(key, value)| (key, value_to_text(value)))
            .collect())
    }
}

fn value_to_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A user's request to run an analysis, as it arrives from the submission form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    #[serde(alias = "analysisId")]
    pub analysis_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "workspaceId")]
    pub workspace_id: String,
    #[serde(default, alias = "outputDir")]
    pub output_dir: String,
    #[serde(default = "default_true", alias = "createOutputSubdir")]
    pub create_output_subdir: bool,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub config: Configuration,
}

fn default_true() -> bool {
    true
}

impl JobSubmission {
    pub fn new(analysis_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            name: name.into(),
            description: String::new(),
            username: String::new(),
            email: String::new(),
            workspace_id: String::new(),
            output_dir: String::new(),
            create_output_subdir: true,
            notify: false,
            config: Configuration::new(),
        }
    }

    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Load a submission from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
