use crate::analysis::{Analysis, DeployedComponent, Template};
use crate::error::{CompileError, EntityKind, LoadError};
use ahash::AHashMap;
use serde::Deserialize;
use std::fs;

/// Read access to the stored definitions a compilation needs.
///
/// Each lookup fails with `CompileError::NotFound` when the id is unknown.
pub trait AnalysisCatalog: Send + Sync {
    fn analysis(&self, id: &str) -> Result<&Analysis, CompileError>;
    fn template(&self, id: &str) -> Result<&Template, CompileError>;
    fn deployed_component(&self, id: &str) -> Result<&DeployedComponent, CompileError>;
}

/// The on-disk format of an exported catalog.
#[derive(Deserialize, Debug, Default)]
pub struct CatalogBundle {
    #[serde(default)]
    pub analyses: Vec<Analysis>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default, alias = "deployedComponents")]
    pub components: Vec<DeployedComponent>,
}

/// A catalog held entirely in memory, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    analyses: AHashMap<String, Analysis>,
    templates: AHashMap<String, Template>,
    components: AHashMap<String, DeployedComponent>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog bundle from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let bundle: CatalogBundle = serde_json::from_str(json)?;
        Ok(Self::from(bundle))
    }

    /// Loads a catalog bundle from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analyses.insert(analysis.id.clone(), analysis);
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.insert(template.id.clone(), template);
        self
    }

    pub fn with_component(mut self, component: DeployedComponent) -> Self {
        self.components.insert(component.id.clone(), component);
        self
    }

    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }
}

impl From<CatalogBundle> for InMemoryCatalog {
    fn from(bundle: CatalogBundle) -> Self {
        let catalog = bundle
            .analyses
            .into_iter()
            .fold(Self::new(), |c, a| c.with_analysis(a));
        let catalog = bundle
            .templates
            .into_iter()
            .fold(catalog, |c, t| c.with_template(t));
        bundle
            .components
            .into_iter()
            .fold(catalog, |c, d| c.with_component(d))
    }
}

impl AnalysisCatalog for InMemoryCatalog {
    fn analysis(&self, id: &str) -> Result<&Analysis, CompileError> {
        self.analyses
            .get(id)
            .ok_or_else(|| CompileError::not_found(EntityKind::Analysis, id))
    }

    fn template(&self, id: &str) -> Result<&Template, CompileError> {
        self.templates
            .get(id)
            .ok_or_else(|| CompileError::not_found(EntityKind::Template, id))
    }

    fn deployed_component(&self, id: &str) -> Result<&DeployedComponent, CompileError> {
        self.components
            .get(id)
            .ok_or_else(|| CompileError::not_found(EntityKind::Component, id))
    }
}
