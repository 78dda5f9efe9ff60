//! Strategy interfaces for the collaborators a compilation calls out to.
//!
//! The compiler never looks these up from ambient state: each one is handed to the
//! `JobCompilerBuilder`, and plain closures can stand in for any of them.

use crate::analysis::{Step, Template};
use crate::compiler::formatting::ENVIRONMENT_VARIABLE_TYPE;
use crate::error::{CompileError, ResolverError};
use crate::submission::Configuration;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Turns a path in the user's data store into a URL the executor can fetch.
pub trait UrlAssembler: Send + Sync {
    fn assemble_url(&self, path: &str) -> Result<String, ResolverError>;
}

impl<F> UrlAssembler for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn assemble_url(&self, path: &str) -> Result<String, ResolverError> {
        Ok(self(path))
    }
}

/// Passes paths through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathUrlAssembler;

impl UrlAssembler for PathUrlAssembler {
    fn assemble_url(&self, path: &str) -> Result<String, ResolverError> {
        Ok(path.to_string())
    }
}

/// Joins every path onto a fixed base URL.
#[derive(Debug, Clone)]
pub struct PrefixUrlAssembler {
    base: String,
}

impl PrefixUrlAssembler {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl UrlAssembler for PrefixUrlAssembler {
    fn assemble_url(&self, path: &str) -> Result<String, ResolverError> {
        Ok(format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Turns a symbolic identifier (a UUID or a literal name) into an access URL.
pub trait FileResolver: Send + Sync {
    fn resolve_url(&self, name: &str) -> Result<String, ResolverError>;
}

impl<F> FileResolver for F
where
    F: Fn(&str) -> Result<String, ResolverError> + Send + Sync,
{
    fn resolve_url(&self, name: &str) -> Result<String, ResolverError> {
        self(name)
    }
}

/// Chooses the file resolver, if any, responsible for an info type.
pub trait FileResolverFactory: Send + Sync {
    fn file_resolver(&self, info_type: &str) -> Option<&dyn FileResolver>;
}

/// A factory that never recognizes an info type.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFileResolvers;

impl FileResolverFactory for NoFileResolvers {
    fn file_resolver(&self, _info_type: &str) -> Option<&dyn FileResolver> {
        None
    }
}

/// File resolvers registered per info type. Info type names match case-insensitively.
#[derive(Default)]
pub struct FileResolverRegistry {
    resolvers: AHashMap<String, Box<dyn FileResolver>>,
}

impl FileResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, info_type: &str, resolver: impl FileResolver + 'static) -> Self {
        self.resolvers
            .insert(info_type.to_ascii_lowercase(), Box::new(resolver));
        self
    }
}

impl FileResolverFactory for FileResolverRegistry {
    fn file_resolver(&self, info_type: &str) -> Option<&dyn FileResolver> {
        self.resolvers
            .get(&info_type.to_ascii_lowercase())
            .map(|r| r.as_ref())
    }
}

/// Computes the environment variables a step runs with.
pub trait EnvironmentFormatter: Send + Sync {
    fn environment(
        &self,
        step: &Step,
        template: &Template,
        config: &Configuration,
    ) -> Result<BTreeMap<String, String>, CompileError>;
}

/// Binds every `EnvironmentVariable` property: the property name is the variable,
/// and the value comes from the step override, the submitted configuration or the
/// default, in that order. Blank values are left out.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyEnvironment;

impl EnvironmentFormatter for PropertyEnvironment {
    fn environment(
        &self,
        step: &Step,
        template: &Template,
        config: &Configuration,
    ) -> Result<BTreeMap<String, String>, CompileError> {
        let environment = template
            .properties()
            .filter(|p| p.property_type == ENVIRONMENT_VARIABLE_TYPE && !p.name.trim().is_empty())
            .filter_map(|p| {
                let value = step
                    .transformation
                    .override_for(&p.id)
                    .or_else(|| config.get(&step.name, &p.id))
                    .or(p.default_value.as_deref())?;
                (!value.trim().is_empty()).then(|| (p.name.clone(), value.to_string()))
            })
            .collect();
        Ok(environment)
    }
}
