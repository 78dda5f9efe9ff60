use thiserror::Error;

/// The kind of entity a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Analysis,
    Template,
    Component,
    Step,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Analysis => "Analysis",
            EntityKind::Template => "Template",
            EntityKind::Component => "Deployed component",
            EntityKind::Step => "Step",
        };
        f.write_str(name)
    }
}

/// A failure reported by an injected collaborator (file resolver, URL assembler).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{resolver} could not resolve '{name}': {message}")]
pub struct ResolverError {
    pub resolver: String,
    pub name: String,
    pub message: String,
}

/// Errors that abort the compilation of a job submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Property '{property_id}' has unsupported type '{type_name}'")]
    UnsupportedPropertyType {
        property_id: String,
        type_name: String,
    },

    #[error(
        "Step '{target_step}' needs '{target_id}' from '{source_id}' of step '{source_step}', but no value has been produced for it"
    )]
    MissingMappedValue {
        target_step: String,
        target_id: String,
        source_step: String,
        source_id: String,
    },

    #[error("Configuration value for '{key}' is malformed: {message}")]
    MalformedConfiguration { key: String, message: String },

    #[error("Mapping from '{source_step}' to '{target_step}' is invalid: {message}")]
    InvalidMapping {
        source_step: String,
        target_step: String,
        message: String,
    },

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

impl CompileError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        CompileError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn malformed(key: impl Into<String>, message: impl ToString) -> Self {
        CompileError::MalformedConfiguration {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Errors raised while loading catalogs, submissions or descriptors from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}
