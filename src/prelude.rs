//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the jobforge
//! crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobforge::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let catalog = InMemoryCatalog::from_file("path/to/catalog.json")?;
//! let submission = JobSubmission::from_file("path/to/submission.json")?;
//!
//! let job = JobCompiler::builder(&catalog).build().compile_submission(&submission)?;
//! job.save("path/to/job.json")?;
//! # Ok(())
//! # }
//! ```

// Compilation
pub use crate::compiler::formatting::{PropertyFormatter, PropertyKind};
pub use crate::compiler::{JobCompiler, JobCompilerBuilder};

// Definitions and catalogs
pub use crate::analysis::{
    Analysis, DataObject, DeployedComponent, Mapping, Multiplicity, Property, PropertyGroup,
    Step, Template, Transformation,
};
pub use crate::catalog::{AnalysisCatalog, InMemoryCatalog};

// Submissions and the compiled job
pub use crate::job::{CompiledStep, IoRecord, JobDescriptor, StepConfig};
pub use crate::submission::{Configuration, JobSubmission};

// Collaborators
pub use crate::resolver::{
    EnvironmentFormatter, FileResolver, FileResolverFactory, FileResolverRegistry,
    PathUrlAssembler, PrefixUrlAssembler, UrlAssembler,
};

// Error types
pub use crate::error::{CompileError, LoadError, ResolverError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
