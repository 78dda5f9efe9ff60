//! # jobforge - Analysis Job Compiler
//!
//! **jobforge** turns a stored multi-step analysis definition and a user's submitted
//! configuration into a single, self-contained job descriptor for a batch executor.
//! Every step of the descriptor carries its staged input files, its ordered
//! command-line parameters, its declared outputs, its environment and the tool it runs.
//!
//! ## Core Workflow
//!
//! 1.  **Load the Catalog**: Implement `AnalysisCatalog` over your storage, or load an
//!     exported bundle into an `InMemoryCatalog`.
//! 2.  **Configure the Compiler**: Use `JobCompiler::builder` to inject the URL
//!     assembler, file resolvers and environment formatter, and to register extra
//!     property types.
//! 3.  **Compile**: Hand a `JobSubmission` to the compiler. Steps are compiled in
//!     declaration order, and values mapped between steps are resolved from steps
//!     that have already been compiled.
//! 4.  **Submit**: Serialize the `JobDescriptor` to JSON and pass it on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jobforge::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let catalog = InMemoryCatalog::from_file("catalog.json")?;
//!     let submission = JobSubmission::from_file("submission.json")?;
//!
//!     let compiler = JobCompiler::builder(&catalog)
//!         .with_url_assembler(PrefixUrlAssembler::new("irods://data.example.org"))
//!         .with_type_mapping("IntegerInput", "Text")
//!         .build();
//!
//!     let job = compiler.compile_submission(&submission)?;
//!     println!("{}", job.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod catalog;
pub mod compiler;
pub mod error;
pub mod job;
pub mod prelude;
pub mod resolver;
pub mod submission;
