use crate::analysis::{Analysis, validate_mappings};
use crate::catalog::AnalysisCatalog;
use crate::error::CompileError;
use crate::job::{CompiledStep, JobDescriptor};
use crate::resolver::{
    EnvironmentFormatter, FileResolverFactory, NoFileResolvers, PathUrlAssembler,
    PropertyEnvironment, UrlAssembler,
};
use crate::submission::JobSubmission;
use tracing::{debug, info, warn};

pub mod data_object;
pub mod formatting;
pub mod mapping;
mod step;

use data_object::DataObjectResolver;
use formatting::{FormatterRegistry, IgnoredFormatter, PropertyFormatter, create_formatter_by_name};
use mapping::{MappingResolver, OutputRegistry};
use step::StepCompiler;

/// Execution target written into every job unless the builder sets another.
pub const DEFAULT_EXECUTION_TARGET: &str = "condor";

/// The request type the batch executor expects for new jobs.
pub const SUBMIT_REQUEST_TYPE: &str = "submit";

/// Compiles analyses and user submissions into job descriptors.
///
/// All state of a run lives inside `compile`, so one compiler can serve any number
/// of submissions, and compilers are `Send + Sync` for use across threads.
pub struct JobCompiler<'c> {
    catalog: &'c dyn AnalysisCatalog,
    formatters: FormatterRegistry,
    urls: Box<dyn UrlAssembler>,
    files: Box<dyn FileResolverFactory>,
    environment: Box<dyn EnvironmentFormatter>,
    execution_target: String,
}

pub struct JobCompilerBuilder<'c> {
    catalog: &'c dyn AnalysisCatalog,
    formatters: FormatterRegistry,
    urls: Box<dyn UrlAssembler>,
    files: Box<dyn FileResolverFactory>,
    environment: Box<dyn EnvironmentFormatter>,
    execution_target: String,
}

impl<'c> JobCompilerBuilder<'c> {
    pub fn new(catalog: &'c dyn AnalysisCatalog) -> Self {
        Self {
            catalog,
            formatters: FormatterRegistry::default(),
            urls: Box::new(PathUrlAssembler),
            files: Box::new(NoFileResolvers),
            environment: Box::new(PropertyEnvironment),
            execution_target: DEFAULT_EXECUTION_TARGET.to_string(),
        }
    }

    pub fn with_url_assembler(mut self, urls: impl UrlAssembler + 'static) -> Self {
        self.urls = Box::new(urls);
        self
    }

    pub fn with_file_resolvers(mut self, files: impl FileResolverFactory + 'static) -> Self {
        self.files = Box::new(files);
        self
    }

    pub fn with_environment_formatter(
        mut self,
        environment: impl EnvironmentFormatter + 'static,
    ) -> Self {
        self.environment = Box::new(environment);
        self
    }

    pub fn with_execution_target(mut self, target: &str) -> Self {
        self.execution_target = target.to_string();
        self
    }

    /// Formats properties of type `user_type_name` with the built-in formatter named
    /// `builtin_type_name` (`Flag`, `Input`, `Selection`, ...).
    pub fn with_type_mapping(mut self, user_type_name: &str, builtin_type_name: &str) -> Self {
        match create_formatter_by_name(builtin_type_name) {
            Some(formatter) => self.formatters.insert(user_type_name, formatter),
            None => warn!(
                user_type_name,
                builtin_type_name, "Ignoring type mapping to unknown built-in type"
            ),
        }
        self
    }

    pub fn with_custom_formatter(mut self, formatter: Box<dyn PropertyFormatter>) -> Self {
        self.formatters
            .insert(formatter.type_name().to_string(), formatter);
        self
    }

    /// Treats properties of this type like environment variables: no parameters.
    pub fn with_ignored_type(mut self, type_name: &str) -> Self {
        self.formatters.insert(type_name, Box::new(IgnoredFormatter));
        self
    }

    pub fn build(self) -> JobCompiler<'c> {
        JobCompiler {
            catalog: self.catalog,
            formatters: self.formatters,
            urls: self.urls,
            files: self.files,
            environment: self.environment,
            execution_target: self.execution_target,
        }
    }
}

impl<'c> JobCompiler<'c> {
    pub fn builder(catalog: &'c dyn AnalysisCatalog) -> JobCompilerBuilder<'c> {
        JobCompilerBuilder::new(catalog)
    }

    /// Looks up the submitted analysis in the catalog and compiles it.
    pub fn compile_submission(
        &self,
        submission: &JobSubmission,
    ) -> Result<JobDescriptor, CompileError> {
        let analysis = self.catalog.analysis(&submission.analysis_id)?;
        self.compile(analysis, submission)
    }

    /// Compiles every step of `analysis` in declaration order.
    pub fn compile(
        &self,
        analysis: &Analysis,
        submission: &JobSubmission,
    ) -> Result<JobDescriptor, CompileError> {
        info!(analysis = %analysis.id, job = %submission.name, "Compiling job submission");
        validate_mappings(analysis, self.catalog)?;

        let data_objects = DataObjectResolver::new(self.urls.as_ref(), self.files.as_ref());
        let mappings = MappingResolver::new(analysis, self.catalog);
        let mut outputs = OutputRegistry::default();
        let mut steps: Vec<CompiledStep> = Vec::with_capacity(analysis.steps.len());

        for step in &analysis.steps {
            let template = self.catalog.template(&step.transformation.template_id)?;
            let component = self.catalog.deployed_component(&template.component_id)?;
            let step_compiler = StepCompiler {
                step,
                template,
                component,
                config: &submission.config,
                formatters: &self.formatters,
                data_objects: &data_objects,
                mappings: &mappings,
                environment: self.environment.as_ref(),
                step_type: &self.execution_target,
            };
            let compiled = step_compiler.compile(&steps, &mut outputs)?;
            steps.push(compiled);
            debug!(
                step = %step.name,
                done = steps.len(),
                total = analysis.steps.len(),
                "Step appended"
            );
        }

        let descriptor = JobDescriptor {
            analysis_id: analysis.id.clone(),
            analysis_name: analysis.name.clone(),
            analysis_description: analysis.description.clone(),
            name: submission.name.clone(),
            description: submission.description.clone(),
            username: submission.username.clone(),
            email: submission.email.clone(),
            workspace_id: submission.workspace_id.clone(),
            output_dir: submission.output_dir.clone(),
            create_output_subdir: submission.create_output_subdir,
            notify: submission.notify,
            request_type: SUBMIT_REQUEST_TYPE.to_string(),
            execution_target: self.execution_target.clone(),
            steps,
        };
        info!(steps = %descriptor.step_names(), "Job compiled");
        Ok(descriptor)
    }
}
