use crate::analysis::{Analysis, Mapping, Template, input_reference, step_template};
use crate::catalog::AnalysisCatalog;
use crate::error::CompileError;
use crate::job::CompiledStep;
use ahash::AHashMap;
use tracing::trace;

/// Output file names assigned so far in one compilation, per step and id.
///
/// Later assignments to the same id replace earlier ones.
#[derive(Debug, Default, Clone)]
pub struct OutputRegistry {
    values: AHashMap<String, AHashMap<String, String>>,
}

impl OutputRegistry {
    pub fn register(&mut self, step_name: &str, id: &str, value: &str) {
        self.values
            .entry(step_name.to_string())
            .or_default()
            .insert(id.to_string(), value.to_string());
    }

    pub fn get(&self, step_name: &str, id: &str) -> Option<&str> {
        self.values
            .get(step_name)
            .and_then(|ids| ids.get(id))
            .map(String::as_str)
    }
}

/// Resolves a step's mapped inputs from steps that have already been compiled.
pub struct MappingResolver<'a> {
    analysis: &'a Analysis,
    catalog: &'a dyn AnalysisCatalog,
}

impl<'a> MappingResolver<'a> {
    pub fn new(analysis: &'a Analysis, catalog: &'a dyn AnalysisCatalog) -> Self {
        Self { analysis, catalog }
    }

    /// The mapping and source id feeding `current_id` of the target step, if any.
    fn find_source(&self, target_step: &str, current_id: &str) -> Option<(&'a Mapping, &'a str)> {
        self.analysis.mappings_into(target_step).find_map(|mapping| {
            mapping
                .relation
                .iter()
                .find(|(_, target_id)| target_id.as_str() == current_id)
                .map(|(source_id, _)| (mapping, source_id.as_str()))
        })
    }

    /// Returns the value an earlier step produced for `current_id` of `target_step`.
    ///
    /// `Ok(None)` means no mapping feeds this id. Only steps in `compiled` are
    /// consulted; a source that has not been compiled yet is `MissingMappedValue`.
    pub fn resolve_mapped_value(
        &self,
        target_step: &str,
        current_id: &str,
        compiled: &[CompiledStep],
        outputs: &OutputRegistry,
    ) -> Result<Option<String>, CompileError> {
        let Some((mapping, source_key)) = self.find_source(target_step, current_id) else {
            return Ok(None);
        };
        let missing = || CompileError::MissingMappedValue {
            target_step: target_step.to_string(),
            target_id: current_id.to_string(),
            source_step: mapping.source_step.clone(),
            source_id: source_key.to_string(),
        };

        let source = compiled
            .iter()
            .find(|s| s.name == mapping.source_step)
            .ok_or_else(missing)?;

        if let Some(input_id) = input_reference(source_key, &mapping.source_step) {
            let value = source.config.value_of(input_id).ok_or_else(missing)?;
            trace!(
                target_step,
                current_id,
                source = %mapping.source_step,
                input_id,
                "Mapped from source input"
            );
            return Ok(Some(value.to_string()));
        }

        if let Some(value) = outputs.get(&mapping.source_step, source_key) {
            trace!(
                target_step,
                current_id,
                source = %mapping.source_step,
                "Mapped from registered output"
            );
            return Ok(Some(value.to_string()));
        }

        let source_step = self
            .analysis
            .step(&mapping.source_step)
            .ok_or_else(missing)?;
        if let Some(value) = source_step.transformation.override_for(source_key) {
            return Ok(Some(value.to_string()));
        }

        let template = step_template(self.analysis, &mapping.source_step, self.catalog)?;
        declared_output_name(template, source_key)
            .map(Some)
            .ok_or_else(missing)
    }
}

/// The file name a template declares for an output, looked up by data object id or
/// by the id of the property bound to it.
fn declared_output_name(template: &Template, id: &str) -> Option<String> {
    template
        .output(id)
        .or_else(|| template.property(id).and_then(|p| p.data_object.as_ref()))
        .map(|d| d.name.clone())
        .filter(|name| !name.trim().is_empty())
}
