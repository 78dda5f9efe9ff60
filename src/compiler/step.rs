use crate::analysis::{DataObject, DeployedComponent, Property, Step, Template};
use crate::compiler::data_object::DataObjectResolver;
use crate::compiler::formatting::{
    FormatContext, FormatterRegistry, PropertyKind, StepEffects, ValueSource, format_property,
};
use crate::compiler::mapping::{MappingResolver, OutputRegistry};
use crate::error::CompileError;
use crate::job::{CompiledStep, ComponentSpec, IoRecord, StepConfig};
use crate::resolver::EnvironmentFormatter;
use crate::submission::Configuration;
use tracing::{debug, trace};

/// Compiles one step of an analysis into its executor form.
pub(super) struct StepCompiler<'a> {
    pub(super) step: &'a Step,
    pub(super) template: &'a Template,
    pub(super) component: &'a DeployedComponent,
    pub(super) config: &'a Configuration,
    pub(super) formatters: &'a FormatterRegistry,
    pub(super) data_objects: &'a DataObjectResolver<'a>,
    pub(super) mappings: &'a MappingResolver<'a>,
    pub(super) environment: &'a dyn EnvironmentFormatter,
    pub(super) step_type: &'a str,
}

impl<'a> StepCompiler<'a> {
    /// Builds the compiled step. `compiled` holds every step before this one.
    pub(super) fn compile(
        &self,
        compiled: &[CompiledStep],
        outputs: &mut OutputRegistry,
    ) -> Result<CompiledStep, CompileError> {
        let mut effects = StepEffects::default();

        self.stage_unreferenced_inputs(compiled, outputs, &mut effects)?;
        self.register_unreferenced_outputs(outputs, &mut effects);
        let params = self.format_properties(compiled, outputs, &mut effects)?;
        let environment = self
            .environment
            .environment(self.step, self.template, self.config)?;
        let output = self.assemble_outputs(outputs);

        debug!(
            step = %self.step.name,
            inputs = effects.inputs.len(),
            params = params.len(),
            outputs = output.len(),
            "Compiled step"
        );

        Ok(CompiledStep {
            name: self.step.name.clone(),
            step_type: self.step_type.to_string(),
            config: StepConfig {
                input: effects.inputs,
                params,
                output,
            },
            environment,
            component: ComponentSpec::from(self.component),
            stdout: effects.stdout,
            stderr: effects.stderr,
        })
    }

    fn unreferenced<'t>(
        &self,
        data_objects: &'t [DataObject],
    ) -> impl Iterator<Item = &'t DataObject> {
        data_objects
            .iter()
            .filter(move |d| !self.template.is_referenced(&d.id))
    }

    /// Inputs no property refers to: submitted values first, then step overrides.
    /// Mapped ones are produced inside the job, so they are only checked for a value.
    fn stage_unreferenced_inputs(
        &self,
        compiled: &[CompiledStep],
        outputs: &OutputRegistry,
        effects: &mut StepEffects,
    ) -> Result<(), CompileError> {
        let step_name = &self.step.name;
        for input in self.unreferenced(&self.template.inputs) {
            let key = Configuration::key(step_name, &input.id);
            let raw = self
                .config
                .get(step_name, &input.id)
                .or_else(|| self.step.transformation.override_for(&input.id));
            match raw {
                Some(raw) => {
                    effects
                        .inputs
                        .extend(self.data_objects.resolve(input, raw, &key)?);
                }
                None => {
                    if let Some(value) = self.mappings.resolve_mapped_value(
                        step_name,
                        &input.id,
                        compiled,
                        outputs,
                    )? {
                        trace!(
                            step = %step_name,
                            input = %input.id,
                            %value,
                            "Input produced by an earlier step"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn register_unreferenced_outputs(
        &self,
        outputs: &mut OutputRegistry,
        effects: &mut StepEffects,
    ) {
        let step_name = &self.step.name;
        for output in self.unreferenced(&self.template.outputs) {
            let value = self
                .config
                .get(step_name, &output.id)
                .or_else(|| self.step.transformation.override_for(&output.id))
                .filter(|v| !v.trim().is_empty());
            if let Some(value) = value {
                outputs.register(step_name, &output.id, value);
            }
            effects.redirect(output, value.unwrap_or(output.name.as_str()));
        }
    }

    fn format_properties(
        &self,
        compiled: &[CompiledStep],
        outputs: &mut OutputRegistry,
        effects: &mut StepEffects,
    ) -> Result<Vec<IoRecord>, CompileError> {
        let mut params = Vec::new();
        for property in self.template.properties() {
            let formatter = self.formatters.formatter_for(&property.property_type);
            if formatter.kind() == PropertyKind::Info {
                continue;
            }
            let Some((raw, source)) = self.value_for(property, compiled, outputs)? else {
                // The tool still writes its declared file when no name was chosen.
                if let (PropertyKind::Output, Some(data_object)) =
                    (formatter.kind(), &property.data_object)
                {
                    effects.redirect(data_object, &data_object.name);
                }
                trace!(
                    step = %self.step.name,
                    property = %property.id,
                    "No value; property left out"
                );
                continue;
            };
            let mut ctx = FormatContext {
                step_name: &self.step.name,
                source,
                data_objects: self.data_objects,
                outputs: &mut *outputs,
                effects: &mut *effects,
            };
            params.extend(format_property(formatter, property, &raw, &mut ctx)?);
        }
        Ok(params)
    }

    /// Picks the value of a property: step override, submitted value, the default of a
    /// hidden property, then a value mapped from an earlier step.
    fn value_for(
        &self,
        property: &Property,
        compiled: &[CompiledStep],
        outputs: &OutputRegistry,
    ) -> Result<Option<(String, ValueSource)>, CompileError> {
        let ids: Vec<&str> = std::iter::once(property.id.as_str())
            .chain(property.data_object.as_ref().map(|d| d.id.as_str()))
            .collect();

        if let Some(value) = ids
            .iter()
            .find_map(|id| self.step.transformation.override_for(id))
        {
            return Ok(Some((value.to_string(), ValueSource::Override)));
        }
        if let Some(value) = ids.iter().find_map(|id| self.config.get(&self.step.name, id)) {
            return Ok(Some((value.to_string(), ValueSource::Configuration)));
        }
        if property.hidden {
            if let Some(default) = &property.default_value {
                return Ok(Some((default.clone(), ValueSource::Default)));
            }
        }
        for id in ids.iter().rev() {
            if let Some(value) =
                self.mappings
                    .resolve_mapped_value(&self.step.name, id, compiled, outputs)?
            {
                return Ok(Some((value, ValueSource::Mapping)));
            }
        }
        Ok(None)
    }

    /// Every declared output, named after the file it was given, then the logs.
    fn assemble_outputs(&self, outputs: &OutputRegistry) -> Vec<IoRecord> {
        self.template
            .outputs
            .iter()
            .map(|output| {
                let name = outputs
                    .get(&self.step.name, &output.id)
                    .unwrap_or(output.name.as_str());
                let info_type = if output.info_type.is_empty() {
                    "File"
                } else {
                    output.info_type.as_str()
                };
                IoRecord::output(name, info_type, output.multiplicity, output.retain)
            })
            .chain(std::iter::once(IoRecord::logs()))
            .collect()
    }
}
