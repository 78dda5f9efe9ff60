use super::definition::{Analysis, Mapping, Template};
use crate::catalog::AnalysisCatalog;
use crate::error::{CompileError, EntityKind};

/// Prefix marking a mapping source id that names an input of the source step.
pub const INPUT_REFERENCE_PREFIX: &str = "in#";

/// Splits an `in#<step>_<id>` mapping key into the bare id.
///
/// Returns `None` when the key is an ordinary output reference. The step name part is
/// optional so that keys written without it still resolve.
pub fn input_reference<'a>(key: &'a str, source_step: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(INPUT_REFERENCE_PREFIX)?;
    Some(
        rest.strip_prefix(source_step)
            .and_then(|r| r.strip_prefix('_'))
            .unwrap_or(rest),
    )
}

/// Checks every mapping of the analysis before anything is compiled.
///
/// Steps are compiled strictly in declaration order, so a mapping whose source does
/// not come before its target can never be satisfied and is reported as
/// `MissingMappedValue`. Ids that exist in neither template are `InvalidMapping`.
pub fn validate_mappings(
    analysis: &Analysis,
    catalog: &dyn AnalysisCatalog,
) -> Result<(), CompileError> {
    for mapping in &analysis.mappings {
        let source_index = analysis
            .step_index(&mapping.source_step)
            .ok_or_else(|| CompileError::not_found(EntityKind::Step, &mapping.source_step))?;
        let target_index = analysis
            .step_index(&mapping.target_step)
            .ok_or_else(|| CompileError::not_found(EntityKind::Step, &mapping.target_step))?;

        if source_index >= target_index {
            let (source_id, target_id) = mapping
                .relation
                .iter()
                .next()
                .map(|(s, t)| (s.clone(), t.clone()))
                .unwrap_or_default();
            return Err(CompileError::MissingMappedValue {
                target_step: mapping.target_step.clone(),
                target_id,
                source_step: mapping.source_step.clone(),
                source_id,
            });
        }

        validate_relation(analysis, mapping, catalog)?;
    }
    Ok(())
}

fn validate_relation(
    analysis: &Analysis,
    mapping: &Mapping,
    catalog: &dyn AnalysisCatalog,
) -> Result<(), CompileError> {
    let source_template = step_template(analysis, &mapping.source_step, catalog)?;
    let target_template = step_template(analysis, &mapping.target_step, catalog)?;

    let invalid = |message: String| CompileError::InvalidMapping {
        source_step: mapping.source_step.clone(),
        target_step: mapping.target_step.clone(),
        message,
    };

    for (source_key, target_id) in &mapping.relation {
        let source_id = input_reference(source_key, &mapping.source_step).unwrap_or(source_key);
        if !source_template.knows_id(source_id) {
            return Err(invalid(format!(
                "'{}' is not defined by template '{}'",
                source_id, source_template.id
            )));
        }
        if !target_template.knows_id(target_id) {
            return Err(invalid(format!(
                "'{}' is not defined by template '{}'",
                target_id, target_template.id
            )));
        }
    }
    Ok(())
}

/// Looks up the template bound to the named step.
pub(crate) fn step_template<'c>(
    analysis: &Analysis,
    step_name: &str,
    catalog: &'c dyn AnalysisCatalog,
) -> Result<&'c Template, CompileError> {
    let step = analysis
        .step(step_name)
        .ok_or_else(|| CompileError::not_found(EntityKind::Step, step_name))?;
    catalog.template(&step.transformation.template_id)
}
