use crate::analysis::{DataObject, Multiplicity};
use crate::error::CompileError;
use crate::job::IoRecord;
use crate::resolver::{FileResolverFactory, UrlAssembler};
use serde_json::Value;
use tracing::{debug, warn};

/// Info type whose inputs are never staged.
pub const RECONCILE_TAXA_TYPE: &str = "ReconcileTaxa";

/// One staged input and the text that stands for it on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub record: IoRecord,
    pub argument: String,
}

/// Resolves data objects and user-selected paths into input records.
pub struct DataObjectResolver<'a> {
    urls: &'a dyn UrlAssembler,
    files: &'a dyn FileResolverFactory,
}

impl<'a> DataObjectResolver<'a> {
    pub fn new(urls: &'a dyn UrlAssembler, files: &'a dyn FileResolverFactory) -> Self {
        Self { urls, files }
    }

    /// Resolves the input records for a data object. `key` names the configuration
    /// entry the value came from and is only used in error reports.
    pub fn resolve(
        &self,
        data_object: &DataObject,
        raw: &str,
        key: &str,
    ) -> Result<Vec<IoRecord>, CompileError> {
        Ok(self
            .resolve_inputs(data_object, raw, key)?
            .into_iter()
            .map(|input| input.record)
            .collect())
    }

    pub fn resolve_inputs(
        &self,
        data_object: &DataObject,
        raw: &str,
        key: &str,
    ) -> Result<Vec<ResolvedInput>, CompileError> {
        if is_reconcile_taxa(data_object) {
            warn!(
                data_object = %data_object.id,
                "Skipping input with unsupported info type ReconcileTaxa"
            );
            return Ok(vec![]);
        }

        if let Some(resolver) = self.files.file_resolver(&data_object.info_type) {
            let name = extract_input_name(raw);
            if name.is_empty() {
                return Ok(vec![]);
            }
            let url = resolver.resolve_url(&name)?;
            if url.trim().is_empty() || is_local_url(&url) {
                warn!(data_object = %data_object.id, %url, "File resolver returned no usable URL");
                return Ok(vec![]);
            }
            debug!(
                data_object = %data_object.id,
                %name,
                %url,
                "Resolved input through file resolver"
            );
            let record = IoRecord {
                name: data_object.name.clone(),
                property: Some(data_object.name.clone()),
                record_type: Some(data_object.info_type.clone()),
                value: Some(url.clone()),
                id: Some(data_object.id.clone()),
                order: None,
                multiplicity: None,
                retain: Some(data_object.retain),
            };
            return Ok(vec![ResolvedInput {
                record,
                argument: url,
            }]);
        }

        let paths = match data_object.multiplicity {
            Multiplicity::Many => parse_path_list(raw, key)?,
            Multiplicity::Single | Multiplicity::Collection => vec![raw.trim().to_string()],
        };

        paths
            .iter()
            .filter(|path| !path.trim().is_empty())
            .map(|path| -> Result<ResolvedInput, CompileError> {
                let name = basename(path).to_string();
                let url = self.urls.assemble_url(path)?;
                Ok(ResolvedInput {
                    record: IoRecord {
                        name: name.clone(),
                        property: Some(name.clone()),
                        record_type: Some(data_object.info_type.clone()),
                        value: Some(url),
                        id: Some(data_object.id.clone()),
                        order: None,
                        multiplicity: Some(data_object.multiplicity.as_str().to_string()),
                        retain: Some(data_object.retain),
                    },
                    argument: name,
                })
            })
            .collect()
    }
}

/// Inputs of this info type are never staged or passed on.
pub fn is_reconcile_taxa(data_object: &DataObject) -> bool {
    data_object.info_type.eq_ignore_ascii_case(RECONCILE_TAXA_TYPE)
}

/// Pulls the symbolic name out of a submitted value: a JSON string, the `uuid`,
/// `id` or `name` field of a JSON object, or the raw text when it is not JSON.
pub fn extract_input_name(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => s,
        Ok(Value::Object(object)) => ["uuid", "id", "name"]
            .iter()
            .find_map(|field| object.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| raw.trim().to_string()),
        _ => raw.trim().to_string(),
    }
}

fn is_local_url(url: &str) -> bool {
    url.starts_with("file://") || url.starts_with('/')
}

pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn parse_path_list(raw: &str, key: &str) -> Result<Vec<String>, CompileError> {
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }
    let values: Vec<Value> =
        serde_json::from_str(raw).map_err(|e| CompileError::malformed(key, e))?;
    values
        .into_iter()
        .map(|value| match value {
            Value::String(path) => Ok(path),
            other => Err(CompileError::malformed(
                key,
                format!("expected a list of paths, found {}", other),
            )),
        })
        .collect()
}
