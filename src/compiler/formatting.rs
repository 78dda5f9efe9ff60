use crate::analysis::{DataObject, FILE_SOURCE, Property};
use crate::compiler::data_object::{DataObjectResolver, is_reconcile_taxa};
use crate::compiler::mapping::OutputRegistry;
use crate::error::CompileError;
use crate::job::IoRecord;
use crate::submission::Configuration;
use ahash::AHashMap;
use serde_json::Value;

/// The type tag of properties that become environment variables instead of arguments.
pub const ENVIRONMENT_VARIABLE_TYPE: &str = "EnvironmentVariable";

/// The formatting rule a property type tag selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Any type ending in `Selection` except `TreeSelection`.
    Selection,
    TreeSelection,
    Flag,
    Input,
    Output,
    /// Labels shown to the user; never formatted.
    Info,
    /// Types handled elsewhere, such as environment variables.
    Ignored,
    /// Types the compiler refuses to format.
    Unsupported,
    /// Plain values: numbers, text and everything else.
    Value,
}

impl PropertyKind {
    pub fn classify(type_name: &str) -> Self {
        match type_name {
            "TreeSelection" => PropertyKind::TreeSelection,
            "Flag" => PropertyKind::Flag,
            "Input" => PropertyKind::Input,
            "Output" => PropertyKind::Output,
            "Info" => PropertyKind::Info,
            ENVIRONMENT_VARIABLE_TYPE => PropertyKind::Ignored,
            "BarcodeSelector" | "ClipperSelector" => PropertyKind::Unsupported,
            t if t.ends_with("Selection") => PropertyKind::Selection,
            _ => PropertyKind::Value,
        }
    }
}

/// Where the raw value handed to a formatter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Override,
    Configuration,
    Default,
    /// Produced by an earlier step of the same job.
    Mapping,
}

/// What formatting a step's properties leaves behind besides parameters.
#[derive(Debug, Default)]
pub struct StepEffects {
    pub inputs: Vec<IoRecord>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl StepEffects {
    /// Records `filename` when the data object captures standard output or error.
    pub fn redirect(&mut self, data_object: &DataObject, filename: &str) {
        if data_object.is_stdout() {
            self.stdout = Some(filename.to_string());
        } else if data_object.is_stderr() {
            self.stderr = Some(filename.to_string());
        }
    }
}

/// Everything a formatter may read or record while formatting one property.
pub struct FormatContext<'a> {
    pub step_name: &'a str,
    pub source: ValueSource,
    pub data_objects: &'a DataObjectResolver<'a>,
    pub outputs: &'a mut OutputRegistry,
    pub effects: &'a mut StepEffects,
}

impl FormatContext<'_> {
    fn key(&self, property: &Property) -> String {
        Configuration::key(self.step_name, &property.id)
    }
}

/// Defines the contract for turning one property and its raw value into parameters.
pub trait PropertyFormatter: Send + Sync {
    fn type_name(&self) -> &str;

    fn kind(&self) -> PropertyKind {
        PropertyKind::Value
    }

    fn format(
        &self,
        property: &Property,
        raw: &str,
        ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError>;
}

/// Runs a formatter and drops every record without a command-line position.
pub fn format_property(
    formatter: &dyn PropertyFormatter,
    property: &Property,
    raw: &str,
    ctx: &mut FormatContext<'_>,
) -> Result<Vec<IoRecord>, CompileError> {
    let records = formatter.format(property, raw, ctx)?;
    Ok(records
        .into_iter()
        .filter(|r| r.order.unwrap_or(0) >= 0)
        .collect())
}

/// A negative order means "no position"; a switch gives the parameter one anyway.
pub fn effective_order(order: i32, switch: &str) -> i32 {
    if switch.trim().is_empty() {
        order
    } else {
        order.max(0)
    }
}

fn param(property: &Property, switch: &str, value: &str) -> IoRecord {
    IoRecord::param(
        switch,
        value,
        effective_order(property.order, switch),
        &property.id,
    )
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Splits `--level=3` or `-k 5` into switch and value at the first run of
/// whitespace or `=`.
pub fn split_switch(text: &str) -> (&str, &str) {
    let separator = |c: char| c.is_whitespace() || c == '=';
    match text.find(separator) {
        Some(i) => (&text[..i], text[i..].trim_start_matches(separator)),
        None => (text, ""),
    }
}

fn text_field(object: &serde_json::Map<String, Value>, field: &str) -> String {
    match object.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn selection_record(
    property: &Property,
    selection: &Value,
    key: &str,
) -> Result<Option<IoRecord>, CompileError> {
    let object = selection.as_object().ok_or_else(|| {
        CompileError::malformed(key, "expected a JSON object with 'name' and 'value'")
    })?;
    let name = text_field(object, "name");
    let value = text_field(object, "value");
    if is_blank(&name) && is_blank(&value) {
        return Ok(None);
    }
    Ok(Some(param(property, &name, &value)))
}

struct SelectionFormatter;

impl PropertyFormatter for SelectionFormatter {
    fn type_name(&self) -> &str {
        "Selection"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Selection
    }
    fn format(
        &self,
        property: &Property,
        raw: &str,
        ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        if is_blank(raw) {
            return Ok(vec![]);
        }
        let key = ctx.key(property);
        let selection: Value =
            serde_json::from_str(raw).map_err(|e| CompileError::malformed(&key, e))?;
        Ok(selection_record(property, &selection, &key)?
            .into_iter()
            .collect())
    }
}

struct TreeSelectionFormatter;

impl PropertyFormatter for TreeSelectionFormatter {
    fn type_name(&self) -> &str {
        "TreeSelection"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::TreeSelection
    }
    fn format(
        &self,
        property: &Property,
        raw: &str,
        ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        if is_blank(raw) {
            return Ok(vec![]);
        }
        let key = ctx.key(property);
        let selections: Vec<Value> =
            serde_json::from_str(raw).map_err(|e| CompileError::malformed(&key, e))?;
        let mut records = Vec::with_capacity(selections.len());
        for selection in &selections {
            records.extend(selection_record(property, selection, &key)?);
        }
        Ok(records)
    }
}

/// The property name holds `"<when true>,<when false>"`; each side may carry a value.
struct FlagFormatter;

impl PropertyFormatter for FlagFormatter {
    fn type_name(&self) -> &str {
        "Flag"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Flag
    }
    fn format(
        &self,
        property: &Property,
        raw: &str,
        _ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        let selected = raw.trim().eq_ignore_ascii_case("true");
        let mut options = property.name.split(',');
        let true_text = options.next();
        let false_text = options.next();
        let chosen = (if selected { true_text } else { false_text })
            .unwrap_or("")
            .trim();
        if chosen.is_empty() {
            return Ok(vec![]);
        }
        let (switch, value) = split_switch(chosen);
        Ok(vec![param(property, switch, value)])
    }
}

/// Stages the selected files and passes their names on the command line.
struct InputFormatter;

impl PropertyFormatter for InputFormatter {
    fn type_name(&self) -> &str {
        "Input"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Input
    }
    fn format(
        &self,
        property: &Property,
        raw: &str,
        ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        let Some(data_object) = &property.data_object else {
            return ValueFormatter.format(property, raw, ctx);
        };
        if is_reconcile_taxa(data_object) {
            return Ok(vec![]);
        }
        let switch = if is_blank(&property.name) {
            data_object.switch.as_str()
        } else {
            property.name.as_str()
        };

        if is_blank(raw) {
            if property.omit_if_blank {
                return Ok(vec![]);
            }
            return Ok(vec![param(property, switch, "")]);
        }

        // Files written by an earlier step already sit in the job's working directory.
        if ctx.source == ValueSource::Mapping {
            return Ok(vec![param(property, switch, raw)]);
        }

        let key = ctx.key(property);
        let resolved = ctx.data_objects.resolve_inputs(data_object, raw, &key)?;
        let mut records = Vec::with_capacity(resolved.len());
        for input in resolved {
            if !(property.omit_if_blank && is_blank(&input.argument)) {
                records.push(param(property, switch, &input.argument));
            }
            ctx.effects.inputs.push(input.record);
        }
        Ok(records)
    }
}

/// Registers the output's file name for later steps and emits it when it is an
/// ordinary, explicitly named file.
struct OutputFormatter;

impl PropertyFormatter for OutputFormatter {
    fn type_name(&self) -> &str {
        "Output"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Output
    }
    fn format(
        &self,
        property: &Property,
        raw: &str,
        ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        let Some(data_object) = &property.data_object else {
            if !is_blank(raw) {
                ctx.outputs.register(ctx.step_name, &property.id, raw);
            }
            return ValueFormatter.format(property, raw, ctx);
        };

        if !is_blank(raw) {
            ctx.outputs.register(ctx.step_name, &data_object.id, raw);
            if property.id != data_object.id {
                ctx.outputs.register(ctx.step_name, &property.id, raw);
            }
        }
        let filename = if is_blank(raw) {
            data_object.name.as_str()
        } else {
            raw
        };
        ctx.effects.redirect(data_object, filename);

        if data_object.implicit || data_object.data_source != FILE_SOURCE {
            return Ok(vec![]);
        }
        if property.omit_if_blank && is_blank(raw) {
            return Ok(vec![]);
        }
        let switch = if is_blank(&property.name) {
            data_object.switch.as_str()
        } else {
            property.name.as_str()
        };
        Ok(vec![param(property, switch, raw)])
    }
}

struct InfoFormatter;

impl PropertyFormatter for InfoFormatter {
    fn type_name(&self) -> &str {
        "Info"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Info
    }
    fn format(
        &self,
        _property: &Property,
        _raw: &str,
        _ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        Ok(vec![])
    }
}

pub(crate) struct IgnoredFormatter;

impl PropertyFormatter for IgnoredFormatter {
    fn type_name(&self) -> &str {
        ENVIRONMENT_VARIABLE_TYPE
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Ignored
    }
    fn format(
        &self,
        _property: &Property,
        _raw: &str,
        _ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        Ok(vec![])
    }
}

struct UnsupportedFormatter;

impl PropertyFormatter for UnsupportedFormatter {
    fn type_name(&self) -> &str {
        "BarcodeSelector"
    }
    fn kind(&self) -> PropertyKind {
        PropertyKind::Unsupported
    }
    fn format(
        &self,
        property: &Property,
        _raw: &str,
        _ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        Err(CompileError::UnsupportedPropertyType {
            property_id: property.id.clone(),
            type_name: property.property_type.clone(),
        })
    }
}

struct ValueFormatter;

impl PropertyFormatter for ValueFormatter {
    fn type_name(&self) -> &str {
        "Text"
    }
    fn format(
        &self,
        property: &Property,
        raw: &str,
        _ctx: &mut FormatContext<'_>,
    ) -> Result<Vec<IoRecord>, CompileError> {
        if property.omit_if_blank && is_blank(raw) {
            return Ok(vec![]);
        }
        Ok(vec![param(property, &property.name, raw)])
    }
}

/// Defines the lookup of built-in formatters by kind and by canonical type name.
macro_rules! builtin_formatters {
    ( $( ($kind:path, $name:literal, $formatter:ident) ),* $(,)? ) => {
        pub(crate) fn builtin_formatter(kind: PropertyKind) -> &'static dyn PropertyFormatter {
            match kind {
                $( $kind => &$formatter, )*
            }
        }

        pub(crate) fn create_formatter_by_name(name: &str) -> Option<Box<dyn PropertyFormatter>> {
            match name {
                $( $name => Some(Box::new($formatter)), )*
                _ => None,
            }
        }
    };
}

builtin_formatters! {
    (PropertyKind::Selection, "Selection", SelectionFormatter),
    (PropertyKind::TreeSelection, "TreeSelection", TreeSelectionFormatter),
    (PropertyKind::Flag, "Flag", FlagFormatter),
    (PropertyKind::Input, "Input", InputFormatter),
    (PropertyKind::Output, "Output", OutputFormatter),
    (PropertyKind::Info, "Info", InfoFormatter),
    (PropertyKind::Ignored, "EnvironmentVariable", IgnoredFormatter),
    (PropertyKind::Unsupported, "BarcodeSelector", UnsupportedFormatter),
    (PropertyKind::Value, "Text", ValueFormatter),
}

/// Formatters chosen by property type name. Names registered here win over the
/// built-in classification.
#[derive(Default)]
pub struct FormatterRegistry {
    custom: AHashMap<String, Box<dyn PropertyFormatter>>,
}

impl FormatterRegistry {
    pub fn insert(&mut self, type_name: impl Into<String>, formatter: Box<dyn PropertyFormatter>) {
        self.custom.insert(type_name.into(), formatter);
    }

    pub fn formatter_for(&self, type_name: &str) -> &dyn PropertyFormatter {
        match self.custom.get(type_name) {
            Some(formatter) => formatter.as_ref(),
            None => builtin_formatter(PropertyKind::classify(type_name)),
        }
    }
}
