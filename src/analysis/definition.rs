use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The data source name that redirects a step's standard output into a file.
pub const STDOUT_SOURCE: &str = "stdout";
/// The data source name that redirects a step's standard error into a file.
pub const STDERR_SOURCE: &str = "stderr";
/// The data source name of an ordinary output file.
pub const FILE_SOURCE: &str = "file";

/// A declarative multi-step pipeline definition, ready for compilation.
///
/// Steps are compiled in the order they are declared here. A mapping's source step
/// must therefore appear before its target step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type", alias = "analysisType")]
    pub analysis_type: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

impl Analysis {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// All mappings whose target is the named step.
    pub fn mappings_into<'s>(&'s self, step_name: &str) -> impl Iterator<Item = &'s Mapping> {
        self.mappings.iter().filter(move |m| m.target_step == step_name)
    }
}

/// One instance of a template inside an analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub transformation: Transformation,
}

/// Binds a step to its template and carries literal values that override
/// whatever the user submits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(alias = "templateId")]
    pub template_id: String,
    #[serde(default, alias = "propertyValues")]
    pub overrides: AHashMap<String, String>,
}

impl Transformation {
    pub fn override_for(&self, id: &str) -> Option<&str> {
        self.overrides.get(id).map(String::as_str)
    }
}

/// The parameter schema of a single tool invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "componentId")]
    pub component_id: String,
    #[serde(default, alias = "propertyGroups")]
    pub groups: Vec<PropertyGroup>,
    #[serde(default)]
    pub inputs: Vec<DataObject>,
    #[serde(default)]
    pub outputs: Vec<DataObject>,
}

impl Template {
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.groups.iter().flat_map(|g| g.properties.iter())
    }

    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties().find(|p| p.id == id)
    }

    pub fn input(&self, id: &str) -> Option<&DataObject> {
        self.inputs.iter().find(|d| d.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&DataObject> {
        self.outputs.iter().find(|d| d.id == id)
    }

    /// True when some property of this template is bound to the data object.
    pub fn is_referenced(&self, data_object_id: &str) -> bool {
        self.properties()
            .any(|p| p.data_object.as_ref().is_some_and(|d| d.id == data_object_id))
    }

    /// Whether `id` names a property or a data object of this template.
    pub fn knows_id(&self, id: &str) -> bool {
        self.property(id).is_some() || self.input(id).is_some() || self.output(id).is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// One typed, orderable parameter of a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    /// The command-line switch, or a label for types that carry their own switch.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", alias = "propertyType")]
    pub property_type: String,
    #[serde(default, alias = "defaultValue")]
    pub default_value: Option<String>,
    #[serde(default, alias = "omitIfBlank")]
    pub omit_if_blank: bool,
    #[serde(default, alias = "isHidden")]
    pub hidden: bool,
    /// Negative means the parameter has no position on the command line.
    #[serde(default)]
    pub order: i32,
    #[serde(default, alias = "dataObject")]
    pub data_object: Option<DataObject>,
}

/// How many files a data object stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    #[default]
    Single,
    Many,
    Collection,
}

impl Multiplicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::Single => "single",
            Multiplicity::Many => "many",
            Multiplicity::Collection => "collection",
        }
    }
}

/// A file-valued input or output slot of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataObject {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "switch", alias = "option_flag")]
    pub switch: String,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    #[serde(default, alias = "infoType")]
    pub info_type: String,
    #[serde(default = "default_data_source", alias = "dataSource")]
    pub data_source: String,
    #[serde(default)]
    pub retain: bool,
    #[serde(default)]
    pub implicit: bool,
    #[serde(default)]
    pub order: i32,
}

fn default_data_source() -> String {
    FILE_SOURCE.to_string()
}

impl Default for DataObject {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            switch: String::new(),
            multiplicity: Multiplicity::Single,
            info_type: String::new(),
            data_source: default_data_source(),
            retain: false,
            implicit: false,
            order: 0,
        }
    }
}

impl DataObject {
    pub fn is_stdout(&self) -> bool {
        self.data_source == STDOUT_SOURCE
    }

    pub fn is_stderr(&self) -> bool {
        self.data_source == STDERR_SOURCE
    }
}

/// A declared data dependency from one step's outputs to another step's inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(alias = "sourceStep")]
    pub source_step: String,
    #[serde(alias = "targetStep")]
    pub target_step: String,
    /// Source output id to target input id. A source id of the form
    /// `in#<step>_<id>` refers to an input of the source step instead.
    #[serde(default, rename = "map")]
    pub relation: BTreeMap<String, String>,
}

/// The tool a template invokes, as deployed on the execution hosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployedComponent {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default, rename = "type", alias = "componentType")]
    pub component_type: String,
    #[serde(default)]
    pub description: String,
}
