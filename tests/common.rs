//! Common test utilities for building analyses, catalogs and submissions.
use jobforge::prelude::*;

#[allow(dead_code)]
pub fn component(id: &str, name: &str) -> DeployedComponent {
    DeployedComponent {
        id: id.to_string(),
        name: name.to_string(),
        location: "/usr/bin".to_string(),
        component_type: "executable".to_string(),
        description: String::new(),
    }
}

#[allow(dead_code)]
pub fn data_object(id: &str, name: &str, info_type: &str) -> DataObject {
    DataObject {
        id: id.to_string(),
        name: name.to_string(),
        info_type: info_type.to_string(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn property(id: &str, type_name: &str, name: &str, order: i32) -> Property {
    Property {
        id: id.to_string(),
        name: name.to_string(),
        property_type: type_name.to_string(),
        order,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn group(properties: Vec<Property>) -> PropertyGroup {
    PropertyGroup {
        id: "g1".to_string(),
        name: "Options".to_string(),
        properties,
    }
}

#[allow(dead_code)]
pub fn step(name: &str, template_id: &str) -> Step {
    Step {
        id: format!("{}-id", name),
        name: name.to_string(),
        description: String::new(),
        transformation: Transformation {
            template_id: template_id.to_string(),
            overrides: Default::default(),
        },
    }
}

#[allow(dead_code)]
pub fn mapping(source_step: &str, target_step: &str, relation: &[(&str, &str)]) -> Mapping {
    Mapping {
        source_step: source_step.to_string(),
        target_step: target_step.to_string(),
        relation: relation
            .iter()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect(),
    }
}

/// The aligner template.
///
/// Properties, in order: `--verbose,--quiet` flag, `-t` threads, `-i` reads input,
/// `-o` bam output, an info label and the `ALIGN_MODE` environment variable.
/// An unreferenced `align.log` output captures standard output.
#[allow(dead_code)]
pub fn align_template() -> Template {
    let mut threads = property("p_threads", "Number", "-t", 1);
    threads.default_value = Some("1".to_string());

    let mut reads = property("p_reads", "Input", "-i", 2);
    reads.data_object = Some(data_object("d_reads", "reads", "FASTQ"));

    let mut out = property("p_out", "Output", "-o", 3);
    out.data_object = Some(data_object("o_bam", "aligned.bam", "BAM"));

    let mut env = property("p_env", "EnvironmentVariable", "ALIGN_MODE", 0);
    env.default_value = Some("fast".to_string());

    let mut log = data_object("o_log", "align.log", "");
    log.data_source = "stdout".to_string();

    Template {
        id: "t_align".to_string(),
        name: "Align reads".to_string(),
        component_id: "c_bwa".to_string(),
        groups: vec![group(vec![
            property("p_verbose", "Flag", "--verbose,--quiet", 0),
            threads,
            reads,
            out,
            property("p_label", "Info", "Alignment options", 0),
            env,
        ])],
        inputs: vec![data_object("d_reads", "reads", "FASTQ")],
        outputs: vec![data_object("o_bam", "aligned.bam", "BAM"), log],
    }
}

/// The sorter template: `-in` bam input and an optional `-m` memory value.
#[allow(dead_code)]
pub fn sort_template() -> Template {
    let mut input = property("p_in", "Input", "-in", 1);
    input.data_object = Some(data_object("d_bam", "bam", "BAM"));

    let mut memory = property("p_mem", "Number", "-m", 0);
    memory.omit_if_blank = true;

    Template {
        id: "t_sort".to_string(),
        name: "Sort alignments".to_string(),
        component_id: "c_samtools".to_string(),
        groups: vec![group(vec![input, memory])],
        inputs: vec![data_object("d_bam", "bam", "BAM")],
        outputs: vec![data_object("o_sorted", "sorted.bam", "BAM")],
    }
}

/// Two steps, `align` then `sort`, with the aligned bam feeding the sorter.
#[allow(dead_code)]
pub fn create_pipeline() -> Analysis {
    Analysis {
        id: "a_pipeline".to_string(),
        name: "Align and sort".to_string(),
        description: "Aligns reads and sorts the result".to_string(),
        analysis_type: "Genomics".to_string(),
        steps: vec![step("align", "t_align"), step("sort", "t_sort")],
        mappings: vec![mapping("align", "sort", &[("o_bam", "d_bam")])],
    }
}

#[allow(dead_code)]
pub fn create_catalog(analysis: Analysis) -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_analysis(analysis)
        .with_template(align_template())
        .with_template(sort_template())
        .with_component(component("c_bwa", "bwa"))
        .with_component(component("c_samtools", "samtools"))
}

#[allow(dead_code)]
pub fn create_submission() -> JobSubmission {
    let config = Configuration::new()
        .with("align", "p_verbose", "true")
        .with("align", "p_threads", "4")
        .with("align", "p_reads", "/home/alice/r1.fq")
        .with("align", "p_out", "my.bam")
        .with("sort", "p_mem", "");
    let mut submission = JobSubmission::new("a_pipeline", "run 1").with_config(config);
    submission.username = "alice".to_string();
    submission.email = "alice@example.org".to_string();
    submission.output_dir = "/home/alice/analyses".to_string();
    submission
}

/// The same catalog as `create_catalog(create_pipeline())`, in bundle form.
#[allow(dead_code)]
pub const PIPELINE_BUNDLE_JSON: &str = r#"{
    "analyses": [{
        "id": "a_pipeline",
        "name": "Align and sort",
        "steps": [
            {"id": "s1", "name": "align", "transformation": {"templateId": "t_align"}},
            {"id": "s2", "name": "sort", "transformation": {"templateId": "t_sort", "propertyValues": {"p_mem": "2G"}}}
        ],
        "mappings": [
            {"sourceStep": "align", "targetStep": "sort", "map": {"o_bam": "d_bam"}}
        ]
    }],
    "templates": [
        {
            "id": "t_align",
            "componentId": "c_bwa",
            "propertyGroups": [{"id": "g1", "properties": [
                {"id": "p_reads", "type": "Input", "name": "-i", "order": 2,
                 "dataObject": {"id": "d_reads", "name": "reads", "infoType": "FASTQ", "multiplicity": "many"}},
                {"id": "p_out", "type": "Output", "name": "-o", "order": 3,
                 "dataObject": {"id": "o_bam", "name": "aligned.bam", "infoType": "BAM", "retain": true}}
            ]}],
            "inputs": [{"id": "d_reads", "name": "reads", "infoType": "FASTQ", "multiplicity": "many"}],
            "outputs": [{"id": "o_bam", "name": "aligned.bam", "infoType": "BAM", "retain": true}]
        },
        {
            "id": "t_sort",
            "componentId": "c_samtools",
            "propertyGroups": [{"id": "g1", "properties": [
                {"id": "p_in", "type": "Input", "name": "-in", "order": 1,
                 "dataObject": {"id": "d_bam", "name": "bam", "infoType": "BAM"}},
                {"id": "p_mem", "type": "Number", "name": "-m", "order": 0}
            ]}],
            "inputs": [{"id": "d_bam", "name": "bam", "infoType": "BAM"}],
            "outputs": [{"id": "o_sorted", "name": "sorted.bam", "infoType": "BAM"}]
        }
    ],
    "deployedComponents": [
        {"id": "c_bwa", "name": "bwa", "location": "/usr/bin", "type": "executable"},
        {"id": "c_samtools", "name": "samtools", "location": "/usr/bin", "type": "executable"}
    ]
}"#;
