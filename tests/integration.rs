//! Integration tests for jobforge
//!
//! End-to-end tests that compile whole submissions against a catalog.
//!
mod common;
use common::*;
use jobforge::prelude::*;
use serde_json::json;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_step_pipeline_end_to_end() {
        let catalog = create_catalog(create_pipeline());
        let compiler = JobCompiler::builder(&catalog).build();

        let job = compiler
            .compile_submission(&create_submission())
            .expect("Failed to compile submission");

        assert_eq!(job.analysis_id, "a_pipeline");
        assert_eq!(job.analysis_name, "Align and sort");
        assert_eq!(job.name, "run 1");
        assert_eq!(job.username, "alice");
        assert_eq!(job.request_type, "submit");
        assert_eq!(job.execution_target, "condor");
        assert!(job.create_output_subdir);
        assert_eq!(job.step_names(), "align, sort");

        let align = job.step("align").expect("align step");
        assert_eq!(align.step_type, "condor");
        assert_eq!(
            align.config.params,
            vec![
                IoRecord::param("--verbose", "", 0, "p_verbose"),
                IoRecord::param("-t", "4", 1, "p_threads"),
                IoRecord::param("-i", "r1.fq", 2, "p_reads"),
                IoRecord::param("-o", "my.bam", 3, "p_out"),
            ]
        );
        assert_eq!(align.config.input.len(), 1);
        assert_eq!(align.config.input[0].name, "r1.fq");
        assert_eq!(align.config.input[0].value.as_deref(), Some("/home/alice/r1.fq"));
        assert_eq!(align.config.input[0].id.as_deref(), Some("d_reads"));
        assert_eq!(align.stdout.as_deref(), Some("align.log"));
        assert_eq!(align.stderr, None);
        assert_eq!(align.environment.get("ALIGN_MODE").map(String::as_str), Some("fast"));
        assert_eq!(align.component.name, "bwa");

        let sort = job.step("sort").expect("sort step");
        assert_eq!(sort.config.params, vec![IoRecord::param("-in", "my.bam", 1, "p_in")]);
        assert!(sort.config.input.is_empty());
        assert!(sort.environment.is_empty());
    }

    #[test]
    fn test_outputs_are_named_and_logs_come_last() {
        let catalog = create_catalog(create_pipeline());
        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&create_submission())
            .expect("Failed to compile submission");

        let align = job.step("align").expect("align step");
        assert_eq!(
            align.config.output,
            vec![
                IoRecord::output("my.bam", "BAM", Multiplicity::Single, false),
                IoRecord::output("align.log", "File", Multiplicity::Single, false),
                IoRecord::logs(),
            ]
        );

        for step in &job.steps {
            let last = step.config.output.last().expect("logs record");
            assert_eq!(
                serde_json::to_value(last).unwrap(),
                json!({
                    "name": "logs",
                    "property": "logs",
                    "type": "File",
                    "multiplicity": "collection",
                    "retain": true
                })
            );
        }
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let catalog = create_catalog(create_pipeline());
        let compiler = JobCompiler::builder(&catalog).build();
        let submission = create_submission();

        let first = compiler.compile_submission(&submission).unwrap();
        let second = compiler.compile_submission(&submission).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_mapping_falls_back_to_declared_output_name() {
        let catalog = create_catalog(create_pipeline());
        let submission = JobSubmission::new("a_pipeline", "defaults").with_config(
            Configuration::new().with("align", "p_reads", "/home/alice/r1.fq"),
        );

        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&submission)
            .unwrap();

        let sort = job.step("sort").unwrap();
        assert_eq!(sort.config.params, vec![IoRecord::param("-in", "aligned.bam", 1, "p_in")]);
        assert_eq!(
            job.step("align").unwrap().config.output[0],
            IoRecord::output("aligned.bam", "BAM", Multiplicity::Single, false)
        );
    }

    #[test]
    fn test_mapping_uses_source_step_override() {
        let mut analysis = create_pipeline();
        analysis.steps[0]
            .transformation
            .overrides
            .insert("o_bam".to_string(), "fixed.bam".to_string());
        let catalog = create_catalog(analysis);
        let submission = JobSubmission::new("a_pipeline", "override").with_config(
            Configuration::new().with("align", "p_reads", "/home/alice/r1.fq"),
        );

        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&submission)
            .unwrap();

        let align = job.step("align").unwrap();
        assert!(align.config.params.contains(&IoRecord::param("-o", "fixed.bam", 3, "p_out")));
        let sort = job.step("sort").unwrap();
        assert_eq!(sort.config.params, vec![IoRecord::param("-in", "fixed.bam", 1, "p_in")]);
    }

    #[test]
    fn test_mapping_from_source_input() {
        let mut analysis = create_pipeline();
        analysis.mappings = vec![mapping("align", "sort", &[("in#align_d_reads", "d_bam")])];
        let catalog = create_catalog(analysis);

        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&create_submission())
            .unwrap();

        let sort = job.step("sort").unwrap();
        assert_eq!(
            sort.config.params,
            vec![IoRecord::param("-in", "/home/alice/r1.fq", 1, "p_in")]
        );
    }

    #[test]
    fn test_user_supplied_output_value_reaches_next_step() {
        let producer = Template {
            id: "t_a".to_string(),
            component_id: "c_bwa".to_string(),
            groups: vec![group(vec![property("o1", "Output", "out1", 0)])],
            ..Default::default()
        };
        let consumer = Template {
            id: "t_b".to_string(),
            component_id: "c_samtools".to_string(),
            groups: vec![group(vec![property("i1", "Input", "-i", 1)])],
            ..Default::default()
        };
        let analysis = Analysis {
            id: "a_ab".to_string(),
            name: "A then B".to_string(),
            steps: vec![step("A", "t_a"), step("B", "t_b")],
            mappings: vec![mapping("A", "B", &[("o1", "i1")])],
            ..Default::default()
        };
        let catalog = InMemoryCatalog::new()
            .with_analysis(analysis)
            .with_template(producer)
            .with_template(consumer)
            .with_component(component("c_bwa", "bwa"))
            .with_component(component("c_samtools", "samtools"));
        let submission = JobSubmission::new("a_ab", "a then b")
            .with_config(Configuration::new().with("A", "o1", "out.txt"));

        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&submission)
            .expect("Failed to compile submission");

        assert_eq!(
            job.step("A").unwrap().config.params,
            vec![IoRecord::param("out1", "out.txt", 0, "o1")]
        );
        assert_eq!(
            job.step("B").unwrap().config.params,
            vec![IoRecord::param("-i", "out.txt", 1, "i1")]
        );
    }

    #[test]
    fn test_mapping_against_declaration_order_fails() {
        let mut analysis = create_pipeline();
        analysis.steps.reverse();
        let catalog = create_catalog(analysis);

        let result = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&create_submission());

        match result {
            Err(CompileError::MissingMappedValue {
                target_step,
                target_id,
                source_step,
                source_id,
            }) => {
                assert_eq!(target_step, "sort");
                assert_eq!(target_id, "d_bam");
                assert_eq!(source_step, "align");
                assert_eq!(source_id, "o_bam");
            }
            other => panic!("Expected MissingMappedValue, got {:?}", other),
        }
    }

    #[test]
    fn test_mapping_to_unknown_id_is_invalid() {
        let mut analysis = create_pipeline();
        analysis.mappings = vec![mapping("align", "sort", &[("o_missing", "d_bam")])];
        let catalog = create_catalog(analysis);

        let result = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&create_submission());
        assert!(matches!(result, Err(CompileError::InvalidMapping { .. })));
    }

    #[test]
    fn test_missing_catalog_entries_are_not_found() {
        let catalog = create_catalog(create_pipeline());
        let compiler = JobCompiler::builder(&catalog).build();

        let unknown = JobSubmission::new("a_unknown", "nothing");
        match compiler.compile_submission(&unknown) {
            Err(CompileError::NotFound { id, .. }) => assert_eq!(id, "a_unknown"),
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let mut analysis = create_pipeline();
        analysis.steps[1].transformation.template_id = "t_gone".to_string();
        let result = compiler.compile(&analysis, &create_submission());
        match result {
            Err(CompileError::NotFound { id, .. }) => assert_eq!(id, "t_gone"),
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let catalog = InMemoryCatalog::new()
            .with_analysis(create_pipeline())
            .with_template(align_template())
            .with_template(sort_template())
            .with_component(component("c_bwa", "bwa"));
        let result = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&create_submission());
        assert!(
            matches!(result, Err(CompileError::NotFound { ref id, .. }) if id == "c_samtools"),
            "Got {:?}",
            result
        );
    }

    #[test]
    fn test_reconcile_taxa_inputs_are_skipped() {
        let mut template = sort_template();
        let mut taxa = property("p_taxa", "Input", "--taxa", 2);
        taxa.data_object = Some(data_object("d_taxa", "taxa", "ReconcileTaxa"));
        template.groups[0].properties.push(taxa);
        template.inputs.push(data_object("d_taxa", "taxa", "ReconcileTaxa"));

        let catalog = create_catalog(create_pipeline()).with_template(template);
        let mut submission = create_submission();
        submission.config.insert("sort_p_taxa", "/home/alice/taxa.txt");

        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&submission)
            .unwrap();

        let sort = job.step("sort").unwrap();
        assert!(sort.config.input.is_empty());
        assert!(sort.config.params.iter().all(|p| p.name != "--taxa"));
    }

    #[test]
    fn test_bundle_compiles_to_expected_json() {
        let catalog =
            InMemoryCatalog::from_json(PIPELINE_BUNDLE_JSON).expect("bundle should parse");
        let submission: JobSubmission = serde_json::from_str(
            r#"{
                "analysisId": "a_pipeline",
                "name": "bundle run",
                "config": {"align_p_reads": ["/data/r1.fq", "/data/r2.fq"]}
            }"#,
        )
        .unwrap();

        let job = JobCompiler::builder(&catalog)
            .with_url_assembler(PrefixUrlAssembler::new("irods://zone"))
            .with_execution_target("local")
            .build()
            .compile_submission(&submission)
            .unwrap();

        let steps = serde_json::to_value(&job.steps).unwrap();
        assert_eq!(
            steps,
            json!([
                {
                    "name": "align",
                    "type": "local",
                    "config": {
                        "input": [
                            {"name": "r1.fq", "property": "r1.fq", "type": "FASTQ",
                             "value": "irods://zone/data/r1.fq", "id": "d_reads",
                             "multiplicity": "many", "retain": false},
                            {"name": "r2.fq", "property": "r2.fq", "type": "FASTQ",
                             "value": "irods://zone/data/r2.fq", "id": "d_reads",
                             "multiplicity": "many", "retain": false}
                        ],
                        "params": [
                            {"name": "-i", "value": "r1.fq", "id": "p_reads", "order": 2},
                            {"name": "-i", "value": "r2.fq", "id": "p_reads", "order": 2}
                        ],
                        "output": [
                            {"name": "aligned.bam", "property": "aligned.bam", "type": "BAM",
                             "multiplicity": "single", "retain": true},
                            {"name": "logs", "property": "logs", "type": "File",
                             "multiplicity": "collection", "retain": true}
                        ]
                    },
                    "environment": {},
                    "component": {"name": "bwa", "location": "/usr/bin",
                                  "type": "executable", "description": ""}
                },
                {
                    "name": "sort",
                    "type": "local",
                    "config": {
                        "input": [],
                        "params": [
                            {"name": "-in", "value": "aligned.bam", "id": "p_in", "order": 1},
                            {"name": "-m", "value": "2G", "id": "p_mem", "order": 0}
                        ],
                        "output": [
                            {"name": "sorted.bam", "property": "sorted.bam", "type": "BAM",
                             "multiplicity": "single", "retain": false},
                            {"name": "logs", "property": "logs", "type": "File",
                             "multiplicity": "collection", "retain": true}
                        ]
                    },
                    "environment": {},
                    "component": {"name": "samtools", "location": "/usr/bin",
                                  "type": "executable", "description": ""}
                }
            ])
        );
        assert_eq!(job.execution_target, "local");
    }

    #[test]
    fn test_descriptor_save_and_reload() {
        let catalog = create_catalog(create_pipeline());
        let job = JobCompiler::builder(&catalog)
            .build()
            .compile_submission(&create_submission())
            .unwrap();

        let path = std::env::temp_dir().join("jobforge_descriptor_test.json");
        let path = path.to_str().unwrap();
        job.save(path).expect("Failed to save descriptor");
        let reloaded = JobDescriptor::from_file(path).expect("Failed to reload descriptor");
        std::fs::remove_file(path).ok();

        assert_eq!(job, reloaded);
    }
}
