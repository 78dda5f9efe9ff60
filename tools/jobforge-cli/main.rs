use clap::Parser;
use jobforge::prelude::*;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compiles an analysis submission into a batch job descriptor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the catalog bundle JSON file (analyses, templates, components)
    catalog_path: String,
    /// Path to the job submission JSON file
    submission_path: String,

    /// Write the job descriptor here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Execution target recorded on the job and on every step
    #[arg(short = 't', long, default_value = "condor")]
    execution_target: String,

    /// Base URL that input paths are joined onto
    #[arg(short = 'u', long)]
    url_base: Option<String>,

    /// Format a property type like a built-in one, e.g. `IntegerInput=Text`
    #[arg(long = "type-mapping", value_name = "USER=BUILTIN", value_parser = parse_type_mapping)]
    type_mappings: Vec<(String, String)>,

    /// Sort every step's parameters by their command-line order
    #[arg(long)]
    sort_params: bool,

    /// Emit compact JSON instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,
}

fn parse_type_mapping(text: &str) -> std::result::Result<(String, String), String> {
    match text.split_once('=') {
        Some((user, builtin)) if !user.trim().is_empty() && !builtin.trim().is_empty() => {
            Ok((user.trim().to_string(), builtin.trim().to_string()))
        }
        _ => Err(format!("expected USER=BUILTIN, got '{}'", text)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    let catalog = InMemoryCatalog::from_file(&cli.catalog_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load catalog: {}", e)));
    let submission = JobSubmission::from_file(&cli.submission_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load submission: {}", e)));
    tracing::info!(
        analyses = catalog.len(),
        analysis = %submission.analysis_id,
        "Loaded catalog and submission"
    );

    let mut builder = JobCompiler::builder(&catalog).with_execution_target(&cli.execution_target);
    if let Some(base) = &cli.url_base {
        builder = builder.with_url_assembler(PrefixUrlAssembler::new(base.as_str()));
    }
    for (user, builtin) in &cli.type_mappings {
        builder = builder.with_type_mapping(user, builtin);
    }
    let compiler = builder.build();

    let mut job = compiler
        .compile_submission(&submission)
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));

    if cli.sort_params {
        for step in &mut job.steps {
            step.config.params = step.config.sorted_params().into_iter().cloned().collect();
        }
    }

    let json = if cli.compact {
        job.to_json()
    } else {
        job.to_json_pretty()
    }
    .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize job: {}", e)));

    match &cli.output {
        Some(path) => {
            fs::write(path, json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write job to '{}': {}", path, e))
            });
            eprintln!(
                "Compiled {} step(s) [{}] into '{}' in {:?}",
                job.steps.len(),
                job.step_names(),
                path,
                start.elapsed()
            );
        }
        None => println!("{}", json),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
