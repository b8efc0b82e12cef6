use crate::document::{DocumentAssembler, Info, OpenApiDocument, DEFAULT_OPENAPI_VERSION};
use crate::example::SynthesisOptions;
use crate::loader::Definitions;
use crate::scanner::FileScanner;
use crate::schema_compiler::SchemaCompiler;
use crate::serializer::{serialize_json, serialize_yaml, write_split_tree, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI from Models - Generate OpenAPI documents with examples from model and route definitions
#[derive(Parser, Debug)]
#[command(name = "openapi-from-models")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Definition file, or a directory scanned for .yaml/.yml/.json files
    #[arg(value_name = "DSL_PATH")]
    pub dsl_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE", conflicts_with = "split_dir")]
    pub output_path: Option<PathBuf>,

    /// Write a split docs tree (openapi.yaml, schemas/, paths/) into this directory
    #[arg(long = "split-dir", value_name = "DIR")]
    pub split_dir: Option<PathBuf>,

    /// API title
    #[arg(long, default_value = "Generated API")]
    pub title: String,

    /// API version
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// API description
    #[arg(long)]
    pub description: Option<String>,

    /// OpenAPI version written to the document
    #[arg(long = "openapi-version", default_value = DEFAULT_OPENAPI_VERSION)]
    pub openapi_version: String,

    /// How many times one model may repeat along an example before it is cut to {}
    #[arg(long = "cycle-limit", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub cycle_limit: u32,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.dsl_path.exists() {
        anyhow::bail!("DSL path does not exist: {}", args.dsl_path.display());
    }

    info!("DSL path: {}", args.dsl_path.display());
    info!("Output format: {:?}", args.output_format);
    match (&args.output_path, &args.split_dir) {
        (Some(output), _) => info!("Output file: {}", output.display()),
        (None, Some(dir)) => info!("Split docs tree: {}", dir.display()),
        (None, None) => info!("Output: stdout"),
    }

    Ok(args)
}

/// Load, compile and assemble the document described by the arguments
pub fn build_document(args: &CliArgs) -> Result<OpenApiDocument> {
    info!("Scanning definitions...");
    let scan_result = FileScanner::new(args.dsl_path.clone())
        .scan()
        .with_context(|| format!("Failed to scan {}", args.dsl_path.display()))?;
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    if scan_result.definition_files.is_empty() {
        anyhow::bail!(
            "No definition files (.yaml, .yml, .json) found under {}",
            args.dsl_path.display()
        );
    }

    let mut definitions = Definitions::from_files(&scan_result.definition_files)?;
    definitions
        .registry
        .finalize()
        .context("Model definitions reference unknown models")?;

    info!("Compiling {} models...", definitions.registry.len());
    let graph = SchemaCompiler::new().compile(&definitions.registry)?;

    info!("Assembling {} routes...", definitions.routes.len());
    let assembler = DocumentAssembler::new()
        .with_info(Info {
            title: args.title.clone(),
            version: args.api_version.clone(),
            description: args.description.clone(),
        })
        .with_openapi_version(args.openapi_version.clone())
        .with_options(SynthesisOptions {
            cycle_limit: args.cycle_limit as usize,
        });
    let document = assembler.assemble(&graph, &definitions.routes)?;

    info!(
        "Document has {} paths and {} schemas",
        document.paths.len(),
        graph.len()
    );
    Ok(document)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let document = build_document(&args)?;

    if let Some(dir) = &args.split_dir {
        if args.output_format == OutputFormat::Json {
            warn!("Split docs tree is always written as YAML");
        }
        let index = write_split_tree(&document, dir)?;
        info!("Wrote docs tree, index at {}", index.display());
        return Ok(());
    }

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["openapi-from-models", "api"]).unwrap();
        assert_eq!(args.dsl_path, PathBuf::from("api"));
        assert_eq!(args.output_format, OutputFormat::Yaml);
        assert_eq!(args.title, "Generated API");
        assert_eq!(args.api_version, "1.0.0");
        assert_eq!(args.openapi_version, "3.0.1");
        assert_eq!(args.cycle_limit, 1);
        assert!(!args.verbose);
    }

    #[test]
    fn test_all_options() {
        let args = CliArgs::try_parse_from([
            "openapi-from-models",
            "api",
            "-f",
            "json",
            "-o",
            "out.json",
            "--title",
            "Restaurant API",
            "--api-version",
            "2.1.0",
            "--cycle-limit",
            "2",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.output_path, Some(PathBuf::from("out.json")));
        assert_eq!(args.title, "Restaurant API");
        assert_eq!(args.cycle_limit, 2);
        assert!(args.verbose);
    }

    #[test]
    fn test_output_conflicts_with_split_dir() {
        let result = CliArgs::try_parse_from([
            "openapi-from-models",
            "api",
            "-o",
            "out.yaml",
            "--split-dir",
            "docs",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_cycle_limit_is_rejected() {
        let result =
            CliArgs::try_parse_from(["openapi-from-models", "api", "--cycle-limit", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_dsl_path_fails_validation() {
        let args =
            CliArgs::try_parse_from(["openapi-from-models", "/definitely/not/here"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }
}
