//! OpenAPI from Models - command-line front end.
//!
//! Reads model and route definitions from YAML or JSON files and writes an
//! OpenAPI document with a synthesized example for every response body.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-models [OPTIONS] <DSL_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-models ./api -o openapi.yaml
//! ```
//!
//! Write a split docs tree:
//! ```bash
//! openapi-from-models ./api --split-dir docs --title "Restaurant API"
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-models ./api -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_models::cli;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from Models starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
