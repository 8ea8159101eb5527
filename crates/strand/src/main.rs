//! Strand CLI - Documentation generator.
//!
//! Renders a Markdown template to stdout. Templates pull in other templates,
//! source files, directory trees and database table descriptions through the
//! `engine` object.

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::RenderArgs;
use output::Output;

/// Strand - Documentation generator.
#[derive(Parser)]
#[command(name = "strand", version, about)]
struct Cli {
    #[command(flatten)]
    render: RenderArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.render.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.render.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}
