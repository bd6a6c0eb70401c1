#![forbid(unsafe_code)]
use blockledger::cli::{normalize_args, run, Cli};
use blockledger::config::{load_config, load_config_file};
use clap::Parser;
use colored::*;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse_from(normalize_args(std::env::args()));

    let config = match &cli.config {
        Some(path) => load_config_file(path),
        None => load_config(),
    };

    let result = config.and_then(|config| run(&cli, &config, &mut std::io::stdout().lock()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
