//! cpai CLI - concatenate project files into one document for AI assistants.
//!
//! Exit codes:
//! - 0: Success (also when no files matched)
//! - 1: Error

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cpai_lib::config::{Config, DEFAULT_OUTPUT_FILE};
use cpai_lib::{run, CpaiError, OutputMode, RunOptions, ScanOptions};

#[derive(Debug, Parser)]
#[command(name = "cpai", version, about = "Concatenate and process files for AI assistants")]
struct Cli {
    /// Files or directories to process (default: current directory)
    files: Vec<PathBuf>,

    /// Write output to a file (default: output-cpai.md)
    #[arg(short = 'f', long = "file", num_args = 0..=1, value_name = "FILE")]
    file: Option<Option<PathBuf>>,

    /// Don't copy to clipboard
    #[arg(short = 'n', long = "noclipboard")]
    no_clipboard: bool,

    /// Output an outline of functions and classes instead of full content
    #[arg(short = 't', long = "tree")]
    tree: bool,

    /// Include all files, ignoring the default exclude patterns
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Include configuration files
    #[arg(short = 'c', long = "configs")]
    configs: bool,

    /// Additional patterns to exclude
    #[arg(short = 'x', long = "exclude", num_args = 1.., value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_options(cli: Cli) -> anyhow::Result<RunOptions> {
    let base = std::env::current_dir().context("failed to resolve the working directory")?;
    let mut config = Config::load(&base);

    if let Some(file) = cli.file {
        config.output_file = Some(file.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)));
    }
    if cli.no_clipboard {
        config.use_clipboard = false;
    }

    Ok(RunOptions {
        inputs: cli.files,
        base,
        mode: if cli.tree { OutputMode::Outline } else { OutputMode::Content },
        scan: ScanOptions {
            include_all: cli.all,
            include_configs: cli.configs,
            extra_excludes: cli.exclude,
        },
        config,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = run_options(cli).and_then(|options| run(&options).map_err(anyhow::Error::from));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<CpaiError>() {
            Some(cpai) if cpai.is_warning() => {
                tracing::warn!("{}", cpai);
                ExitCode::SUCCESS
            }
            _ => {
                tracing::error!("{:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}
