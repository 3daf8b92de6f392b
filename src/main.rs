// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Binary entry point for the tugdoc CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Build every module tree under trees/ and print the report
//! tugdoc build trees/
//!
//! # Show low-severity diagnostics too, with a custom configuration
//! tugdoc build --config tugdoc.json --verbose 2 trees/pkg.json trees/pkg.mod.json
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tugdoc::build_batch;
use tugdoc::input::{collect_input_files, ModuleInput};
use tugdoc_core::error::{OutputErrorCode, TugdocError};
use tugdoc_core::output::{emit_response, emit_response_compact, ErrorResponse};
use tugdoc_python::BuilderOptions;

// ============================================================================
// CLI Structure
// ============================================================================

/// Semantic model builder for Python API documentation.
#[derive(Parser, Debug)]
#[command(name = "tugdoc")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit single-line JSON.
    #[arg(long, global = true)]
    compact: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the semantic model of a set of module trees.
    Build {
        /// Builder configuration file (JSON).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Diagnostic verbosity; overrides the configuration file.
        #[arg(long, allow_negative_numbers = true)]
        verbose: Option<i8>,

        /// Module tree files, or directories to search for `*.json`.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), TugdocError> {
    match cli.command {
        Command::Build {
            config,
            verbose,
            paths,
        } => execute_build(&cli.global, config, verbose, &paths),
    }
}

fn execute_build(
    global: &GlobalArgs,
    config: Option<PathBuf>,
    verbose: Option<i8>,
    paths: &[PathBuf],
) -> Result<(), TugdocError> {
    let mut options = load_options(config)?;
    if let Some(verbosity) = verbose {
        options = options.with_verbosity(verbosity);
    }

    let files = collect_input_files(paths)?;
    if files.is_empty() {
        return Err(TugdocError::invalid_args("no module tree files found"));
    }
    let inputs = files.iter().map(|path| ModuleInput::load(path)).collect();
    let report = build_batch(inputs, options)?;

    let mut stdout = io::stdout();
    let written = if global.compact {
        emit_response_compact(&report, &mut stdout)
    } else {
        emit_response(&report, &mut stdout)
    };
    written
        .and_then(|()| stdout.flush())
        .map_err(|e| TugdocError::internal(format!("cannot write report: {}", e)))
}

fn load_options(config: Option<PathBuf>) -> Result<BuilderOptions, TugdocError> {
    let Some(path) = config else {
        return Ok(BuilderOptions::default());
    };
    let text = fs::read_to_string(&path)
        .map_err(|_| TugdocError::file_not_found(path.display().to_string()))?;
    BuilderOptions::from_json(&text).map_err(|e| {
        TugdocError::invalid_args(format!("bad configuration {}: {}", path.display(), e))
    })
}

// ============================================================================
// Tests
// ============================================================================
