//! Binary entry point for the carve CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Run the whole pipeline: rewrite, assemble, resolve, reconcile, lint
//! carve split
//!
//! # Preview without touching the workspace
//! carve split --dry-run --format json
//!
//! # Re-run a single stage after hand edits
//! carve reconcile
//!
//! # Sweep every module file for structural defects
//! carve lint --all
//! ```
//!
//! The plan (`modcarve.json` by default) names the sources, the destination
//! modules, and the namespace vocabularies; see `modcarve_core::plan`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use modcarve_core::error::{CarveError, OutputErrorCode};
use modcarve_core::pipeline::{self, RunOptions, Stage};
use modcarve_core::plan::{SplitPlan, DEFAULT_PLAN_FILE};
use modcarve_core::report::{emit_response, render_text, ErrorResponse, RunResponse};
use modcarve_core::store::SourceStore;

// ============================================================================
// CLI Structure
// ============================================================================

/// Carve a monolithic script into explicitly-linked ES modules.
///
/// Every command reads the split plan, transforms the planned files in
/// memory, and commits the result in one pass. Commands are idempotent:
/// re-running any of them on an already-carved workspace is safe.
#[derive(Parser, Debug)]
#[command(name = "carve", version, about = "Split a monolithic script into linked modules")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Split plan file, relative to the workspace root.
    #[arg(long, global = true, default_value = DEFAULT_PLAN_FILE)]
    plan: PathBuf,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Report what would change without writing anything.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
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

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text, one line per action or finding (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: rewrite, assemble, resolve, reconcile, lint.
    Split,
    /// Qualify bare namespace fields and excise their dead declarations.
    Rewrite,
    /// Extract planned symbols into their destination modules.
    Assemble,
    /// Regenerate every module's import header from usage.
    Resolve,
    /// Add imports for used-but-unimported names, preserving existing lines.
    Reconcile,
    /// Report duplicate declarations, duplicate imports, and shadowing.
    Lint {
        /// Lint every .js file under the module directory, not just the
        /// planned outputs.
        #[arg(long)]
        all: bool,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON so callers always get an envelope
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), CarveError> {
    let (store, plan) = open_workspace(&cli.global)?;
    let options = RunOptions {
        dry_run: cli.global.dry_run,
        lint_all: matches!(cli.command, Command::Lint { all: true }),
    };

    let response = match cli.command {
        Command::Split => pipeline::run_split(&store, &plan, options)?,
        Command::Rewrite => pipeline::run_stage(&store, &plan, Stage::Rewrite, options)?,
        Command::Assemble => pipeline::run_stage(&store, &plan, Stage::Assemble, options)?,
        Command::Resolve => pipeline::run_stage(&store, &plan, Stage::Resolve, options)?,
        Command::Reconcile => pipeline::run_stage(&store, &plan, Stage::Reconcile, options)?,
        Command::Lint { .. } => pipeline::run_stage(&store, &plan, Stage::Lint, options)?,
    };

    emit(&response, cli.global.format)
}

/// Resolve the workspace root and load the split plan.
fn open_workspace(global: &GlobalArgs) -> Result<(SourceStore, SplitPlan), CarveError> {
    let root = match &global.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .map_err(|e| CarveError::internal(format!("cannot resolve current directory: {}", e)))?,
    };
    if !root.is_dir() {
        return Err(CarveError::not_found(root.display().to_string()));
    }

    let plan_path = if global.plan.is_absolute() {
        global.plan.clone()
    } else {
        root.join(&global.plan)
    };
    let plan = SplitPlan::load(&plan_path)?;

    Ok((SourceStore::new(root), plan))
}

/// Write the response in the requested format.
fn emit(response: &RunResponse, format: OutputFormat) -> Result<(), CarveError> {
    let result = match format {
        OutputFormat::Json => emit_response(response, &mut io::stdout()),
        OutputFormat::Text => io::stdout().write_all(render_text(response).as_bytes()),
    };
    result.map_err(|e| CarveError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}
