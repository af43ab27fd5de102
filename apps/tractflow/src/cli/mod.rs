//! # tractflow CLI Module
//!
//! ## Available Commands
//!
//! - `run` - Whole-brain tractography for every subject (default)
//! - `connectivity` - Count and weighted connectivity matrices
//! - `subjects` - List the subjects a batch would process
//! - `status` - Show which stages are already cached. Creates each
//!   subject's `tractography/` directory if absent, as stage construction
//!   always does.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tractflow_core::PipelineError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tractflow - batch whole-brain tractography
///
/// Runs MRtrix3 over every subject of a study. Stages whose outputs already
/// exist are skipped, so an interrupted batch resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "tractflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Study root containing one directory per subject
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Process only this subject (repeatable)
    #[arg(short, long = "subject", global = true)]
    pub subjects: Vec<String>,

    /// Record failing subjects and keep going instead of stopping
    #[arg(long, global = true)]
    pub continue_on_error: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run whole-brain tractography
    Run,

    /// Build connectivity matrices from finished tractograms
    Connectivity,

    /// List the subjects of the batch
    Subjects,

    /// Show per-stage cache state without computing anything (creates missing tractography/ directories)
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), PipelineError> {
    let config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config, json_mode),
        Commands::Connectivity => cmd_connectivity(config, json_mode),
        Commands::Subjects => cmd_subjects(config, json_mode),
        Commands::Status => cmd_status(config, json_mode),
    }
}
