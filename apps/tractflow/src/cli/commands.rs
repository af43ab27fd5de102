//! # CLI Command Implementations
//!
//! Configuration loading plus one `cmd_*` function per subcommand.

use super::Cli;
use serde::Serialize;
use std::path::Path;
use tractflow_core::{
    BatchConfig, BatchDriver, FailurePolicy, Mrtrix3, PipelineError, SubjectPlan, SubjectReport,
    batch::SubjectFailure, connectivity::ConnectivityReport,
};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), PipelineError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        PipelineError::Config(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    if metadata.len() > max_size {
        return Err(PipelineError::Config(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Read a batch configuration from a TOML file.
///
/// Missing keys take their defaults; unknown keys are rejected.
pub fn load_config(path: &Path) -> Result<BatchConfig, PipelineError> {
    validate_file_size(path, MAX_CONFIG_FILE_SIZE)?;

    let text = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Config(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    toml::from_str(&text)
        .map_err(|e| PipelineError::Config(format!("Invalid config '{}': {}", path.display(), e)))
}

/// Apply command-line flags on top of a loaded configuration.
pub fn apply_overrides(config: &mut BatchConfig, cli: &Cli) {
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if !cli.subjects.is_empty() {
        config.subjects = Some(cli.subjects.clone());
    }
    if cli.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }
}

/// The configuration file (or defaults) with command-line overrides applied.
pub fn resolve_config(cli: &Cli) -> Result<BatchConfig, PipelineError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BatchConfig::default(),
    };
    apply_overrides(&mut config, cli);

    if !config.root.is_dir() {
        return Err(PipelineError::Config(format!(
            "Study root '{}' is not a directory",
            config.root.display()
        )));
    }

    tracing::debug!("Batch configuration: {:?}", config);
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn print_failures(failed: &[SubjectFailure]) {
    if failed.is_empty() {
        return;
    }
    println!();
    println!("Failed subjects:");
    for failure in failed {
        println!("  {}: {}", failure.subject, failure.error);
    }
}

// =============================================================================
// RUN COMMAND
// =============================================================================

fn print_subject_report(report: &SubjectReport) {
    println!("{}", report.subject);
    for stage in &report.stages {
        println!("  {}", stage.to_string().replace('\n', "\n  "));
    }
    println!(
        "  {} stages computed, {} cached, {:.2} minutes",
        report.computed_count(),
        report.stages.len() - report.computed_count(),
        report.elapsed_minutes()
    );
    println!("  trk: {}", report.outputs.trk.display());
    println!();
}

/// Run whole-brain tractography for the batch.
pub fn cmd_run(config: BatchConfig, json_mode: bool) -> Result<(), PipelineError> {
    let toolkit = Mrtrix3::new(config.toolkit.clone());
    let driver = BatchDriver::new(config);
    let report = driver.run(&toolkit)?;

    if json_mode {
        print_json(&report);
    } else {
        for subject in &report.completed {
            print_subject_report(subject);
        }
        print_failures(&report.failed);
    }

    report.ensure_success()
}

// =============================================================================
// CONNECTIVITY COMMAND
// =============================================================================

fn print_connectivity_report(report: &ConnectivityReport) {
    println!(
        "{}: {} regions, {} ({} ms)",
        report.subject,
        report.labels.len(),
        if report.weighted {
            "count + weighted"
        } else {
            "count only"
        },
        report.elapsed_ms
    );
    for artifact in &report.artifacts {
        println!("  {:<16} {}", artifact.name, artifact.path.display());
    }
}

/// Build connectivity matrices for the batch.
pub fn cmd_connectivity(config: BatchConfig, json_mode: bool) -> Result<(), PipelineError> {
    let toolkit = Mrtrix3::new(config.toolkit.clone());
    let driver = BatchDriver::new(config);
    let report = driver.run_connectivity(&toolkit)?;

    if json_mode {
        print_json(&report);
    } else {
        for subject in &report.completed {
            print_connectivity_report(subject);
        }
        print_failures(&report.failed);
    }

    report.ensure_success()
}

// =============================================================================
// SUBJECTS COMMAND
// =============================================================================

/// List the subjects the batch would process, in processing order.
pub fn cmd_subjects(config: BatchConfig, json_mode: bool) -> Result<(), PipelineError> {
    let subjects = BatchDriver::new(config).subjects()?;

    if json_mode {
        print_json(&subjects);
        return Ok(());
    }

    for subject in &subjects {
        println!("{}  {}", subject.id, subject.root.display());
    }
    println!("{} subjects", subjects.len());
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

fn print_plan(plan: &SubjectPlan) {
    let done = plan.stages.iter().filter(|s| s.cached).count();
    println!(
        "{} ({}/{} stages cached{})",
        plan.subject,
        done,
        plan.stages.len(),
        if plan.inputs_present {
            ""
        } else {
            ", inputs missing"
        }
    );
    for stage in &plan.stages {
        println!(
            "  [{}] {}",
            if stage.cached { "x" } else { " " },
            stage.stage
        );
    }
}

/// Show which stages of each subject are already on disk.
pub fn cmd_status(config: BatchConfig, json_mode: bool) -> Result<(), PipelineError> {
    let plans = BatchDriver::new(config).plan()?;

    if json_mode {
        print_json(&plans);
        return Ok(());
    }

    for plan in &plans {
        print_plan(plan);
    }
    Ok(())
}
