//! # Per-Subject Pipeline Runner
//!
//! Runs the tractography stages of one subject strictly in sequence:
//!
//! ```text
//! FA → tissue responses → FODs → tractogram (.tck) → .trk
//! ```
//!
//! Each stage's declared result is the next stage's input. Raw inputs are
//! only required by stages that compute, so a finished subject whose inputs
//! were archived still runs fully cached. The first error stops the subject;
//! nothing after the failing stage runs.

use crate::layout::SubjectLayout;
use crate::primitives::DEFAULT_STREAMLINE_COUNT;
use crate::stage::{
    FibreOrientation, FractionalAnisotropy, Stage, StagePlan, StageRun, StageStatus,
    TissueResponse, Tractogram, TrkConversion, run_stage,
};
use crate::toolkit::Toolkit;
use crate::types::{FodSet, ResponseSet, Subject};
use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

// =============================================================================
// REPORTS
// =============================================================================

/// Final artifacts of a subject's tractography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TractographyOutputs {
    pub fa: PathBuf,
    pub responses: ResponseSet,
    pub fods: FodSet,
    pub tck: PathBuf,
    pub trk: PathBuf,
}

/// Outcome of one subject's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectReport {
    pub subject: String,
    pub outputs: TractographyOutputs,
    /// One entry per stage, in execution order.
    pub stages: Vec<StageStatus>,
    pub elapsed: Duration,
}

impl SubjectReport {
    /// Wall-clock duration of the whole run, in minutes.
    #[must_use]
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }

    /// Number of stages that called the toolkit.
    #[must_use]
    pub fn computed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.cache_hit).count()
    }

    #[must_use]
    pub fn fully_cached(&self) -> bool {
        self.computed_count() == 0
    }
}

/// Per-stage existence report of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPlan {
    pub subject: String,
    pub inputs_present: bool,
    pub stages: Vec<StagePlan>,
}

// =============================================================================
// RUNNER
// =============================================================================

fn record<T>(stages: &mut Vec<StageStatus>, run: StageRun<T>) -> T {
    stages.push(run.status);
    run.output
}

/// Run the whole tractography pipeline for one subject.
pub fn run_subject(subject: &Subject, toolkit: &dyn Toolkit) -> Result<SubjectReport, PipelineError> {
    let started = Instant::now();
    let layout = SubjectLayout::resolve(subject);

    tracing::info!(
        subject = %subject.id,
        "Initializing tracts processing for {} (inputs from {}, outputs in {})",
        subject.id,
        subject.root.display(),
        layout.output_dir.display()
    );

    let dir = layout.output_dir.as_path();
    let mut stages = Vec::with_capacity(5);

    let fa = record(
        &mut stages,
        run_stage(&FractionalAnisotropy::new(&layout.dwi, &layout.mask, dir)?, toolkit)?,
    );

    let responses = record(
        &mut stages,
        run_stage(&TissueResponse::new(&layout.dwi, &layout.mask, dir)?, toolkit)?,
    );

    let fods = record(
        &mut stages,
        run_stage(
            &FibreOrientation::new(&layout.dwi, &layout.mask, responses.clone(), dir)?,
            toolkit,
        )?,
    );

    let tck = record(
        &mut stages,
        run_stage(
            &Tractogram::new(&fods, &layout.seg_5tt, dir, DEFAULT_STREAMLINE_COUNT)?,
            toolkit,
        )?,
    );

    let trk = record(
        &mut stages,
        run_stage(&TrkConversion::new(&tck, &layout.dwi_nii)?, toolkit)?,
    );

    let report = SubjectReport {
        subject: subject.id.clone(),
        outputs: TractographyOutputs {
            fa,
            responses,
            fods,
            tck,
            trk,
        },
        stages,
        elapsed: started.elapsed(),
    };

    tracing::info!(
        subject = %subject.id,
        "{}'s whole-brain tractography took {:.2} minutes",
        subject.id,
        report.elapsed_minutes()
    );

    Ok(report)
}

/// Report which stages of `subject` are already done, without computing.
///
/// Stage construction still creates the output directory.
pub fn plan_subject(subject: &Subject) -> Result<SubjectPlan, PipelineError> {
    let layout = SubjectLayout::resolve(subject);
    let dir = layout.output_dir.as_path();

    let fa = FractionalAnisotropy::new(&layout.dwi, &layout.mask, dir)?;
    let response = TissueResponse::new(&layout.dwi, &layout.mask, dir)?;
    let fod = FibreOrientation::new(&layout.dwi, &layout.mask, response.output(), dir)?;
    let tract = Tractogram::new(&fod.output(), &layout.seg_5tt, dir, DEFAULT_STREAMLINE_COUNT)?;
    let convert = TrkConversion::new(tract.output(), &layout.dwi_nii)?;

    Ok(SubjectPlan {
        subject: subject.id.clone(),
        inputs_present: layout.check_inputs().is_ok(),
        stages: vec![
            StagePlan::of(&fa),
            StagePlan::of(&response),
            StagePlan::of(&fod),
            StagePlan::of(&tract),
            StagePlan::of(&convert),
        ],
    })
}
