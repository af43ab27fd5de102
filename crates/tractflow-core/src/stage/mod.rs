//! # Stage Module
//!
//! One pipeline step wrapped in the same two-state contract:
//!
//! | State | Entered when | Effect |
//! |-------|--------------|--------|
//! | CACHED | every declared output exists | toolkit is never called |
//! | COMPUTE | any declared output is missing | toolkit is called once |
//!
//! Both states end with the declared outputs available and the same
//! declared result returned to the caller. A stage only re-enters COMPUTE
//! after one of its outputs is deleted by hand.
//!
//! Constructing a stage creates its output directory. Construction never
//! touches the toolkit.

mod convert;
mod fa;
mod fod;
mod response;
mod tractogram;

pub use convert::TrkConversion;
pub use fa::FractionalAnisotropy;
pub use fod::FibreOrientation;
pub use response::TissueResponse;
pub use tractogram::Tractogram;

use crate::existence::all_exist;
use crate::toolkit::Toolkit;
use crate::types::{Artifact, TissueSet};
use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

// =============================================================================
// STAGE KIND
// =============================================================================

/// The steps of the per-subject pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    FractionalAnisotropy,
    TissueResponse,
    FibreOrientation,
    Tractogram,
    TrkConversion,
}

impl StageKind {
    /// Every stage, in pipeline order.
    pub const ALL: [StageKind; 5] = [
        StageKind::FractionalAnisotropy,
        StageKind::TissueResponse,
        StageKind::FibreOrientation,
        StageKind::Tractogram,
        StageKind::TrkConversion,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::FractionalAnisotropy => "Fractional anisotropy",
            StageKind::TissueResponse => "Tissue response functions",
            StageKind::FibreOrientation => "Fibre orientation distributions",
            StageKind::Tractogram => "Whole-brain tractogram",
            StageKind::TrkConversion => "tck to trk conversion",
        }
    }

    /// Logged right before the toolkit is called.
    #[must_use]
    pub fn computing_notice(&self) -> &'static str {
        match self {
            StageKind::FractionalAnisotropy => "Generating FA image from the diffusion tensor fit",
            StageKind::TissueResponse => {
                "Estimating tissue response functions for spherical deconvolution"
            }
            StageKind::FibreOrientation => "Estimating fibre orientation distributions",
            StageKind::Tractogram => "Generating tractogram with the iFOD2 algorithm",
            StageKind::TrkConversion => "Converting tractogram from .tck to .trk",
        }
    }

    /// Logged instead of computing when every output already exists.
    #[must_use]
    pub fn cached_notice(&self) -> &'static str {
        match self {
            StageKind::FractionalAnisotropy => "FA image already generated, continuing",
            StageKind::TissueResponse => "Tissue response functions already estimated, continuing",
            StageKind::FibreOrientation => {
                "Fibre orientation distributions already estimated, continuing"
            }
            StageKind::Tractogram => {
                "Tractogram already generated; remove the existing .tck file to recreate it"
            }
            StageKind::TrkConversion => ".trk tractogram already exists, continuing",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// STAGE OUTPUT
// =============================================================================

/// The declared result of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    /// One artifact path.
    Single(PathBuf),
    /// One artifact path per tissue.
    Tissues(TissueSet<PathBuf>),
}

impl From<PathBuf> for StageOutput {
    fn from(path: PathBuf) -> Self {
        StageOutput::Single(path)
    }
}

impl From<TissueSet<PathBuf>> for StageOutput {
    fn from(set: TissueSet<PathBuf>) -> Self {
        StageOutput::Tissues(set)
    }
}

// =============================================================================
// STAGE TRAIT
// =============================================================================

/// A pipeline step with declared inputs, outputs and a delegated computation.
pub trait Stage {
    /// Result forwarded to the next stage.
    type Output: Clone + Into<StageOutput>;

    fn kind(&self) -> StageKind;

    /// Inputs, for reporting.
    fn inputs(&self) -> Vec<Artifact>;

    /// Every path that must exist for the stage to count as done.
    fn outputs(&self) -> Vec<Artifact>;

    /// The declared result. Identical whether or not computation ran.
    fn output(&self) -> Self::Output;

    /// Produce the outputs through the toolkit.
    fn compute(&self, toolkit: &dyn Toolkit) -> Result<(), PipelineError>;
}

/// Whether every declared output of `stage` exists right now.
pub fn is_cached<S: Stage>(stage: &S) -> bool {
    let paths: Vec<PathBuf> = stage.outputs().into_iter().map(|a| a.path).collect();
    all_exist(&paths)
}

// =============================================================================
// STATUS
// =============================================================================

/// What happened when a stage ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatus {
    pub stage: StageKind,
    pub inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,
    /// `true` when the toolkit was not called.
    pub cache_hit: bool,
    pub result: StageOutput,
    pub elapsed_ms: u64,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.cache_hit { "cached" } else { "computed" };
        writeln!(f, "[{}] {} ({} ms)", state, self.stage, self.elapsed_ms)?;
        writeln!(f, "    inputs:  {}", file_names(&self.inputs))?;
        write!(f, "    outputs: {}", file_names(&self.outputs))
    }
}

fn file_names(artifacts: &[Artifact]) -> String {
    artifacts
        .iter()
        .map(Artifact::file_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of [`run_stage`]: the forwarded output plus its status record.
#[derive(Debug, Clone)]
pub struct StageRun<T> {
    pub output: T,
    pub status: StageStatus,
}

/// Existence of a stage's outputs, without running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub stage: StageKind,
    pub outputs: Vec<Artifact>,
    pub cached: bool,
}

impl StagePlan {
    pub fn of<S: Stage>(stage: &S) -> Self {
        Self {
            stage: stage.kind(),
            outputs: stage.outputs(),
            cached: is_cached(stage),
        }
    }
}

// =============================================================================
// RUN
// =============================================================================

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
pub(crate) fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Run one stage through its CACHED / COMPUTE transition.
///
/// On a cache hit the toolkit is not called and inputs are not looked at.
/// Otherwise every input must exist, the toolkit is called once and every
/// declared output must exist afterwards; partial outputs are left in place
/// on failure.
pub fn run_stage<S: Stage>(
    stage: &S,
    toolkit: &dyn Toolkit,
) -> Result<StageRun<S::Output>, PipelineError> {
    let started = Instant::now();
    let kind = stage.kind();
    let outputs = stage.outputs();
    let cache_hit = is_cached(stage);

    if cache_hit {
        tracing::info!(stage = kind.name(), "{}", kind.cached_notice());
    } else {
        if let Some(missing) = stage.inputs().into_iter().find(|a| !a.exists()) {
            return Err(PipelineError::MissingInput(missing.path));
        }
        tracing::info!(stage = kind.name(), "{}", kind.computing_notice());
        stage.compute(toolkit)?;

        let missing: Vec<PathBuf> = outputs
            .iter()
            .filter(|a| !a.exists())
            .map(|a| a.path.clone())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::OutputsMissing {
                stage: kind.name().to_string(),
                paths: missing,
            });
        }
    }

    let output = stage.output();
    let status = StageStatus {
        stage: kind,
        inputs: stage.inputs(),
        outputs,
        cache_hit,
        result: output.clone().into(),
        elapsed_ms: millis(started.elapsed()),
    };

    Ok(StageRun { output, status })
}
