//! # tractflow-core
//!
//! The idempotent stage controller for whole-brain tractography - THE CONTROLLER.
//!
//! Given preprocessed diffusion data for a set of subjects, this crate drives
//! an external toolkit (MRtrix3 by default) through:
//!
//! ```text
//! FA → tissue responses → FODs → tractogram (.tck) → .trk
//! ```
//!
//! and, as a separate pass, connectivity matrix construction.
//!
//! ## What Lives Here
//!
//! - Path bookkeeping for every subject and stage (`layout`, `primitives`)
//! - The existence gate that skips finished stages (`existence`, `stage`)
//! - Sequencing per subject and per batch (`pipeline`, `batch`)
//!
//! ## What Does Not
//!
//! Every numerical step is an opaque call through the [`Toolkit`] and
//! [`ConnectomeToolkit`] traits. Nothing here reads images or streamlines.
//!
//! ## Architectural Constraints
//!
//! - Sequential: one subject at a time, one stage at a time
//! - No async, no network dependencies
//! - An artifact that exists on disk is final (no content verification)

// =============================================================================
// MODULES
// =============================================================================

pub mod batch;
pub mod config;
pub mod connectivity;
pub mod discovery;
pub mod existence;
pub mod layout;
pub mod pipeline;
pub mod primitives;
pub mod stage;
pub mod toolkit;
pub mod types;

#[cfg(test)]
mod testing;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Artifact, ArtifactFormat, FodSet, PipelineError, ResponseSet, Subject, Tissue, TissueSet,
};

// =============================================================================
// RE-EXPORTS: Stages & Pipelines
// =============================================================================

pub use batch::{BatchDriver, BatchReport, FailurePolicy, SubjectFailure};
pub use config::{BatchConfig, ConnectivityConfig, ToolkitConfig};
pub use connectivity::{
    ConnectivityBuilder, ConnectivityInputs, ConnectivityReport, RegionLabel, read_label_index,
};
pub use discovery::{discover_subjects, resolve_subjects};
pub use existence::{all_exist, ensure_dir};
pub use layout::SubjectLayout;
pub use pipeline::{SubjectPlan, SubjectReport, TractographyOutputs, plan_subject, run_subject};
pub use stage::{Stage, StageKind, StageOutput, StagePlan, StageStatus, run_stage};

// =============================================================================
// RE-EXPORTS: Toolkit
// =============================================================================

pub use toolkit::{ConnectomeToolkit, Mrtrix3, Toolkit};
