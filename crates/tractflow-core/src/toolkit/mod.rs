//! # Toolkit Module
//!
//! The seam between the controller and the external computations.
//!
//! Every numerical step (tensor fitting, deconvolution, tractography,
//! connectome construction, rendering) is an opaque call with declared input
//! and output paths. A call signals success by returning `Ok(())`; the stage
//! then checks that the declared outputs exist. Failure is any `Err`, carrying
//! the tool's own message.
//!
//! Calls are blocking. No timeouts, no retries, no cancellation.

mod mrtrix;
mod process;

pub use mrtrix::Mrtrix3;
pub use process::{command_line, run_command};

use crate::PipelineError;
use crate::types::{FodSet, ResponseSet};
use std::path::Path;

/// External computations of the whole-brain tractography pipeline.
pub trait Toolkit {
    /// Fit diffusion tensors and derive the FA map.
    fn fit_tensors(&self, dwi: &Path, mask: &Path, dti: &Path, fa: &Path)
    -> Result<(), PipelineError>;

    /// Estimate white matter, grey matter and CSF response functions.
    fn estimate_responses(
        &self,
        dwi: &Path,
        mask: &Path,
        responses: &ResponseSet,
    ) -> Result<(), PipelineError>;

    /// Multi-tissue constrained spherical deconvolution.
    fn fibre_orientation(
        &self,
        dwi: &Path,
        mask: &Path,
        responses: &ResponseSet,
        fods: &FodSet,
    ) -> Result<(), PipelineError>;

    /// Anatomically constrained whole-brain tractography.
    fn generate_tracts(
        &self,
        fod_wm: &Path,
        seg_5tt: &Path,
        tractogram: &Path,
        seeds: &Path,
        streamline_count: u32,
    ) -> Result<(), PipelineError>;

    /// Rewrite a `.tck` tractogram as `.trk` using `reference` for the header.
    fn convert_tck_to_trk(&self, tck: &Path, reference: &Path, trk: &Path)
    -> Result<(), PipelineError>;
}

/// External computations of the connectivity builder.
pub trait ConnectomeToolkit {
    /// Assign streamline endpoints to atlas regions and count streamlines per
    /// region pair. Writes the matrix and the per-streamline assignments.
    fn count_matrix(
        &self,
        tractogram: &Path,
        labels_image: &Path,
        matrix: &Path,
        assignments: &Path,
    ) -> Result<(), PipelineError>;

    /// Sample `metric_image` along every streamline and aggregate the
    /// per-streamline values over each region pair.
    fn weighted_matrix(
        &self,
        tractogram: &Path,
        labels_image: &Path,
        metric_image: &Path,
        samples: &Path,
        matrix: &Path,
    ) -> Result<(), PipelineError>;

    /// Draw a matrix with region-label axis annotations.
    fn render_matrix(
        &self,
        matrix: &Path,
        labels: &Path,
        image: &Path,
        weighted: bool,
    ) -> Result<(), PipelineError>;
}
