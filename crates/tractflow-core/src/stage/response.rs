//! Tissue response function estimation.

use super::{Stage, StageKind};
use crate::existence::ensure_dir;
use crate::primitives::response_file_name;
use crate::toolkit::Toolkit;
use crate::types::{Artifact, ResponseSet, tissue_artifacts};
use crate::PipelineError;
use std::path::{Path, PathBuf};

/// Produces `response_{wm,gm,csf}.txt` for multi-tissue deconvolution.
#[derive(Debug, Clone)]
pub struct TissueResponse {
    dwi: PathBuf,
    mask: PathBuf,
    responses: ResponseSet,
}

impl TissueResponse {
    pub fn new(
        dwi: impl Into<PathBuf>,
        mask: impl Into<PathBuf>,
        output_dir: &Path,
    ) -> Result<Self, PipelineError> {
        ensure_dir(output_dir)?;
        Ok(Self {
            dwi: dwi.into(),
            mask: mask.into(),
            responses: ResponseSet::in_dir(output_dir, response_file_name),
        })
    }
}

impl Stage for TissueResponse {
    type Output = ResponseSet;

    fn kind(&self) -> StageKind {
        StageKind::TissueResponse
    }

    fn inputs(&self) -> Vec<Artifact> {
        vec![
            Artifact::new("dwi", self.dwi.clone()),
            Artifact::new("mask", self.mask.clone()),
        ]
    }

    fn outputs(&self) -> Vec<Artifact> {
        tissue_artifacts("response", &self.responses)
    }

    fn output(&self) -> ResponseSet {
        self.responses.clone()
    }

    fn compute(&self, toolkit: &dyn Toolkit) -> Result<(), PipelineError> {
        toolkit.estimate_responses(&self.dwi, &self.mask, &self.responses)
    }
}
