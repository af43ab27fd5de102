//! Fibre orientation distributions by multi-tissue deconvolution.

use super::{Stage, StageKind};
use crate::existence::ensure_dir;
use crate::primitives::fod_file_name;
use crate::toolkit::Toolkit;
use crate::types::{Artifact, FodSet, ResponseSet, tissue_artifacts};
use crate::PipelineError;
use std::path::{Path, PathBuf};

/// Produces `FOD_{wm,gm,csf}.mif`.
///
/// Takes the complete response set as input, so it can only be built from
/// the output of [`TissueResponse`](super::TissueResponse).
#[derive(Debug, Clone)]
pub struct FibreOrientation {
    dwi: PathBuf,
    mask: PathBuf,
    responses: ResponseSet,
    fods: FodSet,
}

impl FibreOrientation {
    pub fn new(
        dwi: impl Into<PathBuf>,
        mask: impl Into<PathBuf>,
        responses: ResponseSet,
        output_dir: &Path,
    ) -> Result<Self, PipelineError> {
        ensure_dir(output_dir)?;
        Ok(Self {
            dwi: dwi.into(),
            mask: mask.into(),
            responses,
            fods: FodSet::in_dir(output_dir, fod_file_name),
        })
    }
}

impl Stage for FibreOrientation {
    type Output = FodSet;

    fn kind(&self) -> StageKind {
        StageKind::FibreOrientation
    }

    fn inputs(&self) -> Vec<Artifact> {
        let mut inputs = vec![
            Artifact::new("dwi", self.dwi.clone()),
            Artifact::new("mask", self.mask.clone()),
        ];
        inputs.extend(tissue_artifacts("response", &self.responses));
        inputs
    }

    fn outputs(&self) -> Vec<Artifact> {
        tissue_artifacts("fod", &self.fods)
    }

    fn output(&self) -> FodSet {
        self.fods.clone()
    }

    fn compute(&self, toolkit: &dyn Toolkit) -> Result<(), PipelineError> {
        toolkit.fibre_orientation(&self.dwi, &self.mask, &self.responses, &self.fods)
    }
}
