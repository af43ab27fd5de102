//! Tensor fit and fractional anisotropy map.

use super::{Stage, StageKind};
use crate::existence::ensure_dir;
use crate::primitives::{DTI_FILE, FA_FILE};
use crate::toolkit::Toolkit;
use crate::types::Artifact;
use crate::PipelineError;
use std::path::{Path, PathBuf};

/// Produces `dti.mif` and `fa.mif` from the preprocessed DWI and brain mask.
/// Forwards the FA map.
#[derive(Debug, Clone)]
pub struct FractionalAnisotropy {
    dwi: PathBuf,
    mask: PathBuf,
    dti: PathBuf,
    fa: PathBuf,
}

impl FractionalAnisotropy {
    pub fn new(
        dwi: impl Into<PathBuf>,
        mask: impl Into<PathBuf>,
        output_dir: &Path,
    ) -> Result<Self, PipelineError> {
        ensure_dir(output_dir)?;
        Ok(Self {
            dwi: dwi.into(),
            mask: mask.into(),
            dti: output_dir.join(DTI_FILE),
            fa: output_dir.join(FA_FILE),
        })
    }

    #[must_use]
    pub fn dti(&self) -> &Path {
        &self.dti
    }
}

impl Stage for FractionalAnisotropy {
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::FractionalAnisotropy
    }

    fn inputs(&self) -> Vec<Artifact> {
        vec![
            Artifact::new("dwi", self.dwi.clone()),
            Artifact::new("mask", self.mask.clone()),
        ]
    }

    fn outputs(&self) -> Vec<Artifact> {
        vec![
            Artifact::new("fa", self.fa.clone()),
            Artifact::new("dti", self.dti.clone()),
        ]
    }

    fn output(&self) -> PathBuf {
        self.fa.clone()
    }

    fn compute(&self, toolkit: &dyn Toolkit) -> Result<(), PipelineError> {
        toolkit.fit_tensors(&self.dwi, &self.mask, &self.dti, &self.fa)
    }
}
