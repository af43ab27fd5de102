//! tck → trk conversion.

use super::{Stage, StageKind};
use crate::existence::ensure_dir;
use crate::primitives::TRK_EXTENSION;
use crate::toolkit::Toolkit;
use crate::types::Artifact;
use crate::PipelineError;
use std::path::{Path, PathBuf};

/// Produces `<stem>.trk` next to the `.tck` input, using the DWI NIfTI as
/// the spatial reference.
#[derive(Debug, Clone)]
pub struct TrkConversion {
    tck: PathBuf,
    reference: PathBuf,
    trk: PathBuf,
}

impl TrkConversion {
    pub fn new(tck: impl Into<PathBuf>, reference: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let tck = tck.into();
        if let Some(dir) = tck.parent().filter(|d| !d.as_os_str().is_empty()) {
            ensure_dir(dir)?;
        }
        Ok(Self {
            trk: trk_path(&tck),
            tck,
            reference: reference.into(),
        })
    }
}

/// `<dir>/<stem>.trk` for `<dir>/<stem>.tck`.
pub fn trk_path(tck: &Path) -> PathBuf {
    tck.with_extension(TRK_EXTENSION)
}

impl Stage for TrkConversion {
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::TrkConversion
    }

    fn inputs(&self) -> Vec<Artifact> {
        vec![
            Artifact::new("tractogram", self.tck.clone()),
            Artifact::new("reference", self.reference.clone()),
        ]
    }

    fn outputs(&self) -> Vec<Artifact> {
        vec![Artifact::new("tractogram_trk", self.trk.clone())]
    }

    fn output(&self) -> PathBuf {
        self.trk.clone()
    }

    fn compute(&self, toolkit: &dyn Toolkit) -> Result<(), PipelineError> {
        toolkit.convert_tck_to_trk(&self.tck, &self.reference, &self.trk)
    }
}
