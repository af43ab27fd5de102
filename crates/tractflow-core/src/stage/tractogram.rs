//! Whole-brain anatomically constrained tractography.

use super::{Stage, StageKind};
use crate::existence::ensure_dir;
use crate::primitives::{SEEDS_FILE, TRACTOGRAM_FILE};
use crate::toolkit::Toolkit;
use crate::types::{Artifact, FodSet};
use crate::PipelineError;
use std::path::{Path, PathBuf};

/// Produces `tractogram.tck` from the white-matter FOD and the 5TT image.
///
/// The seeds file is a side product and does not take part in the cache
/// check: deleting it does not trigger a rerun.
#[derive(Debug, Clone)]
pub struct Tractogram {
    fod_wm: PathBuf,
    seg_5tt: PathBuf,
    tractogram: PathBuf,
    seeds: PathBuf,
    streamline_count: u32,
}

impl Tractogram {
    pub fn new(
        fods: &FodSet,
        seg_5tt: impl Into<PathBuf>,
        output_dir: &Path,
        streamline_count: u32,
    ) -> Result<Self, PipelineError> {
        ensure_dir(output_dir)?;
        Ok(Self {
            fod_wm: fods.white_matter.clone(),
            seg_5tt: seg_5tt.into(),
            tractogram: output_dir.join(TRACTOGRAM_FILE),
            seeds: output_dir.join(SEEDS_FILE),
            streamline_count,
        })
    }

    #[must_use]
    pub fn streamline_count(&self) -> u32 {
        self.streamline_count
    }
}

impl Stage for Tractogram {
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Tractogram
    }

    fn inputs(&self) -> Vec<Artifact> {
        vec![
            Artifact::new("fod_wm", self.fod_wm.clone()),
            Artifact::new("5tt", self.seg_5tt.clone()),
        ]
    }

    fn outputs(&self) -> Vec<Artifact> {
        vec![Artifact::new("tractogram", self.tractogram.clone())]
    }

    fn output(&self) -> PathBuf {
        self.tractogram.clone()
    }

    fn compute(&self, toolkit: &dyn Toolkit) -> Result<(), PipelineError> {
        toolkit.generate_tracts(
            &self.fod_wm,
            &self.seg_5tt,
            &self.tractogram,
            &self.seeds,
            self.streamline_count,
        )?;
        tracing::info!(
            "Generated {} at {}",
            TRACTOGRAM_FILE,
            self.tractogram
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
        Ok(())
    }
}
