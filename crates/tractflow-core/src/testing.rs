//! In-crate toolkit double for unit tests.

use crate::PipelineError;
use crate::stage::StageKind;
use crate::toolkit::Toolkit;
use crate::types::{FodSet, ResponseSet};
use std::cell::RefCell;
use std::path::Path;

/// Writes every declared output and records which stage asked for it.
#[derive(Default)]
pub struct RecordingToolkit {
    calls: RefCell<Vec<StageKind>>,
    fail_at: Option<StageKind>,
    skip_writes_at: Option<StageKind>,
}

impl RecordingToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(kind: StageKind) -> Self {
        Self {
            fail_at: Some(kind),
            ..Self::default()
        }
    }

    pub fn not_writing_at(kind: StageKind) -> Self {
        Self {
            skip_writes_at: Some(kind),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StageKind> {
        self.calls.borrow().clone()
    }

    fn record(&self, kind: StageKind, outputs: &[&Path]) -> Result<(), PipelineError> {
        self.calls.borrow_mut().push(kind);
        if self.fail_at == Some(kind) {
            return Err(PipelineError::Toolkit {
                program: "fake".to_string(),
                status: Some(1),
                stderr: format!("{} failed", kind),
            });
        }
        if self.skip_writes_at == Some(kind) {
            return Ok(());
        }
        for path in outputs {
            std::fs::write(path, kind.name())
                .map_err(|e| PipelineError::IoError(e.to_string()))?;
        }
        Ok(())
    }
}

impl Toolkit for RecordingToolkit {
    fn fit_tensors(&self, _: &Path, _: &Path, dti: &Path, fa: &Path) -> Result<(), PipelineError> {
        self.record(StageKind::FractionalAnisotropy, &[dti, fa])
    }

    fn estimate_responses(
        &self,
        _: &Path,
        _: &Path,
        responses: &ResponseSet,
    ) -> Result<(), PipelineError> {
        let paths: Vec<&Path> = responses.iter().map(|(_, p)| p.as_path()).collect();
        self.record(StageKind::TissueResponse, &paths)
    }

    fn fibre_orientation(
        &self,
        _: &Path,
        _: &Path,
        _: &ResponseSet,
        fods: &FodSet,
    ) -> Result<(), PipelineError> {
        let paths: Vec<&Path> = fods.iter().map(|(_, p)| p.as_path()).collect();
        self.record(StageKind::FibreOrientation, &paths)
    }

    fn generate_tracts(
        &self,
        _: &Path,
        _: &Path,
        tractogram: &Path,
        seeds: &Path,
        _: u32,
    ) -> Result<(), PipelineError> {
        self.record(StageKind::Tractogram, &[tractogram, seeds])
    }

    fn convert_tck_to_trk(&self, _: &Path, _: &Path, trk: &Path) -> Result<(), PipelineError> {
        self.record(StageKind::TrkConversion, &[trk])
    }
}
