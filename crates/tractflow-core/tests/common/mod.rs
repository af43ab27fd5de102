//! Shared fixtures for integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tractflow_core::{
    ConnectomeToolkit, FodSet, PipelineError, ResponseSet, StageKind, Subject, SubjectLayout,
    Toolkit,
};

/// One recorded toolkit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stage(StageKind),
    CountMatrix,
    WeightedMatrix,
    Render { weighted: bool },
}

/// Toolkit double: writes every declared output and records the call.
#[derive(Default)]
pub struct FakeToolkit {
    calls: RefCell<Vec<Call>>,
    fail_for_subject: Option<String>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails tensor fitting for any DWI under `subject`'s directory.
    pub fn failing_for(subject: &str) -> Self {
        Self {
            fail_for_subject: Some(subject.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn stage_calls(&self) -> Vec<StageKind> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Stage(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    fn touch(&self, call: Call, outputs: &[&Path]) -> Result<(), PipelineError> {
        self.calls.borrow_mut().push(call);
        for path in outputs {
            std::fs::write(path, b"fake").map_err(|e| PipelineError::IoError(e.to_string()))?;
        }
        Ok(())
    }
}

impl Toolkit for FakeToolkit {
    fn fit_tensors(
        &self,
        dwi: &Path,
        _mask: &Path,
        dti: &Path,
        fa: &Path,
    ) -> Result<(), PipelineError> {
        if let Some(id) = &self.fail_for_subject {
            if dwi.components().any(|c| c.as_os_str() == id.as_str()) {
                self.calls
                    .borrow_mut()
                    .push(Call::Stage(StageKind::FractionalAnisotropy));
                return Err(PipelineError::Toolkit {
                    program: "dwi2tensor".to_string(),
                    status: Some(1),
                    stderr: "dwi2tensor: [ERROR] corrupt image".to_string(),
                });
            }
        }
        self.touch(Call::Stage(StageKind::FractionalAnisotropy), &[dti, fa])
    }

    fn estimate_responses(
        &self,
        _dwi: &Path,
        _mask: &Path,
        responses: &ResponseSet,
    ) -> Result<(), PipelineError> {
        let paths: Vec<&Path> = responses.iter().map(|(_, p)| p.as_path()).collect();
        self.touch(Call::Stage(StageKind::TissueResponse), &paths)
    }

    fn fibre_orientation(
        &self,
        _dwi: &Path,
        _mask: &Path,
        responses: &ResponseSet,
        fods: &FodSet,
    ) -> Result<(), PipelineError> {
        // Deconvolution reads every response file.
        for (_, response) in responses.iter() {
            if !response.exists() {
                return Err(PipelineError::MissingInput(response.clone()));
            }
        }
        let paths: Vec<&Path> = fods.iter().map(|(_, p)| p.as_path()).collect();
        self.touch(Call::Stage(StageKind::FibreOrientation), &paths)
    }

    fn generate_tracts(
        &self,
        _fod_wm: &Path,
        _seg_5tt: &Path,
        tractogram: &Path,
        seeds: &Path,
        _streamline_count: u32,
    ) -> Result<(), PipelineError> {
        self.touch(Call::Stage(StageKind::Tractogram), &[tractogram, seeds])
    }

    fn convert_tck_to_trk(
        &self,
        _tck: &Path,
        _reference: &Path,
        trk: &Path,
    ) -> Result<(), PipelineError> {
        self.touch(Call::Stage(StageKind::TrkConversion), &[trk])
    }
}

impl ConnectomeToolkit for FakeToolkit {
    fn count_matrix(
        &self,
        _tractogram: &Path,
        _labels_image: &Path,
        matrix: &Path,
        assignments: &Path,
    ) -> Result<(), PipelineError> {
        self.touch(Call::CountMatrix, &[matrix, assignments])
    }

    fn weighted_matrix(
        &self,
        _tractogram: &Path,
        _labels_image: &Path,
        _metric_image: &Path,
        samples: &Path,
        matrix: &Path,
    ) -> Result<(), PipelineError> {
        self.touch(Call::WeightedMatrix, &[samples, matrix])
    }

    fn render_matrix(
        &self,
        _matrix: &Path,
        _labels: &Path,
        image: &Path,
        weighted: bool,
    ) -> Result<(), PipelineError> {
        self.touch(Call::Render { weighted }, &[image])
    }
}

/// Create a subject directory with every required pipeline input.
pub fn seed_subject(root: &Path, id: &str) -> Subject {
    let subject = Subject::under(root, id);
    let layout = SubjectLayout::resolve(&subject);
    for input in layout.required_inputs() {
        write_file(&input.path);
    }
    subject
}

/// Write an empty file, creating parent directories.
pub fn write_file(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, b"").expect("write");
}

pub fn tractography_dir(root: &Path, id: &str) -> PathBuf {
    root.join(id).join("tractography")
}

// =============================================================================
// LOG CAPTURE
// =============================================================================

/// In-memory log sink shared between a test and its subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

/// Run `f` with every `info`-level event written to the returned buffer.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
