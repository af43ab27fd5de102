//! # Core Type Definitions
//!
//! This module contains the data model shared by every stage:
//! - Tissue tags and the fixed-field [`TissueSet`] record
//! - Output artifacts (`Artifact`, `ArtifactFormat`)
//! - Work items (`Subject`)
//! - Error types (`PipelineError`)
//!
//! ## Immutability
//!
//! An artifact is written by exactly one stage and never mutated afterwards.
//! A stage that finds its artifact on disk treats it as final.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// TISSUES
// =============================================================================

/// Tissue compartment of a multi-tissue response or FOD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tissue {
    WhiteMatter,
    GreyMatter,
    Csf,
}

impl Tissue {
    /// Every tissue, in file-naming order.
    pub const ALL: [Tissue; 3] = [Tissue::WhiteMatter, Tissue::GreyMatter, Tissue::Csf];

    /// Short tag used in artifact file names.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Tissue::WhiteMatter => "wm",
            Tissue::GreyMatter => "gm",
            Tissue::Csf => "csf",
        }
    }
}

impl std::fmt::Display for Tissue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One value per tissue compartment.
///
/// All three fields always exist, so a response or FOD set can never be
/// handed to a downstream stage with a compartment missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TissueSet<T> {
    pub white_matter: T,
    pub grey_matter: T,
    pub csf: T,
}

/// Response function files keyed by tissue.
pub type ResponseSet = TissueSet<PathBuf>;

/// Fibre orientation distribution images keyed by tissue.
pub type FodSet = TissueSet<PathBuf>;

impl<T> TissueSet<T> {
    /// Build a set by evaluating `f` once per tissue, in [`Tissue::ALL`] order.
    pub fn from_fn(mut f: impl FnMut(Tissue) -> T) -> Self {
        Self {
            white_matter: f(Tissue::WhiteMatter),
            grey_matter: f(Tissue::GreyMatter),
            csf: f(Tissue::Csf),
        }
    }

    #[must_use]
    pub fn get(&self, tissue: Tissue) -> &T {
        match tissue {
            Tissue::WhiteMatter => &self.white_matter,
            Tissue::GreyMatter => &self.grey_matter,
            Tissue::Csf => &self.csf,
        }
    }

    /// Iterate `(tissue, value)` pairs in [`Tissue::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Tissue, &T)> {
        Tissue::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

impl TissueSet<PathBuf> {
    /// `<dir>/<name(tag)>` for every tissue.
    pub fn in_dir(dir: &Path, name: impl Fn(&str) -> String) -> Self {
        Self::from_fn(|t| dir.join(name(t.tag())))
    }
}

// =============================================================================
// ARTIFACTS
// =============================================================================

/// File format of an artifact, inferred from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Mif,
    Nifti,
    Text,
    Tck,
    Trk,
    Csv,
    Jpeg,
    Other,
}

impl ArtifactFormat {
    /// Infer the format from the file name. `.nii.gz` counts as NIfTI.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            return ArtifactFormat::Nifti;
        }

        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("mif") => ArtifactFormat::Mif,
            Some("txt") => ArtifactFormat::Text,
            Some("tck") => ArtifactFormat::Tck,
            Some("trk") => ArtifactFormat::Trk,
            Some("csv") => ArtifactFormat::Csv,
            Some("jpg" | "jpeg") => ArtifactFormat::Jpeg,
            _ => ArtifactFormat::Other,
        }
    }
}

/// A named file-system path produced or consumed by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Logical name, e.g. `fa` or `response_wm`.
    pub name: String,
    pub path: PathBuf,
    pub format: ArtifactFormat,
}

impl Artifact {
    /// Create an artifact; the format is inferred from the path.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            format: ArtifactFormat::from_path(&path),
            path,
        }
    }

    /// Whether the artifact is present on disk right now.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// File name for display, falling back to the full path.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// One artifact per tissue, named `<prefix>_<tag>`.
pub fn tissue_artifacts(prefix: &str, set: &TissueSet<PathBuf>) -> Vec<Artifact> {
    set.iter()
        .map(|(t, p)| Artifact::new(format!("{}_{}", prefix, t.tag()), p.clone()))
        .collect()
}

// =============================================================================
// SUBJECT
// =============================================================================

/// A work item: one subject directory. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Directory name, e.g. `sub-01`.
    pub id: String,
    /// Subject directory containing the per-modality subdirectories.
    pub root: PathBuf,
}

impl Subject {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }

    /// `<batch_root>/<id>`
    pub fn under(batch_root: &Path, id: impl Into<String>) -> Self {
        let id = id.into();
        let root = batch_root.join(&id);
        Self { id, root }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while driving the pipeline.
///
/// There is no local recovery: every error aborts the current subject and
/// carries the external tool's own message where one exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required upstream input is absent.
    #[error("Missing input: {}", .0.display())]
    MissingInput(PathBuf),

    /// An explicitly requested subject has no directory under the root.
    #[error("Subject '{0}' not found under {root}", root = .1.display())]
    SubjectNotFound(String, PathBuf),

    /// An external program ran and reported failure.
    #[error("{program} failed (exit status {code}): {stderr}", code = display_status(.status))]
    Toolkit {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// An external program could not be started.
    #[error("Cannot start {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The external computation returned normally but did not produce
    /// every declared output.
    #[error("Stage '{stage}' finished without producing: {}", display_paths(.paths))]
    OutputsMissing { stage: String, paths: Vec<PathBuf> },

    /// Malformed atlas label index.
    #[error("Invalid label index at line {line}: {reason}")]
    InvalidLabelIndex { line: usize, reason: String },

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A subject's pipeline failed and the batch was halted.
    #[error("Subject {subject} failed: {source}")]
    Subject {
        subject: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// A batch run under the continue policy finished with failed subjects.
    #[error("{} of {total} subjects failed: {}", .failed.len(), .failed.join(", "))]
    BatchIncomplete { failed: Vec<String>, total: usize },
}

fn display_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// TESTS
// =============================================================================
