//! # Connectivity Builder
//!
//! Structural connectivity from a finished tractogram and an atlas.
//!
//! The toolkit assigns streamline endpoints to atlas regions, groups
//! streamlines by the region pair they join, counts each group and
//! optionally weights it by a per-streamline microstructural metric. This
//! module only wires the artifacts together and renders both matrices with
//! the atlas region names as axis headers.
//!
//! There is no cache gate here: every call recomputes.

use crate::config::ConnectivityConfig;
use crate::existence::ensure_dir;
use crate::stage::millis;
use crate::primitives::{
    ATLAS_TRANSFORMS_DIR, DEFAULT_WEIGHT_METRIC, DWI_DIR, TRACTOGRAM_FILE, TRACTOGRAPHY_DIR,
};
use crate::toolkit::ConnectomeToolkit;
use crate::types::{Artifact, Subject};
use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

// =============================================================================
// REGION LABELS
// =============================================================================

/// One atlas region: label value in the labels image and its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionLabel {
    pub index: u32,
    pub name: String,
}

/// Parse an atlas index: one `index name...` entry per line.
///
/// Blank lines and `#` comments are skipped. Names may contain spaces.
/// Entries are returned sorted by index; duplicate indices are rejected.
pub fn parse_label_index(text: &str) -> Result<Vec<RegionLabel>, PipelineError> {
    let mut labels = Vec::new();
    let mut seen = BTreeSet::new();

    for (n, raw) in text.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (index, name) = line
            .split_once(char::is_whitespace)
            .map(|(i, rest)| (i, rest.trim()))
            .unwrap_or((line, ""));

        let index: u32 = index.parse().map_err(|_| PipelineError::InvalidLabelIndex {
            line: line_no,
            reason: format!("'{}' is not a region index", index),
        })?;
        if name.is_empty() {
            return Err(PipelineError::InvalidLabelIndex {
                line: line_no,
                reason: format!("region {} has no name", index),
            });
        }
        if !seen.insert(index) {
            return Err(PipelineError::InvalidLabelIndex {
                line: line_no,
                reason: format!("region index {} appears twice", index),
            });
        }

        labels.push(RegionLabel {
            index,
            name: name.to_string(),
        });
    }

    labels.sort();
    Ok(labels)
}

/// Read and parse an atlas index file.
pub fn read_label_index(path: &Path) -> Result<Vec<RegionLabel>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::IoError(format!("Cannot read label index '{}': {}", path.display(), e))
    })?;
    parse_label_index(&text)
}

// =============================================================================
// INPUTS
// =============================================================================

/// Everything the builder reads, plus where it writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityInputs {
    pub subject: String,
    pub tractogram: PathBuf,
    /// Atlas labels in diffusion space (already registered).
    pub labels_image: PathBuf,
    pub label_index: PathBuf,
    /// Metric sampled along streamlines. `None` skips the weighted matrix.
    pub metric_image: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub weight_by: String,
}

impl ConnectivityInputs {
    /// Resolve a subject's connectivity inputs under the batch root.
    ///
    /// The subject's `.bvec` gradient file must exist; the weighting metric
    /// image sits next to it as `<bvec stem>_<metric>.nii.gz`.
    pub fn resolve(
        subject: &Subject,
        batch_root: &Path,
        config: &ConnectivityConfig,
    ) -> Result<Self, PipelineError> {
        let bvec = find_bvec(&subject.root.join(DWI_DIR))?;
        let weight_by = DEFAULT_WEIGHT_METRIC.to_string();
        let metric = metric_image_for(&bvec, &weight_by);

        let metric_image = if metric.exists() {
            Some(metric)
        } else {
            tracing::warn!(
                subject = %subject.id,
                "No {} metric image at {}; only the non-weighted matrix will be built",
                weight_by,
                metric.display()
            );
            None
        };

        Ok(Self {
            subject: subject.id.clone(),
            tractogram: subject.root.join(TRACTOGRAPHY_DIR).join(TRACTOGRAM_FILE),
            labels_image: batch_root
                .join(&config.registrations_dir)
                .join(&subject.id)
                .join(ATLAS_TRANSFORMS_DIR)
                .join(&config.labels_image),
            label_index: batch_root.join(&config.atlas_index),
            metric_image,
            output_dir: subject.root.join(TRACTOGRAPHY_DIR),
            prefix: config.prefix.clone(),
            weight_by,
        })
    }
}

/// First `.bvec` file (by name) in `dwi_dir`.
pub fn find_bvec(dwi_dir: &Path) -> Result<PathBuf, PipelineError> {
    let missing = || PipelineError::MissingInput(dwi_dir.join("*.bvec"));

    let entries = std::fs::read_dir(dwi_dir).map_err(|_| missing())?;
    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "bvec"))
        .collect();
    found.sort();
    found.into_iter().next().ok_or_else(missing)
}

/// `<bvec dir>/<bvec stem>_<metric>.nii.gz`
pub fn metric_image_for(bvec: &Path, metric: &str) -> PathBuf {
    let stem = bvec
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    bvec.with_file_name(format!("{}_{}.nii.gz", stem, metric))
}

// =============================================================================
// BUILDER
// =============================================================================

/// Outcome of one connectivity build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub subject: String,
    /// Axis headers, in matrix order.
    pub labels: Vec<RegionLabel>,
    pub artifacts: Vec<Artifact>,
    pub weighted: bool,
    pub elapsed_ms: u64,
}

/// Builds and renders the count and weighted connectivity matrices.
#[derive(Debug, Clone)]
pub struct ConnectivityBuilder {
    inputs: ConnectivityInputs,
}

impl ConnectivityBuilder {
    /// Creates the output directory if absent.
    pub fn new(inputs: ConnectivityInputs) -> Result<Self, PipelineError> {
        ensure_dir(&inputs.output_dir)?;
        Ok(Self { inputs })
    }

    #[must_use]
    pub fn inputs(&self) -> &ConnectivityInputs {
        &self.inputs
    }

    fn out(&self, suffix: &str) -> PathBuf {
        self.inputs
            .output_dir
            .join(format!("{}_{}", self.inputs.prefix, suffix))
    }

    fn weighted_out(&self, suffix: &str) -> PathBuf {
        self.out(&format!("-{}_{}", self.inputs.weight_by, suffix))
    }

    #[must_use]
    pub fn labels_file(&self) -> PathBuf {
        self.out("labels.txt")
    }

    #[must_use]
    pub fn count_matrix(&self) -> PathBuf {
        self.out("non-weighted.csv")
    }

    #[must_use]
    pub fn assignments(&self) -> PathBuf {
        self.out("assignments.txt")
    }

    #[must_use]
    pub fn count_image(&self) -> PathBuf {
        self.out("non-weighted_Connectivity.jpg")
    }

    #[must_use]
    pub fn samples(&self) -> PathBuf {
        self.weighted_out("samples.csv")
    }

    #[must_use]
    pub fn weighted_matrix(&self) -> PathBuf {
        self.weighted_out("weighted.csv")
    }

    #[must_use]
    pub fn weighted_image(&self) -> PathBuf {
        self.weighted_out("weighted_Connectivity.jpg")
    }

    /// Build both matrices and render them. Always recomputes.
    pub fn build(&self, toolkit: &dyn ConnectomeToolkit) -> Result<ConnectivityReport, PipelineError> {
        let started = Instant::now();
        let inputs = &self.inputs;

        for required in [&inputs.tractogram, &inputs.labels_image] {
            if !required.exists() {
                return Err(PipelineError::MissingInput(required.clone()));
            }
        }
        let labels = read_label_index(&inputs.label_index)?;

        tracing::info!(
            subject = %inputs.subject,
            "Building connectivity matrices over {} regions",
            labels.len()
        );

        let labels_file = self.labels_file();
        let header: String = labels.iter().map(|l| format!("{} {}\n", l.index, l.name)).collect();
        std::fs::write(&labels_file, header).map_err(|e| {
            PipelineError::IoError(format!("Cannot write '{}': {}", labels_file.display(), e))
        })?;

        let mut artifacts = vec![Artifact::new("labels", labels_file.clone())];

        let (count, assignments, count_image) =
            (self.count_matrix(), self.assignments(), self.count_image());
        toolkit.count_matrix(&inputs.tractogram, &inputs.labels_image, &count, &assignments)?;
        toolkit.render_matrix(&count, &labels_file, &count_image, false)?;
        artifacts.push(Artifact::new("count_matrix", count));
        artifacts.push(Artifact::new("assignments", assignments));
        artifacts.push(Artifact::new("count_image", count_image));

        let weighted = match &inputs.metric_image {
            Some(metric) => {
                let (samples, matrix, image) =
                    (self.samples(), self.weighted_matrix(), self.weighted_image());
                tracing::info!(
                    subject = %inputs.subject,
                    "Weighting connectivity by {}",
                    inputs.weight_by
                );
                toolkit.weighted_matrix(
                    &inputs.tractogram,
                    &inputs.labels_image,
                    metric,
                    &samples,
                    &matrix,
                )?;
                toolkit.render_matrix(&matrix, &labels_file, &image, true)?;
                artifacts.push(Artifact::new("samples", samples));
                artifacts.push(Artifact::new("weighted_matrix", matrix));
                artifacts.push(Artifact::new("weighted_image", image));
                true
            }
            None => false,
        };

        let missing: Vec<PathBuf> = artifacts
            .iter()
            .filter(|a| !a.exists())
            .map(|a| a.path.clone())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::OutputsMissing {
                stage: "Connectivity".to_string(),
                paths: missing,
            });
        }

        Ok(ConnectivityReport {
            subject: inputs.subject.clone(),
            labels,
            artifacts,
            weighted,
            elapsed_ms: millis(started.elapsed()),
        })
    }
}

/// Resolve and build connectivity for one subject.
pub fn run_connectivity(
    subject: &Subject,
    batch_root: &Path,
    config: &ConnectivityConfig,
    toolkit: &dyn ConnectomeToolkit,
) -> Result<ConnectivityReport, PipelineError> {
    let inputs = ConnectivityInputs::resolve(subject, batch_root, config)?;
    ConnectivityBuilder::new(inputs)?.build(toolkit)
}
