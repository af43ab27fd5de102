//! # MRtrix3 Toolkit
//!
//! Process-backed implementation of [`Toolkit`] and [`ConnectomeToolkit`].
//!
//! | Step | Programs |
//! |------|----------|
//! | FA | `dwi2tensor`, `tensor2metric -fa` |
//! | Responses | `dwi2response dhollander` |
//! | FOD | `dwi2fod msmt_csd` |
//! | Tractogram | `tckgen -algorithm iFOD2 -act` |
//! | tck → trk | `nib-tck2trk` (nibabel) |
//! | Connectome | `tck2connectome`, `tcksample` |
//! | Rendering | configured `render_command` |

use super::process::run_command;
use super::{ConnectomeToolkit, Toolkit};
use crate::config::ToolkitConfig;
use crate::PipelineError;
use crate::types::{FodSet, ResponseSet};
use std::path::{Path, PathBuf};
use std::process::Command;

/// MRtrix3 command-line tools.
#[derive(Debug, Clone, Default)]
pub struct Mrtrix3 {
    config: ToolkitConfig,
}

impl Mrtrix3 {
    #[must_use]
    pub fn new(config: ToolkitConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// An MRtrix3 command with the shared options applied.
    pub fn mrtrix(&self, program: &str) -> Command {
        let exe = match &self.config.bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        };
        let mut cmd = Command::new(exe);
        cmd.arg("-quiet");
        if self.config.force {
            cmd.arg("-force");
        }
        if let Some(n) = self.config.nthreads {
            cmd.arg("-nthreads").arg(n.to_string());
        }
        cmd
    }
}

impl Toolkit for Mrtrix3 {
    fn fit_tensors(
        &self,
        dwi: &Path,
        mask: &Path,
        dti: &Path,
        fa: &Path,
    ) -> Result<(), PipelineError> {
        let mut tensor = self.mrtrix("dwi2tensor");
        tensor.arg(dwi).arg(dti).arg("-mask").arg(mask);
        run_command(tensor)?;

        let mut metric = self.mrtrix("tensor2metric");
        metric.arg(dti).arg("-fa").arg(fa).arg("-mask").arg(mask);
        run_command(metric)
    }

    fn estimate_responses(
        &self,
        dwi: &Path,
        mask: &Path,
        responses: &ResponseSet,
    ) -> Result<(), PipelineError> {
        let mut cmd = self.mrtrix("dwi2response");
        cmd.arg("dhollander").arg(dwi);
        for (_, response) in responses.iter() {
            cmd.arg(response);
        }
        cmd.arg("-mask").arg(mask);
        run_command(cmd)
    }

    fn fibre_orientation(
        &self,
        dwi: &Path,
        mask: &Path,
        responses: &ResponseSet,
        fods: &FodSet,
    ) -> Result<(), PipelineError> {
        let mut cmd = self.mrtrix("dwi2fod");
        cmd.arg("msmt_csd").arg(dwi);
        // response/FOD pairs, one per tissue
        for (tissue, response) in responses.iter() {
            cmd.arg(response).arg(fods.get(tissue));
        }
        cmd.arg("-mask").arg(mask);
        run_command(cmd)
    }

    fn generate_tracts(
        &self,
        fod_wm: &Path,
        seg_5tt: &Path,
        tractogram: &Path,
        seeds: &Path,
        streamline_count: u32,
    ) -> Result<(), PipelineError> {
        let mut cmd = self.mrtrix("tckgen");
        cmd.arg(fod_wm)
            .arg(tractogram)
            .args(["-algorithm", "iFOD2"])
            .arg("-act")
            .arg(seg_5tt)
            .arg("-backtrack")
            .arg("-crop_at_gmwmi")
            .arg("-seed_dynamic")
            .arg(fod_wm)
            .arg("-select")
            .arg(streamline_count.to_string())
            .arg("-output_seeds")
            .arg(seeds);
        run_command(cmd)
    }

    fn convert_tck_to_trk(
        &self,
        tck: &Path,
        reference: &Path,
        trk: &Path,
    ) -> Result<(), PipelineError> {
        let mut cmd = Command::new(&self.config.tck2trk);
        cmd.arg(reference).arg(tck);
        if self.config.force {
            cmd.arg("--force");
        }
        run_command(cmd)?;

        // The converter always writes next to its input.
        let written = tck.with_extension("trk");
        if written != trk {
            std::fs::rename(&written, trk).map_err(|e| {
                PipelineError::IoError(format!(
                    "Cannot move {} to {}: {}",
                    written.display(),
                    trk.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl ConnectomeToolkit for Mrtrix3 {
    fn count_matrix(
        &self,
        tractogram: &Path,
        labels_image: &Path,
        matrix: &Path,
        assignments: &Path,
    ) -> Result<(), PipelineError> {
        let mut cmd = self.mrtrix("tck2connectome");
        cmd.arg(tractogram)
            .arg(labels_image)
            .arg(matrix)
            .arg("-symmetric")
            .arg("-zero_diagonal")
            .arg("-out_assignments")
            .arg(assignments);
        run_command(cmd)
    }

    fn weighted_matrix(
        &self,
        tractogram: &Path,
        labels_image: &Path,
        metric_image: &Path,
        samples: &Path,
        matrix: &Path,
    ) -> Result<(), PipelineError> {
        let mut sample = self.mrtrix("tcksample");
        sample
            .arg(tractogram)
            .arg(metric_image)
            .arg(samples)
            .args(["-stat_tck", "mean"]);
        run_command(sample)?;

        let mut cmd = self.mrtrix("tck2connectome");
        cmd.arg(tractogram)
            .arg(labels_image)
            .arg(matrix)
            .arg("-scale_file")
            .arg(samples)
            .args(["-stat_edge", "mean"])
            .arg("-symmetric")
            .arg("-zero_diagonal");
        run_command(cmd)
    }

    fn render_matrix(
        &self,
        matrix: &Path,
        labels: &Path,
        image: &Path,
        weighted: bool,
    ) -> Result<(), PipelineError> {
        let program = self.config.render_command.as_deref().ok_or_else(|| {
            PipelineError::Config(
                "no render_command configured; cannot draw connectivity matrices".to_string(),
            )
        })?;

        let mut cmd = Command::new(program);
        cmd.arg(matrix).arg(labels).arg(image);
        if weighted {
            cmd.arg("--weighted");
        }
        run_command(cmd)
    }
}
