//! # Subject Layout
//!
//! Resolves a subject directory into the concrete paths the stages need.
//!
//! ```text
//! <subject>/
//! ├── dwi/
//! │   ├── <subject>_acq-AP_dwi_preprocessed_biascorr.nii.gz
//! │   └── Mrtrix_prep/
//! │       ├── dwi_preprocessed_biascorr.mif
//! │       ├── fieldmap_magnitude_brain_mask.mif
//! │       └── 5TT.mif
//! └── tractography/          (all outputs)
//! ```

use crate::primitives::{
    BRAIN_MASK_FILE, DWI_DIR, DWI_NIFTI_SUFFIX, FIVE_TISSUE_FILE, MRTRIX_PREP_DIR,
    PREPROCESSED_DWI_FILE, TRACTOGRAPHY_DIR,
};
use crate::types::{Artifact, Subject};
use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input and output locations of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectLayout {
    pub subject: Subject,
    /// Preprocessed, bias-corrected DWI (MRtrix format).
    pub dwi: PathBuf,
    pub mask: PathBuf,
    /// Five-tissue-type segmentation.
    pub seg_5tt: PathBuf,
    /// NIfTI copy of the DWI, reference space for `.trk` output.
    pub dwi_nii: PathBuf,
    pub output_dir: PathBuf,
}

impl SubjectLayout {
    #[must_use]
    pub fn resolve(subject: &Subject) -> Self {
        let dwi_dir = subject.root.join(DWI_DIR);
        let prep = dwi_dir.join(MRTRIX_PREP_DIR);

        Self {
            dwi: prep.join(PREPROCESSED_DWI_FILE),
            mask: prep.join(BRAIN_MASK_FILE),
            seg_5tt: prep.join(FIVE_TISSUE_FILE),
            dwi_nii: dwi_dir.join(format!("{}{}", subject.id, DWI_NIFTI_SUFFIX)),
            output_dir: subject.root.join(TRACTOGRAPHY_DIR),
            subject: subject.clone(),
        }
    }

    /// Every input the pipeline reads, in first-use order.
    #[must_use]
    pub fn required_inputs(&self) -> Vec<Artifact> {
        vec![
            Artifact::new("dwi", self.dwi.clone()),
            Artifact::new("mask", self.mask.clone()),
            Artifact::new("5tt", self.seg_5tt.clone()),
            Artifact::new("dwi_nii", self.dwi_nii.clone()),
        ]
    }

    /// Fails with the first required input that is absent.
    pub fn check_inputs(&self) -> Result<(), PipelineError> {
        match self.required_inputs().into_iter().find(|a| !a.exists()) {
            Some(missing) => Err(PipelineError::MissingInput(missing.path)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn resolves_conventional_paths() {
        let subject = Subject::under(Path::new("/data"), "sub-01");
        let layout = SubjectLayout::resolve(&subject);

        assert_eq!(
            layout.dwi,
            PathBuf::from("/data/sub-01/dwi/Mrtrix_prep/dwi_preprocessed_biascorr.mif")
        );
        assert_eq!(
            layout.mask,
            PathBuf::from("/data/sub-01/dwi/Mrtrix_prep/fieldmap_magnitude_brain_mask.mif")
        );
        assert_eq!(
            layout.seg_5tt,
            PathBuf::from("/data/sub-01/dwi/Mrtrix_prep/5TT.mif")
        );
        assert_eq!(
            layout.dwi_nii,
            PathBuf::from("/data/sub-01/dwi/sub-01_acq-AP_dwi_preprocessed_biascorr.nii.gz")
        );
        assert_eq!(layout.output_dir, PathBuf::from("/data/sub-01/tractography"));
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let subject = Subject::under(dir.path(), "sub-02");
        let layout = SubjectLayout::resolve(&subject);

        match layout.check_inputs() {
            Err(PipelineError::MissingInput(path)) => assert_eq!(path, layout.dwi),
            other => unreachable!("expected missing input, got {:?}", other),
        }
    }
}
