//! # Pipeline Primitives
//!
//! Fixed names and parameters shared by every stage.
//!
//! All artifact file names are derived deterministically from an output
//! directory plus one of the names below. Changing any of them invalidates
//! the cache of every subject processed before the change.

// =============================================================================
// TRACTOGRAPHY PARAMETERS
// =============================================================================

/// Number of streamlines selected by whole-brain tractography.
pub const DEFAULT_STREAMLINE_COUNT: u32 = 350_000;

/// Microstructural metric used to weight the connectivity matrix.
pub const DEFAULT_WEIGHT_METRIC: &str = "1.5_2_AxPasi5";

/// Directory-name prefix that marks a subject directory.
pub const DEFAULT_SUBJECT_PREFIX: &str = "sub-";

/// Prefix of every connectivity output file.
pub const DEFAULT_CONNECTIVITY_PREFIX: &str = "Whole_Head";

// =============================================================================
// SUBJECT LAYOUT
// =============================================================================

/// Subdirectory holding the diffusion data of a subject.
pub const DWI_DIR: &str = "dwi";

/// MRtrix3 preprocessing directory under [`DWI_DIR`].
pub const MRTRIX_PREP_DIR: &str = "Mrtrix_prep";

/// Output directory for every tractography artifact of a subject.
pub const TRACTOGRAPHY_DIR: &str = "tractography";

pub const PREPROCESSED_DWI_FILE: &str = "dwi_preprocessed_biascorr.mif";
pub const BRAIN_MASK_FILE: &str = "fieldmap_magnitude_brain_mask.mif";
pub const FIVE_TISSUE_FILE: &str = "5TT.mif";

/// Suffix of the NIfTI copy of the preprocessed DWI: `<subject><suffix>`.
pub const DWI_NIFTI_SUFFIX: &str = "_acq-AP_dwi_preprocessed_biascorr.nii.gz";

// =============================================================================
// STAGE OUTPUTS
// =============================================================================

pub const DTI_FILE: &str = "dti.mif";
pub const FA_FILE: &str = "fa.mif";
pub const TRACTOGRAM_FILE: &str = "tractogram.tck";

/// Seed points written by tractography. Not part of the cache gate.
pub const SEEDS_FILE: &str = "seeds.txt";

/// Extension of the converted streamline file.
pub const TRK_EXTENSION: &str = "trk";

/// `response_<tag>.txt`
pub fn response_file_name(tag: &str) -> String {
    format!("response_{}.txt", tag)
}

/// `FOD_<tag>.mif`
pub fn fod_file_name(tag: &str) -> String {
    format!("FOD_{}.mif", tag)
}

// =============================================================================
// CONNECTIVITY LAYOUT
// =============================================================================

/// Atlas region index, relative to the batch root.
pub const DEFAULT_ATLAS_INDEX: &str = "Derivatives/megaatlas/megaatlascortex2nii_origin.txt";

/// Per-subject registration folders, relative to the batch root.
pub const DEFAULT_REGISTRATIONS_DIR: &str = "Derivatives/Registrations";

/// Folder inside a subject's registration directory.
pub const ATLAS_TRANSFORMS_DIR: &str = "Atlases_and_Transforms";

/// Atlas labels already carried into diffusion space by the registration.
pub const DEFAULT_LABELS_IMAGE: &str = "megaatlas_labels_in_dwi.nii.gz";
