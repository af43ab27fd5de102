//! # Batch Configuration
//!
//! Everything the batch driver needs, passed in explicitly at call time.
//! There is no process-wide default root or subject list.
//!
//! All sections deserialize with defaults, so an empty document is a valid
//! configuration rooted at the current directory.

use crate::batch::FailurePolicy;
use crate::primitives::{
    DEFAULT_ATLAS_INDEX, DEFAULT_CONNECTIVITY_PREFIX, DEFAULT_LABELS_IMAGE,
    DEFAULT_REGISTRATIONS_DIR, DEFAULT_SUBJECT_PREFIX,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// BATCH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Directory containing one subdirectory per subject.
    pub root: PathBuf,
    /// Explicit subject list. Bypasses discovery when set.
    pub subjects: Option<Vec<String>>,
    /// Directory-name prefix used by discovery.
    pub subject_prefix: String,
    /// What to do when one subject fails.
    pub failure_policy: FailurePolicy,
    pub toolkit: ToolkitConfig,
    pub connectivity: ConnectivityConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            subjects: None,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            failure_policy: FailurePolicy::default(),
            toolkit: ToolkitConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

impl BatchConfig {
    /// A default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// TOOLKIT
// =============================================================================

/// How external programs are located and invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    /// Directory holding the MRtrix3 binaries. `None` uses `PATH`.
    pub bin_dir: Option<PathBuf>,
    /// `-nthreads` passed to every MRtrix3 command.
    pub nthreads: Option<u32>,
    /// Pass `-force` so MRtrix3 overwrites partial outputs.
    pub force: bool,
    /// tck → trk converter (nibabel's script by default).
    pub tck2trk: String,
    /// Matrix renderer, called as `<cmd> <matrix.csv> <labels.txt> <image> [--weighted]`.
    pub render_command: Option<String>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            nthreads: None,
            force: false,
            tck2trk: "nib-tck2trk".to_string(),
            render_command: None,
        }
    }
}

// =============================================================================
// CONNECTIVITY
// =============================================================================

/// Where connectivity inputs live, relative to the batch root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectivityConfig {
    /// Atlas region index (`index name` per line).
    pub atlas_index: PathBuf,
    /// Parent of the per-subject registration folders.
    pub registrations_dir: PathBuf,
    /// Labels image name inside `<registrations_dir>/<subject>/Atlases_and_Transforms`.
    pub labels_image: String,
    /// Prefix of every output file name.
    pub prefix: String,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            atlas_index: PathBuf::from(DEFAULT_ATLAS_INDEX),
            registrations_dir: PathBuf::from(DEFAULT_REGISTRATIONS_DIR),
            labels_image: DEFAULT_LABELS_IMAGE.to_string(),
            prefix: DEFAULT_CONNECTIVITY_PREFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.subject_prefix, "sub-");
        assert_eq!(config.failure_policy, FailurePolicy::Halt);
        assert_eq!(config.toolkit.tck2trk, "nib-tck2trk");
        assert_eq!(config.connectivity.prefix, "Whole_Head");
    }

    #[test]
    fn with_root_keeps_other_defaults() {
        let config = BatchConfig::with_root("/data");
        assert_eq!(config.root, PathBuf::from("/data"));
        assert!(config.subjects.is_none());
    }
}
