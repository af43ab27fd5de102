//! # Subject Discovery
//!
//! Finds the subjects of a batch, always in sorted order.

use crate::types::Subject;
use crate::PipelineError;
use std::collections::BTreeSet;
use std::path::Path;

/// Subdirectories of `root` whose name starts with `prefix`, sorted by name.
///
/// Plain files are ignored, even when their name matches.
pub fn discover_subjects(root: &Path, prefix: &str) -> Result<Vec<Subject>, PipelineError> {
    let entries = std::fs::read_dir(root).map_err(|e| {
        PipelineError::IoError(format!("Cannot list subjects in '{}': {}", root.display(), e))
    })?;

    let ids: BTreeSet<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| name.starts_with(prefix))
        .collect();

    tracing::debug!("Discovered {} subjects under {}", ids.len(), root.display());
    Ok(ids.into_iter().map(|id| Subject::under(root, id)).collect())
}

/// The batch's subjects: the explicit list when given, else discovery.
///
/// An explicit list is sorted and deduplicated, and every entry must be a
/// directory under `root`.
pub fn resolve_subjects(
    root: &Path,
    prefix: &str,
    explicit: Option<&[String]>,
) -> Result<Vec<Subject>, PipelineError> {
    let Some(ids) = explicit else {
        return discover_subjects(root, prefix);
    };

    let ids: BTreeSet<&String> = ids.iter().collect();
    ids.into_iter()
        .map(|id| {
            let subject = Subject::under(root, id.as_str());
            if subject.root.is_dir() {
                Ok(subject)
            } else {
                Err(PipelineError::SubjectNotFound(id.clone(), root.to_path_buf()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkdirs(root: &Path, names: &[&str]) {
        for name in names {
            std::fs::create_dir_all(root.join(name)).expect("mkdir");
        }
    }

    #[test]
    fn discovery_is_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        mkdirs(dir.path(), &["sub-01", "sub-03", "sub-02"]);

        let ids: Vec<String> = discover_subjects(dir.path(), "sub-")
            .expect("discover")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["sub-01", "sub-02", "sub-03"]);
    }

    #[test]
    fn ignores_files_and_other_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        mkdirs(dir.path(), &["sub-01", "derivatives", "Sub-02"]);
        std::fs::write(dir.path().join("sub-99"), "").expect("write");

        let subjects = discover_subjects(dir.path(), "sub-").expect("discover");
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].root, dir.path().join("sub-01"));
    }

    #[test]
    fn explicit_list_overrides_discovery() {
        let dir = tempfile::tempdir().expect("tempdir");
        mkdirs(dir.path(), &["sub-01", "sub-02", "pilot"]);

        let explicit = vec!["pilot".to_string(), "sub-02".to_string(), "pilot".to_string()];
        let ids: Vec<String> = resolve_subjects(dir.path(), "sub-", Some(explicit.as_slice()))
            .expect("resolve")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["pilot", "sub-02"]);
    }

    #[test]
    fn explicit_unknown_subject_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let explicit = vec!["sub-404".to_string()];

        let err = resolve_subjects(dir.path(), "sub-", Some(explicit.as_slice())).expect_err("must fail");
        assert!(matches!(err, PipelineError::SubjectNotFound(id, _) if id == "sub-404"));
    }

    #[test]
    fn missing_root_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = discover_subjects(&dir.path().join("nope"), "sub-").expect_err("must fail");
        assert!(matches!(err, PipelineError::IoError(_)));
    }
}
