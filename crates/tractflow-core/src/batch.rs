//! # Batch Driver
//!
//! Runs a pipeline once per subject, one subject at a time, in sorted
//! subject order.
//!
//! Subjects share nothing but the filesystem, and each writes only under its
//! own directory. What happens after a subject fails is decided by
//! [`FailurePolicy`].

use crate::config::BatchConfig;
use crate::connectivity::{ConnectivityReport, run_connectivity};
use crate::discovery::resolve_subjects;
use crate::pipeline::{SubjectPlan, SubjectReport, plan_subject, run_subject};
use crate::toolkit::{ConnectomeToolkit, Toolkit};
use crate::types::Subject;
use crate::PipelineError;
use serde::{Deserialize, Serialize};

// =============================================================================
// FAILURE POLICY
// =============================================================================

/// Behaviour of a batch after one subject fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole batch at the first failing subject.
    #[default]
    Halt,
    /// Record the failure and move on to the next subject.
    Continue,
}

// =============================================================================
// REPORT
// =============================================================================

/// A subject that failed under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport<R> {
    pub completed: Vec<R>,
    pub failed: Vec<SubjectFailure>,
}

impl<R> BatchReport<R> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Err` naming every failed subject, if any failed.
    pub fn ensure_success(&self) -> Result<(), PipelineError> {
        if self.is_success() {
            return Ok(());
        }
        Err(PipelineError::BatchIncomplete {
            failed: self.failed.iter().map(|f| f.subject.clone()).collect(),
            total: self.completed.len() + self.failed.len(),
        })
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Drives every subject of a batch through a pipeline.
#[derive(Debug, Clone)]
pub struct BatchDriver {
    config: BatchConfig,
}

impl BatchDriver {
    #[must_use]
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The batch's subjects, sorted.
    pub fn subjects(&self) -> Result<Vec<Subject>, PipelineError> {
        resolve_subjects(
            &self.config.root,
            &self.config.subject_prefix,
            self.config.subjects.as_deref(),
        )
    }

    /// Whole-brain tractography for every subject.
    pub fn run(&self, toolkit: &dyn Toolkit) -> Result<BatchReport<SubjectReport>, PipelineError> {
        self.drive(|subject| run_subject(subject, toolkit))
    }

    /// Connectivity matrices for every subject.
    pub fn run_connectivity(
        &self,
        toolkit: &dyn ConnectomeToolkit,
    ) -> Result<BatchReport<ConnectivityReport>, PipelineError> {
        let root = self.config.root.as_path();
        let connectivity = &self.config.connectivity;
        self.drive(|subject| run_connectivity(subject, root, connectivity, toolkit))
    }

    /// Cache state of every subject, without computing anything.
    pub fn plan(&self) -> Result<Vec<SubjectPlan>, PipelineError> {
        self.subjects()?.iter().map(plan_subject).collect()
    }

    fn drive<R>(
        &self,
        mut each: impl FnMut(&Subject) -> Result<R, PipelineError>,
    ) -> Result<BatchReport<R>, PipelineError> {
        let subjects = self.subjects()?;
        tracing::info!(
            "Processing {} subjects under {}",
            subjects.len(),
            self.config.root.display()
        );

        let mut report = BatchReport {
            completed: Vec::with_capacity(subjects.len()),
            failed: Vec::new(),
        };

        for subject in &subjects {
            match each(subject) {
                Ok(done) => report.completed.push(done),
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Halt => {
                        return Err(PipelineError::Subject {
                            subject: subject.id.clone(),
                            source: Box::new(e),
                        });
                    }
                    FailurePolicy::Continue => {
                        tracing::error!(subject = %subject.id, "Subject failed: {}", e);
                        report.failed.push(SubjectFailure {
                            subject: subject.id.clone(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(report)
    }
}
