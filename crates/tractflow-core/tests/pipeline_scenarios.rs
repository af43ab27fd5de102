//! End-to-end scenarios for the per-subject pipeline and the batch driver.
//!
//! Every scenario runs against a temporary directory tree and a fake
//! toolkit that writes the files the real one would.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::{FakeToolkit, capture_logs, seed_subject, tractography_dir, write_file};
use std::time::Duration;
use tractflow_core::stage::{FibreOrientation, TissueResponse};
use tractflow_core::{
    BatchConfig, BatchDriver, FailurePolicy, PipelineError, Stage, StageKind, SubjectLayout,
    run_stage, run_subject,
};

// =============================================================================
// SINGLE SUBJECT
// =============================================================================

#[test]
fn first_run_computes_every_stage_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    let toolkit = FakeToolkit::new();

    let (result, logs) = capture_logs(|| run_subject(&subject, &toolkit));
    let report = result.unwrap();

    assert_eq!(toolkit.stage_calls(), StageKind::ALL.to_vec());
    for kind in StageKind::ALL {
        assert_eq!(
            logs.matches(kind.computing_notice()).count(),
            1,
            "{} notice",
            kind
        );
        assert!(!logs.contains(kind.cached_notice()));
    }
    assert_eq!(report.stages.len(), 5);
    assert_eq!(report.computed_count(), 5);
    assert!(report.stages.iter().all(|s| !s.cache_hit));

    let out = tractography_dir(dir.path(), "sub-01");
    for name in [
        "dti.mif",
        "fa.mif",
        "response_wm.txt",
        "response_gm.txt",
        "response_csf.txt",
        "FOD_wm.mif",
        "FOD_gm.mif",
        "FOD_csf.mif",
        "tractogram.tck",
        "seeds.txt",
        "tractogram.trk",
    ] {
        assert!(out.join(name).exists(), "{} missing", name);
    }

    assert_eq!(report.outputs.fa, out.join("fa.mif"));
    assert_eq!(report.outputs.tck, out.join("tractogram.tck"));
    assert_eq!(report.outputs.trk, out.join("tractogram.trk"));
    assert!(report.elapsed > Duration::ZERO);
    assert!(logs.contains("'s whole-brain tractography took"));
}

#[test]
fn second_run_is_fully_cached() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");

    let first = run_subject(&subject, &FakeToolkit::new()).unwrap();

    let toolkit = FakeToolkit::new();
    let (result, logs) = capture_logs(|| run_subject(&subject, &toolkit));
    let second = result.unwrap();

    assert!(toolkit.calls().is_empty());
    assert!(second.fully_cached());
    assert_eq!(first.outputs, second.outputs);
    for kind in StageKind::ALL {
        assert_eq!(logs.matches(kind.cached_notice()).count(), 1, "{} notice", kind);
        assert!(!logs.contains(kind.computing_notice()));
    }
}

#[test]
fn archived_inputs_do_not_block_a_finished_subject() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    run_subject(&subject, &FakeToolkit::new()).unwrap();

    let layout = SubjectLayout::resolve(&subject);
    for input in layout.required_inputs() {
        std::fs::remove_file(&input.path).unwrap();
    }

    let toolkit = FakeToolkit::new();
    let report = run_subject(&subject, &toolkit).unwrap();
    assert!(report.fully_cached());
    assert!(toolkit.calls().is_empty());
}

#[test]
fn deleting_one_output_recomputes_only_that_stage() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    run_subject(&subject, &FakeToolkit::new()).unwrap();

    std::fs::remove_file(tractography_dir(dir.path(), "sub-01").join("FOD_gm.mif")).unwrap();

    let toolkit = FakeToolkit::new();
    let report = run_subject(&subject, &toolkit).unwrap();

    assert_eq!(toolkit.stage_calls(), vec![StageKind::FibreOrientation]);
    assert_eq!(report.computed_count(), 1);
}

#[test]
fn deleting_seeds_does_not_rerun_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    run_subject(&subject, &FakeToolkit::new()).unwrap();

    std::fs::remove_file(tractography_dir(dir.path(), "sub-01").join("seeds.txt")).unwrap();

    let toolkit = FakeToolkit::new();
    run_subject(&subject, &toolkit).unwrap();
    assert!(toolkit.calls().is_empty());
}

#[test]
fn output_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    let out = tractography_dir(dir.path(), "sub-01");
    assert!(!out.exists());

    run_subject(&subject, &FakeToolkit::new()).unwrap();
    assert!(out.is_dir());
}

#[test]
fn missing_input_fails_the_stage_that_reads_it() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    let layout = SubjectLayout::resolve(&subject);
    std::fs::remove_file(&layout.seg_5tt).unwrap();

    let toolkit = FakeToolkit::new();
    let err = run_subject(&subject, &toolkit).unwrap_err();

    assert!(matches!(err, PipelineError::MissingInput(p) if p == layout.seg_5tt));
    assert_eq!(
        toolkit.stage_calls(),
        vec![
            StageKind::FractionalAnisotropy,
            StageKind::TissueResponse,
            StageKind::FibreOrientation,
        ]
    );
    assert!(!layout.output_dir.join("tractogram.tck").exists());
}

// =============================================================================
// COMPLETENESS GATE
// =============================================================================

#[test]
fn partial_responses_trigger_recompute() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    let layout = SubjectLayout::resolve(&subject);
    write_file(&layout.output_dir.join("response_wm.txt"));

    let stage = TissueResponse::new(&layout.dwi, &layout.mask, &layout.output_dir).unwrap();
    let toolkit = FakeToolkit::new();
    let run = run_stage(&stage, &toolkit).unwrap();

    assert!(!run.status.cache_hit);
    assert_eq!(toolkit.stage_calls(), vec![StageKind::TissueResponse]);
    for (_, path) in run.output.iter() {
        assert!(path.exists());
    }
}

#[test]
fn cached_stage_forwards_the_same_output() {
    let dir = tempfile::tempdir().unwrap();
    let subject = seed_subject(dir.path(), "sub-01");
    let layout = SubjectLayout::resolve(&subject);
    let toolkit = FakeToolkit::new();

    let responses = run_stage(
        &TissueResponse::new(&layout.dwi, &layout.mask, &layout.output_dir).unwrap(),
        &toolkit,
    )
    .unwrap()
    .output;
    let stage = FibreOrientation::new(&layout.dwi, &layout.mask, responses, &layout.output_dir)
        .unwrap();

    let computed = run_stage(&stage, &toolkit).unwrap();
    let cached = run_stage(&stage, &toolkit).unwrap();

    assert!(!computed.status.cache_hit);
    assert!(cached.status.cache_hit);
    assert_eq!(computed.output, cached.output);
    assert_eq!(computed.output, stage.output());
}

// =============================================================================
// BATCH
// =============================================================================

fn seeded_batch(root: &std::path::Path) {
    for id in ["sub-01", "sub-03", "sub-02"] {
        seed_subject(root, id);
    }
}

#[test]
fn batch_runs_subjects_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    seeded_batch(dir.path());

    let driver = BatchDriver::new(BatchConfig::with_root(dir.path()));
    let report = driver.run(&FakeToolkit::new()).unwrap();

    let ids: Vec<&str> = report.completed.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(ids, vec!["sub-01", "sub-02", "sub-03"]);
    assert!(report.is_success());
}

#[test]
fn halt_policy_stops_at_failing_subject() {
    let dir = tempfile::tempdir().unwrap();
    seeded_batch(dir.path());

    let driver = BatchDriver::new(BatchConfig::with_root(dir.path()));
    let err = driver.run(&FakeToolkit::failing_for("sub-02")).unwrap_err();

    match err {
        PipelineError::Subject { subject, source } => {
            assert_eq!(subject, "sub-02");
            assert!(matches!(*source, PipelineError::Toolkit { .. }));
        }
        other => panic!("expected subject error, got {:?}", other),
    }
    assert!(tractography_dir(dir.path(), "sub-01").join("tractogram.trk").exists());
    assert!(!tractography_dir(dir.path(), "sub-03").exists());
}

#[test]
fn continue_policy_records_failure_and_moves_on() {
    let dir = tempfile::tempdir().unwrap();
    seeded_batch(dir.path());

    let mut config = BatchConfig::with_root(dir.path());
    config.failure_policy = FailurePolicy::Continue;
    let report = BatchDriver::new(config)
        .run(&FakeToolkit::failing_for("sub-02"))
        .unwrap();

    let ids: Vec<&str> = report.completed.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(ids, vec!["sub-01", "sub-03"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].subject, "sub-02");
    assert!(report.failed[0].error.contains("dwi2tensor"));
    assert!(!report.is_success());
}

#[test]
fn plan_reports_partial_progress() {
    let dir = tempfile::tempdir().unwrap();
    seeded_batch(dir.path());

    let mut config = BatchConfig::with_root(dir.path());
    config.subjects = Some(vec!["sub-02".to_string()]);
    let driver = BatchDriver::new(config);
    driver.run(&FakeToolkit::new()).unwrap();

    std::fs::remove_file(tractography_dir(dir.path(), "sub-02").join("tractogram.trk")).unwrap();

    let plans = driver.plan().unwrap();
    assert_eq!(plans.len(), 1);
    let cached: Vec<bool> = plans[0].stages.iter().map(|s| s.cached).collect();
    assert_eq!(cached, vec![true, true, true, true, false]);
}
