use chrono::{NaiveDate, NaiveDateTime};
use easel_core::fakes::{
    MemoryLedger, RecordingDisplay, RecordingPublisher, ScriptedGenerator, ScriptedJudge,
    StatusRecorder,
};
use easel_core::{
    AbortReason, BatchOrchestrator, Collaborators, CycleStage, FileLedger, PreferenceLedger,
    StudioConfig, StudioError, WinnerFallback, WinnerSource, SEED_HISTORY,
};
use std::path::Path;
use std::sync::Arc;

const GOOD: &str = "```rhai\nlet surface = new_surface(16, 16);\nsurface.set_source_rgb(1, 0, 0);\nsurface.paint();\n```";
const NO_SURFACE: &str = "let nothing = 1;";
const BROKEN: &str = "let surface = new_surface(16, ;";

struct Harness {
    generator: Arc<ScriptedGenerator>,
    judge: Arc<ScriptedJudge>,
    display: Arc<RecordingDisplay>,
    publisher: Arc<RecordingPublisher>,
    ledger: Arc<MemoryLedger>,
    status: Arc<StatusRecorder>,
}

impl Harness {
    fn new(generator: ScriptedGenerator, judge: ScriptedJudge) -> Self {
        Self {
            generator: Arc::new(generator),
            judge: Arc::new(judge),
            display: Arc::new(RecordingDisplay::new()),
            publisher: Arc::new(RecordingPublisher::new()),
            ledger: Arc::new(MemoryLedger::new()),
            status: Arc::new(StatusRecorder::new()),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            generator: self.generator.clone(),
            judge: self.judge.clone(),
            display: self.display.clone(),
            publisher: self.publisher.clone(),
            ledger: self.ledger.clone(),
            status: self.status.clone(),
        }
    }

    fn orchestrator(&self, config: StudioConfig) -> BatchOrchestrator {
        BatchOrchestrator::new(config, self.collaborators()).unwrap()
    }
}

fn config(root: &Path, candidate_count: usize) -> StudioConfig {
    StudioConfig {
        candidate_count,
        deadline_ms: 5_000,
        output_root: root.to_path_buf(),
        max_parallel: 3,
        ..StudioConfig::default()
    }
}

fn afternoon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 24)
        .unwrap()
        .and_hms_opt(13, 5, 0)
        .unwrap()
}

fn with_failures(generator: ScriptedGenerator, slots: &[usize]) -> ScriptedGenerator {
    slots.iter().fold(generator, |g, &slot| {
        let program = if slot % 2 == 0 { NO_SURFACE } else { BROKEN };
        g.with_response(slot, program)
    })
}

#[tokio::test]
async fn test_partial_failure_keeps_generation_order() {
    easel_core::init_tracing(false, tracing::Level::DEBUG);
    let dir = tempfile::tempdir().unwrap();
    let generator = with_failures(ScriptedGenerator::new(GOOD), &[1, 4, 6]);
    let judge = ScriptedJudge::replying(
        "sketch_002 is bold, 6/10.\n\nsketch_005 is the one: 8/10.\n\nLayered red field.",
    );
    let h = Harness::new(generator, judge);

    let report = h
        .orchestrator(config(dir.path(), 8))
        .run_cycle(afternoon())
        .await
        .unwrap();

    assert!(report.is_done());
    assert_eq!(report.generated, 8);
    assert_eq!(report.rendered(), 5);
    assert_eq!(report.failed(), 3);
    assert_eq!(
        report.batch.rendered_ids(),
        vec!["sketch_000", "sketch_002", "sketch_003", "sketch_005", "sketch_007"]
    );

    let calls = h.judge.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ids, report.batch.rendered_ids());
    assert!(calls[0].image_sizes.iter().all(|n| *n > 0));
    assert_eq!(calls[0].history, SEED_HISTORY);

    let judgment = report.judgment().unwrap();
    assert_eq!(judgment.winner_id, "sketch_005");
    assert_eq!(judgment.winner_source, WinnerSource::Matched);
    assert_eq!(judgment.score, Some(6));
    assert_eq!(judgment.reasoning, "Layered red field.");
}

#[tokio::test]
async fn test_cycle_writes_sources_and_images_under_period_dir() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(
        with_failures(ScriptedGenerator::new(GOOD), &[1]),
        ScriptedJudge::replying("sketch_000"),
    );

    let report = h
        .orchestrator(config(dir.path(), 2))
        .run_cycle(afternoon())
        .await
        .unwrap();

    let out = dir.path().join("2026-01-24").join("period_3");
    assert_eq!(report.output_dir, out);
    assert!(out.join("sketch_000.png").exists());
    assert!(out.join("sketch_000.rhai").exists());
    assert!(out.join("sketch_001.rhai").exists());
    assert!(!out.join("sketch_001.png").exists());

    let source = std::fs::read_to_string(out.join("sketch_000.rhai")).unwrap();
    assert!(source.starts_with("let surface"));
    assert!(!source.contains("```"));
}

#[tokio::test]
async fn test_stage_trace_and_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(
        ScriptedGenerator::new(GOOD),
        ScriptedJudge::replying("Winner: sketch_001 (9/10)\n\nClean."),
    );

    let report = h
        .orchestrator(config(dir.path(), 3))
        .run_cycle(afternoon())
        .await
        .unwrap();

    assert_eq!(
        report.stages,
        vec![
            CycleStage::Idle,
            CycleStage::Generating,
            CycleStage::Executing,
            CycleStage::Aggregating,
            CycleStage::Judging,
            CycleStage::Parsing,
            CycleStage::Promoting,
            CycleStage::Recording,
            CycleStage::Done,
        ]
    );

    let shown = h.display.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].0, report.winner().unwrap().theme);
    assert_eq!(shown[0].1.candidate_id, "sketch_001");
    assert_eq!(shown[0].1.period, 3);

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert!(published[0].0.starts_with("let surface"));
    assert_eq!(published[0].1.score, Some(9));

    let entries = h.ledger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].winner_id, "sketch_001");
    assert_eq!(entries[0].period, 3);

    let agents = h.status.agents();
    assert_eq!(agents.first().map(String::as_str), Some("Generator"));
    assert_eq!(agents.last().map(String::as_str), Some("Idle"));
    assert!(agents.iter().any(|a| a == "Executor"));
    assert!(agents.iter().any(|a| a == "Curator"));
}

#[tokio::test]
async fn test_nothing_rendered_aborts_without_collaborators() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(
        with_failures(ScriptedGenerator::new(GOOD), &[0, 1, 2, 3]),
        ScriptedJudge::replying("sketch_000"),
    );

    let report = h
        .orchestrator(config(dir.path(), 4))
        .run_cycle(afternoon())
        .await
        .unwrap();

    assert_eq!(report.abort_reason(), Some(AbortReason::NothingRendered));
    assert_eq!(report.rendered(), 0);
    assert_eq!(report.failed(), 4);
    assert_eq!(report.stages.last(), Some(&CycleStage::Aborted));
    assert!(!report.stages.contains(&CycleStage::Judging));

    assert_eq!(h.judge.call_count(), 0);
    assert!(h.display.shown().is_empty());
    assert!(h.publisher.published().is_empty());
    assert!(h.ledger.entries().is_empty());
    assert_eq!(h.ledger.reads(), 0);
}

#[tokio::test]
async fn test_all_generation_failures_abort() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ScriptedGenerator::new(GOOD).failing(0).failing(1);
    let h = Harness::new(generator, ScriptedJudge::replying("sketch_000"));

    let report = h
        .orchestrator(config(dir.path(), 2))
        .run_cycle(afternoon())
        .await
        .unwrap();

    assert_eq!(report.abort_reason(), Some(AbortReason::NoCandidatesGenerated));
    assert_eq!(report.generated, 0);
    assert_eq!(h.generator.calls(), 2);
    assert_eq!(h.judge.call_count(), 0);
}

#[tokio::test]
async fn test_judging_failure_is_an_error_without_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(
        ScriptedGenerator::new(GOOD),
        ScriptedJudge::failing("upstream 529"),
    );

    let err = h
        .orchestrator(config(dir.path(), 2))
        .run_cycle(afternoon())
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::Judging(_)));
    assert!(err.to_string().contains("upstream 529"));
    assert!(h.display.shown().is_empty());
    assert!(h.publisher.published().is_empty());
    assert!(h.ledger.entries().is_empty());
}

#[tokio::test]
async fn test_empty_judgment_is_a_judging_error() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(ScriptedGenerator::new(GOOD), ScriptedJudge::replying("  \n "));

    let result = h
        .orchestrator(config(dir.path(), 1))
        .run_cycle(afternoon())
        .await;

    assert!(matches!(result, Err(StudioError::Judging(_))));
    assert!(h.ledger.entries().is_empty());
}

#[tokio::test]
async fn test_promotion_failures_still_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(ScriptedGenerator::new(GOOD), ScriptedJudge::replying("sketch_000"));
    h.display = Arc::new(RecordingDisplay::failing());
    h.publisher = Arc::new(RecordingPublisher::failing());

    let report = h
        .orchestrator(config(dir.path(), 1))
        .run_cycle(afternoon())
        .await
        .unwrap();

    assert!(report.is_done());
    match &report.outcome {
        easel_core::CycleOutcome::Done { promotion, .. } => {
            assert!(promotion.display.is_err());
            assert!(promotion.publish.is_err());
            assert!(promotion.recorded);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.ledger.entries().len(), 1);
}

#[tokio::test]
async fn test_ledger_write_failure_does_not_fail_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(ScriptedGenerator::new(GOOD), ScriptedJudge::replying("sketch_000"));
    h.ledger = Arc::new(MemoryLedger::failing_writes());

    let report = h
        .orchestrator(config(dir.path(), 1))
        .run_cycle(afternoon())
        .await
        .unwrap();

    assert_eq!(report.stages.last(), Some(&CycleStage::Done));
    match &report.outcome {
        easel_core::CycleOutcome::Done { promotion, .. } => assert!(!promotion.recorded),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_unnamed_winner_falls_back_to_first_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(
        with_failures(ScriptedGenerator::new(GOOD), &[0]),
        ScriptedJudge::replying("They are all wonderful. 7/10"),
    );

    let report = h
        .orchestrator(config(dir.path(), 3))
        .run_cycle(afternoon())
        .await
        .unwrap();

    let judgment = report.judgment().unwrap();
    assert_eq!(judgment.winner_id, "sketch_001");
    assert!(judgment.is_fallback());
    assert_eq!(h.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_abort_fallback_skips_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let h = Harness::new(
        ScriptedGenerator::new(GOOD),
        ScriptedJudge::replying("sketch_009 would have been great."),
    );
    let config = StudioConfig {
        winner_fallback: WinnerFallback::Abort,
        ..config(dir.path(), 2)
    };

    let report = h.orchestrator(config).run_cycle(afternoon()).await.unwrap();

    assert_eq!(report.abort_reason(), Some(AbortReason::NoWinnerFound));
    assert!(report.stages.contains(&CycleStage::Parsing));
    assert_eq!(h.judge.call_count(), 1);
    assert!(h.publisher.published().is_empty());
    assert!(h.ledger.entries().is_empty());
}

#[tokio::test]
async fn test_repeated_cycles_append_to_file_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("taste_profile.md");
    let h = Harness::new(
        ScriptedGenerator::new(GOOD),
        ScriptedJudge::replying("sketch_001 wins, 7/10.\n\nGood balance."),
    );
    let file_ledger = Arc::new(FileLedger::new(&ledger_path));
    let collaborators = Collaborators {
        ledger: file_ledger.clone(),
        ..h.collaborators()
    };
    let orchestrator = BatchOrchestrator::new(config(dir.path(), 2), collaborators).unwrap();

    let mut previous = String::new();
    for _ in 0..3 {
        let report = orchestrator.run_cycle(afternoon()).await.unwrap();
        assert!(report.is_done());

        let text = std::fs::read_to_string(&ledger_path).unwrap();
        assert!(text.starts_with(&previous));
        assert!(text.len() > previous.len());
        previous = text;
    }

    assert_eq!(previous.matches("**Selected**: sketch_001").count(), 3);

    let calls = h.judge.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].history, SEED_HISTORY);
    assert!(calls[2].history.contains("Good balance."));
    assert_eq!(file_ledger.read_all().await.unwrap(), previous);
}
