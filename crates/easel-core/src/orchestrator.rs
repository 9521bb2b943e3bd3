//! Batch orchestration: one full studio cycle.
//!
//! ```text
//! IDLE -> GENERATING -> EXECUTING -> AGGREGATING
//!      -> [nothing rendered? -> ABORTED]
//!      -> JUDGING -> PARSING -> PROMOTING -> RECORDING -> DONE
//! ```
//!
//! Per-candidate failures stay inside GENERATING and EXECUTING. Promotion and
//! ledger failures are logged and the cycle carries on. A judging failure is
//! the only thing that returns an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::collaborator::{
    FrameDisplay, GalleryPublisher, GenerationRequest, PromotionMetadata, SketchGenerator,
    SketchJudge, StatusSink, StatusUpdate, Submission,
};
use crate::config::{StudioConfig, WinnerFallback, MAX_CANDIDATES};
use crate::domain::batch::Batch;
use crate::domain::candidate::{Candidate, ProgramExtractor};
use crate::domain::error::{GenerationError, JudgingError, Result};
use crate::domain::judgment::JudgmentResult;
use crate::domain::period::Period;
use crate::judgment::JudgmentParser;
use crate::ledger::{LedgerEntry, PreferenceLedger, SEED_HISTORY};
use crate::metrics::METRICS;
use crate::obs;
use crate::sandbox::SandboxExecutor;

/// Extension of the program files kept next to each rendered image.
pub const SOURCE_EXTENSION: &str = "rhai";

/// Stages a cycle moves through, recorded in [`CycleReport::stages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Idle,
    Generating,
    Executing,
    Aggregating,
    Judging,
    Parsing,
    Promoting,
    Recording,
    Done,
    Aborted,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CycleStage::Idle => "idle",
            CycleStage::Generating => "generating",
            CycleStage::Executing => "executing",
            CycleStage::Aggregating => "aggregating",
            CycleStage::Judging => "judging",
            CycleStage::Parsing => "parsing",
            CycleStage::Promoting => "promoting",
            CycleStage::Recording => "recording",
            CycleStage::Done => "done",
            CycleStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Why a cycle stopped without promoting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Every generation request failed.
    NoCandidatesGenerated,
    /// Candidates ran but none produced an image.
    NothingRendered,
    /// The judgment named no rendered candidate and the fallback is `Abort`.
    NoWinnerFound,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::NoCandidatesGenerated => write!(f, "no candidates generated"),
            AbortReason::NothingRendered => write!(f, "no candidates rendered"),
            AbortReason::NoWinnerFound => write!(f, "judgment named no rendered candidate"),
        }
    }
}

/// Per-collaborator results of the promotion stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionReport {
    pub display: std::result::Result<(), String>,
    /// Publisher confirmation or error text.
    pub publish: std::result::Result<String, String>,
    /// Whether the ledger append succeeded.
    pub recorded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Done {
        winner: Candidate,
        judgment: JudgmentResult,
        promotion: PromotionReport,
    },
    Aborted {
        reason: AbortReason,
    },
}

/// Summary of one `run_cycle` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub period: Period,
    pub output_dir: PathBuf,
    /// Stages visited, in order, starting at `Idle`.
    pub stages: Vec<CycleStage>,
    /// Candidates that came back from generation.
    pub generated: usize,
    pub batch: Batch,
    pub outcome: CycleOutcome,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Done { .. })
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self.outcome {
            CycleOutcome::Aborted { reason } => Some(reason),
            CycleOutcome::Done { .. } => None,
        }
    }

    pub fn winner(&self) -> Option<&Candidate> {
        match &self.outcome {
            CycleOutcome::Done { winner, .. } => Some(winner),
            CycleOutcome::Aborted { .. } => None,
        }
    }

    pub fn judgment(&self) -> Option<&JudgmentResult> {
        match &self.outcome {
            CycleOutcome::Done { judgment, .. } => Some(judgment),
            CycleOutcome::Aborted { .. } => None,
        }
    }

    pub fn rendered(&self) -> usize {
        self.batch.rendered.len()
    }

    pub fn failed(&self) -> usize {
        self.batch.failed.len()
    }
}

/// External collaborators of a cycle.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn SketchGenerator>,
    pub judge: Arc<dyn SketchJudge>,
    pub display: Arc<dyn FrameDisplay>,
    pub publisher: Arc<dyn GalleryPublisher>,
    pub ledger: Arc<dyn PreferenceLedger>,
    pub status: Arc<dyn StatusSink>,
}

/// State of one in-flight cycle.
struct CycleRun {
    id: String,
    period: Period,
    output_dir: PathBuf,
    now: NaiveDateTime,
    started: Instant,
    stages: Vec<CycleStage>,
}

impl CycleRun {
    fn enter(&mut self, stage: CycleStage) {
        self.stages.push(stage);
    }

    /// Wall-clock time for status updates: cycle start plus elapsed.
    fn clock(&self) -> NaiveDateTime {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.now + elapsed
    }

    fn duration_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Drives generation, execution, judging, promotion and recording.
pub struct BatchOrchestrator {
    config: StudioConfig,
    collaborators: Collaborators,
    executor: SandboxExecutor,
    parser: JudgmentParser,
    extractor: ProgramExtractor,
}

impl BatchOrchestrator {
    /// Build an orchestrator; rejects an invalid config.
    pub fn new(config: StudioConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let parser = JudgmentParser::new(&config.id_prefix, config.reasoning_max_chars)?;
        Ok(Self {
            config,
            collaborators,
            executor: SandboxExecutor::default(),
            parser,
            extractor: ProgramExtractor::new()?,
        })
    }

    /// Replace the sandbox executor (e.g. with a narrower capability set).
    pub fn with_executor(mut self, executor: SandboxExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Run one cycle for the period containing the local time now.
    pub async fn run_cycle_now(&self) -> Result<CycleReport> {
        self.run_cycle(chrono::Local::now().naive_local()).await
    }

    /// Run one cycle for the period containing `now`.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> Result<CycleReport> {
        let period = Period::containing(now);
        let cycle_id = Uuid::new_v4().to_string();
        let span = obs::cycle_span(&cycle_id, &period.slug());

        let run = CycleRun {
            output_dir: self
                .config
                .output_root
                .join(period.date.to_string())
                .join(period.slug()),
            id: cycle_id,
            period,
            now,
            started: Instant::now(),
            stages: vec![CycleStage::Idle],
        };
        self.drive(run).instrument(span).await
    }

    /// Request `n` candidates, cycling through `themes` (the configured
    /// themes when empty). Failed slots are logged and dropped; the result
    /// keeps slot order. `n` is capped at [`MAX_CANDIDATES`].
    pub async fn generate_batch(&self, n: usize, themes: &[String]) -> Vec<Candidate> {
        if n > MAX_CANDIDATES {
            warn!(requested = n, max = MAX_CANDIDATES, "batch size capped");
        }
        let n = n.min(MAX_CANDIDATES);
        let themes = if themes.is_empty() {
            self.config.themes.as_slice()
        } else {
            themes
        };
        if themes.is_empty() {
            return Vec::new();
        }

        let generator = &self.collaborators.generator;
        let extractor = &self.extractor;
        let requests = (0..n).map(|index| GenerationRequest {
            candidate_id: Candidate::format_id(&self.config.id_prefix, index),
            theme: themes[index % themes.len()].clone(),
            index,
        });

        let results: Vec<_> = stream::iter(requests)
            .map(|request| async move {
                let result = generator.generate(&request).await.and_then(|text| {
                    let program = extractor.extract(&text);
                    if program.trim().is_empty() {
                        Err(GenerationError::EmptyProgram {
                            candidate_id: request.candidate_id.clone(),
                        })
                    } else {
                        Ok(program)
                    }
                });
                (request, result)
            })
            .buffered(self.config.max_parallel)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(request, result)| match result {
                Ok(program) => {
                    METRICS.inc_generated();
                    Some(Candidate::new(request.candidate_id, request.theme, program))
                }
                Err(err) => {
                    warn!(candidate_id = %request.candidate_id, error = %err, "generation failed");
                    None
                }
            })
            .collect()
    }

    async fn drive(&self, mut run: CycleRun) -> Result<CycleReport> {
        let requested = self.config.candidate_count;
        obs::emit_cycle_started(&run.id, &run.period.slug(), requested);
        tokio::fs::create_dir_all(&run.output_dir).await?;

        // GENERATING
        run.enter(CycleStage::Generating);
        self.status(&run, "Generator", "Generating sketches", Some(format!("0/{requested}")))
            .await;
        let candidates = self.generate_batch(requested, &self.config.themes).await;
        let generated = candidates.len();
        obs::emit_stage_completed(&run.id, "generating", &format!("{generated}/{requested}"));
        if candidates.is_empty() {
            return Ok(self
                .abort(run, 0, Batch::new(requested), AbortReason::NoCandidatesGenerated)
                .await);
        }

        // EXECUTING + AGGREGATING
        run.enter(CycleStage::Executing);
        let batch = self.execute_batch(&run, candidates).await;
        run.enter(CycleStage::Aggregating);
        obs::emit_stage_completed(
            &run.id,
            "aggregating",
            &format!("{}/{} rendered", batch.rendered.len(), batch.executed()),
        );
        if batch.is_empty() {
            return Ok(self
                .abort(run, generated, batch, AbortReason::NothingRendered)
                .await);
        }

        // JUDGING
        run.enter(CycleStage::Judging);
        let progress = format!("{} candidates", batch.rendered.len());
        self.status(&run, "Curator", "Evaluating sketches", Some(progress))
            .await;
        let (submissions, evaluation) = match self.judge_batch(&batch).await {
            Ok(judged) => judged,
            Err(err) => {
                warn!(cycle_id = %run.id, error = %err, "judging failed");
                self.status(&run, "Idle", "Judging failed", None).await;
                METRICS.inc_cycles_aborted();
                METRICS.flush();
                return Err(err.into());
            }
        };

        // PARSING
        run.enter(CycleStage::Parsing);
        let judgment = self.parser.parse(&evaluation, &batch.rendered_ids());
        if judgment.is_fallback() {
            warn!(
                cycle_id = %run.id,
                fallback = %judgment.winner_id,
                "judgment named no rendered candidate"
            );
            if self.config.winner_fallback == WinnerFallback::Abort {
                return Ok(self
                    .abort(run, generated, batch, AbortReason::NoWinnerFound)
                    .await);
            }
        }
        let Some(winner) = batch.find(&judgment.winner_id).cloned() else {
            return Ok(self
                .abort(run, generated, batch, AbortReason::NoWinnerFound)
                .await);
        };
        info!(
            cycle_id = %run.id,
            winner = %winner.id,
            theme = %winner.theme,
            score = %judgment.score_label(),
            "winner selected"
        );

        // PROMOTING
        run.enter(CycleStage::Promoting);
        let image = submissions
            .into_iter()
            .find(|s| s.id == winner.id)
            .map(|s| s.image)
            .unwrap_or_default();
        let metadata = PromotionMetadata::for_winner(&run.period, &winner, &judgment);

        self.status(&run, "Display", "Updating display", None).await;
        let display = self
            .collaborators
            .display
            .show(&image, &winner.theme, &metadata)
            .await
            .map_err(|err| {
                obs::emit_collaborator_error(&run.id, "display", &err);
                err.to_string()
            });

        self.status(&run, "Uploader", "Publishing to gallery", None).await;
        let publish = self
            .collaborators
            .publisher
            .publish(&image, &winner.source, &metadata)
            .await
            .map_err(|err| {
                obs::emit_collaborator_error(&run.id, "publisher", &err);
                err.to_string()
            });
        if let Ok(message) = &publish {
            info!(cycle_id = %run.id, "{message}");
        }

        // RECORDING
        run.enter(CycleStage::Recording);
        let entry = LedgerEntry::for_winner(&run.period, &winner, &judgment);
        let recorded = match self.collaborators.ledger.append(&entry).await {
            Ok(()) => true,
            Err(err) => {
                obs::emit_collaborator_error(&run.id, "ledger", &err);
                false
            }
        };

        run.enter(CycleStage::Done);
        self.status(&run, "Idle", "Waiting for next cycle", None).await;
        METRICS.inc_cycles_completed();
        METRICS.flush();
        obs::emit_cycle_finished(
            &run.id,
            run.duration_ms(),
            batch.rendered.len(),
            Some(&winner.id),
        );

        Ok(CycleReport {
            duration_ms: run.duration_ms(),
            cycle_id: run.id,
            period: run.period,
            output_dir: run.output_dir,
            stages: run.stages,
            generated,
            batch,
            outcome: CycleOutcome::Done {
                winner,
                judgment,
                promotion: PromotionReport {
                    display,
                    publish,
                    recorded,
                },
            },
        })
    }

    /// Run every candidate through the sandbox, at most `max_parallel` at a
    /// time. `rendered` keeps generation order.
    async fn execute_batch(&self, run: &CycleRun, candidates: Vec<Candidate>) -> Batch {
        let total = candidates.len();
        let deadline = self.config.deadline();
        let output_dir = run.output_dir.as_path();
        let executor = &self.executor;

        self.status(run, "Executor", "Rendering sketches", Some(format!("0/{total}")))
            .await;

        let mut results = std::pin::pin!(stream::iter(candidates)
            .map(|candidate| async move {
                write_source(output_dir, &candidate).await;
                let image_path = output_dir.join(format!("{}.png", candidate.id));
                let outcome = executor
                    .execute(&candidate.source, &image_path, deadline)
                    .await;
                (candidate, image_path, outcome)
            })
            .buffered(self.config.max_parallel));

        let mut batch = Batch::new(self.config.candidate_count);
        let mut finished = 0usize;
        while let Some((candidate, image_path, outcome)) = results.next().await {
            finished += 1;
            obs::emit_candidate_executed(&candidate.id, &outcome);
            METRICS.record_execution(outcome.status);
            let progress = format!("{finished}/{total}");
            self.status(run, "Executor", "Rendering sketches", Some(progress))
                .await;

            if outcome.is_success() {
                batch.rendered.push(candidate.with_artifact(image_path));
            } else {
                batch.failed.push((candidate.id, outcome));
            }
        }
        batch
    }

    /// Read the rendered images and ask the judge. Returns the submissions
    /// alongside the raw evaluation so promotion can reuse the bytes.
    async fn judge_batch(
        &self,
        batch: &Batch,
    ) -> std::result::Result<(Vec<Submission>, String), JudgingError> {
        let history = match self.collaborators.ledger.read_all().await {
            Ok(history) => history,
            Err(err) => {
                warn!(error = %err, "could not read preference ledger, judging without history");
                SEED_HISTORY.to_string()
            }
        };

        let mut submissions = Vec::with_capacity(batch.rendered.len());
        for candidate in &batch.rendered {
            let path = candidate.artifact().unwrap_or_else(|| Path::new(""));
            let image = tokio::fs::read(path)
                .await
                .map_err(|source| JudgingError::Image {
                    candidate_id: candidate.id.clone(),
                    source,
                })?;
            submissions.push(Submission {
                id: candidate.id.clone(),
                theme: candidate.theme.clone(),
                image,
            });
        }

        let evaluation = self
            .collaborators
            .judge
            .judge(&submissions, &history)
            .await?;
        if evaluation.trim().is_empty() {
            return Err(JudgingError::EmptyResponse);
        }
        Ok((submissions, evaluation))
    }

    async fn abort(
        &self,
        mut run: CycleRun,
        generated: usize,
        batch: Batch,
        reason: AbortReason,
    ) -> CycleReport {
        run.enter(CycleStage::Aborted);
        warn!(cycle_id = %run.id, reason = %reason, "cycle aborted");
        let task = capitalize(&reason.to_string());
        self.status(&run, "Idle", &task, Some("Waiting for next cycle".to_string()))
            .await;
        METRICS.inc_cycles_aborted();
        METRICS.flush();
        obs::emit_cycle_finished(&run.id, run.duration_ms(), batch.rendered.len(), None);

        CycleReport {
            duration_ms: run.duration_ms(),
            cycle_id: run.id,
            period: run.period,
            output_dir: run.output_dir,
            stages: run.stages,
            generated,
            batch,
            outcome: CycleOutcome::Aborted { reason },
        }
    }

    async fn status(&self, run: &CycleRun, agent: &str, task: &str, progress: Option<String>) {
        let update = StatusUpdate::new(agent, task, progress, run.clock());
        self.collaborators.status.update(&update).await;
    }
}

/// Keep the program text next to its image. Failure only costs diagnostics.
async fn write_source(output_dir: &Path, candidate: &Candidate) {
    let path = output_dir.join(format!("{}.{SOURCE_EXTENSION}", candidate.id));
    if let Err(err) = tokio::fs::write(&path, &candidate.source).await {
        warn!(candidate_id = %candidate.id, error = %err, "failed to write program source");
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::*;

    fn collaborators(generator: ScriptedGenerator, judge: ScriptedJudge) -> Collaborators {
        Collaborators {
            generator: Arc::new(generator),
            judge: Arc::new(judge),
            display: Arc::new(RecordingDisplay::new()),
            publisher: Arc::new(RecordingPublisher::new()),
            ledger: Arc::new(MemoryLedger::new()),
            status: Arc::new(StatusRecorder::new()),
        }
    }

    #[test]
    fn test_stage_and_reason_display() {
        assert_eq!(CycleStage::Aggregating.to_string(), "aggregating");
        assert_eq!(AbortReason::NothingRendered.to_string(), "no candidates rendered");
        assert_eq!(capitalize("no candidates rendered"), "No candidates rendered");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StudioConfig {
            max_parallel: 0,
            ..StudioConfig::default()
        };
        let result = BatchOrchestrator::new(
            config,
            collaborators(ScriptedGenerator::new(""), ScriptedJudge::replying("")),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_generate_batch_cycles_themes_and_drops_failures() {
        let generator = ScriptedGenerator::new("```rhai\nlet surface = new_surface(4, 4);\n```")
            .failing(1)
            .with_response(3, "   ");
        let orchestrator = BatchOrchestrator::new(
            StudioConfig::default(),
            collaborators(generator, ScriptedJudge::replying("")),
        )
        .unwrap();

        let themes = vec!["a".to_string(), "b".to_string()];
        let batch = orchestrator.generate_batch(5, &themes).await;
        let ids: Vec<_> = batch.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["sketch_000", "sketch_002", "sketch_004"]);
        let batch_themes: Vec<_> = batch.iter().map(|c| c.theme.as_str()).collect();
        assert_eq!(batch_themes, vec!["a", "a", "a"]);
        assert_eq!(batch[0].source, "let surface = new_surface(4, 4);\n");
    }

    #[tokio::test]
    async fn test_generate_batch_keeps_ids_three_digits() {
        let orchestrator = BatchOrchestrator::new(
            StudioConfig::default(),
            collaborators(ScriptedGenerator::new("let x = 1;"), ScriptedJudge::replying("")),
        )
        .unwrap();

        let batch = orchestrator.generate_batch(MAX_CANDIDATES + 1, &[]).await;
        assert_eq!(batch.len(), MAX_CANDIDATES);
        assert_eq!(batch.last().unwrap().id, "sketch_999");
        assert!(batch.windows(2).all(|w| w[0].id < w[1].id));
    }
}
