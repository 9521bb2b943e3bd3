//! Candidate execution with a hard wall-clock deadline.
//!
//! Each program runs on its own worker thread inside a fresh namespace. The
//! host waits for the result under `tokio::time::timeout`; if the deadline
//! passes first the worker is abandoned and anything it produces later is
//! dropped. The worker only ever holds its own copy of the program and a
//! sender, so an abandoned worker cannot touch orchestrator state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rhai::{EvalAltResult, Scope};
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tracing::debug;

use super::capability::Capabilities;
use super::error::{SandboxError, SandboxResult};
use super::surface::Surface;
use crate::domain::outcome::ExecutionOutcome;

/// Variable the program must leave its drawing in.
pub const SURFACE_VAR: &str = "surface";

/// PRNG seed for a program: the first 8 bytes of its SHA-256.
pub fn program_seed(source: &str) -> u64 {
    let digest = Sha256::digest(source.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Sets the shared abandonment flag when dropped.
///
/// Held by the awaiting side for the whole execution, so the worker's
/// progress hook trips on every exit path, including the awaiting future
/// being dropped mid-flight.
struct AbandonOnDrop(Arc<AtomicBool>);

impl AbandonOnDrop {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Evaluate `source` and encode its surface. Runs on the worker thread.
fn render(
    capabilities: &Capabilities,
    source: &str,
    deadline: Instant,
    abandoned: Arc<AtomicBool>,
) -> SandboxResult<Vec<u8>> {
    let engine = capabilities.build_engine(program_seed(source), deadline, Arc::clone(&abandoned));
    let mut scope = Scope::new();

    if let Err(err) = engine.run_with_scope(&mut scope, source) {
        let interrupted = matches!(*err, EvalAltResult::ErrorTerminated(..))
            || abandoned.load(Ordering::Relaxed)
            || Instant::now() >= deadline;
        return Err(if interrupted {
            SandboxError::Interrupted
        } else {
            SandboxError::Script(err.to_string())
        });
    }

    let surface = scope
        .get_value::<Surface>(SURFACE_VAR)
        .ok_or(SandboxError::NoSurface)?;
    surface.encode_png()
}

async fn write_artifact(path: &Path, png: &[u8], started: Instant) -> ExecutionOutcome {
    if png.is_empty() {
        return ExecutionOutcome::failed("surface encoded to an empty image", started.elapsed());
    }
    match tokio::fs::write(path, png).await {
        Ok(()) => ExecutionOutcome::succeeded(started.elapsed()),
        Err(err) => {
            // Never leave a partial file behind a failed outcome.
            let _ = tokio::fs::remove_file(path).await;
            ExecutionOutcome::failed(
                format!("failed to write {}: {err}", path.display()),
                started.elapsed(),
            )
        }
    }
}

/// Runs candidate programs in isolated namespaces.
#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    capabilities: Capabilities,
}

impl SandboxExecutor {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Run `source` and write its surface to `output_path` as PNG.
    ///
    /// Never fails: script errors, panics, a missing surface and write errors
    /// become `Failed`; passing `deadline` becomes `TimedOut`. At most one
    /// file is written, and only for `Succeeded`.
    pub async fn execute(
        &self,
        source: &str,
        output_path: &Path,
        deadline: Duration,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let guard = AbandonOnDrop::new();
        let (tx, rx) = oneshot::channel::<SandboxResult<Vec<u8>>>();

        let capabilities = self.capabilities.clone();
        let program = source.to_string();
        let abandoned = guard.flag();
        let hard_deadline = started + deadline;

        let spawned = std::thread::Builder::new()
            .name("easel-sandbox".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    render(&capabilities, &program, hard_deadline, abandoned)
                }))
                .unwrap_or_else(|payload| {
                    Err(SandboxError::Panicked(panic_message(payload.as_ref())))
                });
                // The receiver is gone when the host already timed out.
                let _ = tx.send(result);
            });

        if let Err(err) = spawned {
            return ExecutionOutcome::failed(
                SandboxError::Spawn(err.to_string()).to_string(),
                started.elapsed(),
            );
        }

        let outcome = match tokio::time::timeout(deadline, rx).await {
            Err(_elapsed) => ExecutionOutcome::timed_out(deadline, started.elapsed()),
            Ok(Err(_closed)) => ExecutionOutcome::failed(
                "sandbox worker exited without a result",
                started.elapsed(),
            ),
            Ok(Ok(Err(SandboxError::Interrupted))) => {
                ExecutionOutcome::timed_out(deadline, started.elapsed())
            }
            Ok(Ok(Err(err))) => ExecutionOutcome::failed(err.to_string(), started.elapsed()),
            Ok(Ok(Ok(png))) => write_artifact(output_path, &png, started).await,
        };
        drop(guard);

        debug!(
            status = %outcome.status,
            elapsed_ms = outcome.elapsed_ms,
            "sandbox execution finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::ExecutionStatus;

    const SQUARE: &str = r#"
let surface = new_surface(16, 16);
surface.set_source_rgb(1.0, 1.0, 1.0);
surface.paint();
"#;

    #[test]
    fn test_program_seed_is_stable() {
        assert_eq!(program_seed("abc"), program_seed("abc"));
        assert_ne!(program_seed("abc"), program_seed("abd"));
    }

    #[test]
    fn test_abandon_flag_set_on_drop() {
        let guard = AbandonOnDrop::new();
        let flag = guard.flag();
        assert!(!flag.load(Ordering::Relaxed));
        drop(guard);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_panic_message_variants() {
        let p: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(p.as_ref()), "static");
        let p: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "owned");
        let p: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(p.as_ref()), "unknown panic payload");
    }

    #[tokio::test]
    async fn test_execute_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sketch_000.png");
        let outcome = SandboxExecutor::default()
            .execute(SQUARE, &out, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status, ExecutionStatus::Succeeded, "{}", outcome.message);
        assert!(std::fs::metadata(&out).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_script_error_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bad.png");
        let outcome = SandboxExecutor::default()
            .execute("let surface = ;", &out, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome.message.contains("script error"));
        assert!(!out.exists());
    }
}
