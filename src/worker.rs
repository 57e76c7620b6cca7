//! Background worker
//!
//! All PDF, LLM and filesystem work runs on one dedicated thread with its own
//! current-thread tokio runtime, so the job future never has to be `Send` and
//! the caller stays responsive. The caller keeps:
//!
//! - a [`CancelToken`] for a cooperative stop at the next page boundary
//! - a [`Killer`] that drops the in-flight job future as a last resort
//! - a oneshot carrying the [`WorkerResult`] back

use crate::analysis::{LlmClassifier, Summarizer};
use crate::config::Config;
use crate::llm::OpenAIProvider;
use crate::pipeline::{CancelToken, Pipeline, Reporter, RunController, RunOutcome};
use anyhow::{Context, Result};
use log::debug;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};

/// How long `stop` waits for a cooperative stop before killing the job.
pub const STOP_GRACE: Duration = Duration::from_secs(3);

/// How a background job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResult {
    /// Finished; carries the main output file, if one was written.
    Completed(Option<PathBuf>),
    /// Stopped cooperatively; progress is checkpointed.
    Stopped,
    Failed(String),
    /// Killed after the grace period.
    Terminated,
}

/// Forced-stop trigger for a running job.
#[derive(Debug, Clone)]
pub struct Killer(Arc<Notify>);

impl Killer {
    pub fn kill(&self) {
        self.0.notify_one();
    }
}

/// Caller side of a background job.
pub struct WorkerHandle {
    cancel: CancelToken,
    killer: Killer,
    result: oneshot::Receiver<WorkerResult>,
}

impl WorkerHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn killer(&self) -> Killer {
        self.killer.clone()
    }

    /// Wait for the job to finish on its own.
    pub async fn join(self) -> WorkerResult {
        self.result
            .await
            .unwrap_or_else(|_| WorkerResult::Failed("worker panicked".to_string()))
    }

    /// Ask the job to stop, then kill it if it has not finished within `grace`.
    pub async fn stop(mut self, grace: Duration) -> WorkerResult {
        self.cancel.cancel();
        match tokio::time::timeout(grace, &mut self.result).await {
            Ok(result) => result.unwrap_or_else(|_| WorkerResult::Failed("worker panicked".to_string())),
            Err(_) => {
                debug!("worker did not stop within {:?}, terminating", grace);
                self.killer.kill();
                self.result.await.unwrap_or(WorkerResult::Terminated)
            }
        }
    }
}

/// Run `job` on a dedicated worker thread.
///
/// The job receives the cancel token it should poll; an `Err` becomes
/// [`WorkerResult::Failed`].
pub fn spawn<F, Fut>(job: F) -> Result<WorkerHandle>
where
    F: FnOnce(CancelToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<WorkerResult>> + 'static,
{
    let cancel = CancelToken::new();
    let kill = Arc::new(Notify::new());
    let (tx, rx) = oneshot::channel();

    let job_cancel = cancel.clone();
    let job_kill = kill.clone();
    std::thread::Builder::new()
        .name("lectern-worker".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = tx.send(WorkerResult::Failed(format!("Failed to start runtime: {}", e)));
                    return;
                }
            };

            let result = runtime.block_on(async move {
                tokio::select! {
                    outcome = job(job_cancel) => match outcome {
                        Ok(result) => result,
                        Err(e) => WorkerResult::Failed(format!("{:#}", e)),
                    },
                    _ = job_kill.notified() => WorkerResult::Terminated,
                }
            });
            let _ = tx.send(result);
        })
        .context("Failed to spawn worker thread")?;

    Ok(WorkerHandle {
        cancel,
        killer: Killer(kill),
        result: rx,
    })
}

/// What to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub pdf: PathBuf,
    pub test_pages: i64,
    pub interval: i64,
}

/// Start an analysis run in the background with OpenAI-backed stages.
pub fn spawn_analysis(config: Config, request: AnalysisRequest, reporter: Reporter) -> Result<WorkerHandle> {
    spawn(move |cancel| async move {
        let page_llm = Arc::new(OpenAIProvider::from_env(&config.api_base, &config.page_model)?);
        let summary_llm = Arc::new(OpenAIProvider::from_env(&config.api_base, &config.summary_model)?);

        let pipeline = Pipeline {
            classifier: Arc::new(LlmClassifier::new(page_llm)),
            summarizer: Summarizer::new(summary_llm).with_context_window(config.context_window),
            reporter: reporter.clone(),
            cancel,
        };
        let controller = RunController::new(pipeline, &config.base_dir);

        let outcome = controller
            .run(&request.pdf, request.test_pages, request.interval)
            .await?;
        Ok::<_, anyhow::Error>(match outcome {
            RunOutcome::Completed { final_path, .. } => WorkerResult::Completed(final_path),
            RunOutcome::Stopped { .. } => {
                reporter.warn("Analysis stopped; progress saved for resume");
                WorkerResult::Stopped
            }
            RunOutcome::Failed { page, message, .. } => {
                WorkerResult::Failed(format!("page {}: {}", page + 1, message))
            }
        })
    })
}
