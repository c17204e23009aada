use crate::error::Result;
use crate::job::JobResult;
use async_trait::async_trait;
use tracing::instrument;

/// One way of running a job. Implementations borrow the job mutably for the
/// duration of the run, so the job outlives the engine and can be inspected
/// afterwards.
#[async_trait]
pub trait Engine: Send {
    /// Takes the job to a terminal state. On error the job is `Failed`.
    async fn run(&mut self) -> Result<()>;

    /// Removes the working directory of a job that did not succeed; a no-op
    /// otherwise.
    fn cleanup(&mut self) -> Result<()>;

    fn report(&self) -> JobResult;
}

/// Runs an engine, cleans up after it, and collects the outcome.
#[instrument(skip_all)]
pub async fn drive<E: Engine + ?Sized>(engine: &mut E) -> JobResult {
    let outcome = engine.run().await;
    if let Err(err) = engine.cleanup() {
        tracing::error!(error = ?err, "Failed to remove working directory");
    }
    let mut result = engine.report();
    if let Err(err) = outcome {
        tracing::error!(error = ?err, "Job failed");
        result.error = Some(err);
    }
    result
}
