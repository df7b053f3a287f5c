use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::app_state::WorkerState;
use crate::models::job::{Job, JobResult, JobStage};
use crate::models::tag::{Rejection, TagOutcome};
use crate::services::images::ImageError;
use crate::services::queue::QueueError;
use crate::services::vision::OracleError;
use crate::telemetry::{JOBS_FAILED, JOBS_PROCESSED, JOBS_SUCCEEDED, ORACLE_SECONDS};

/// Error message reported when the model answer holds no trustworthy tag.
pub const TAG_NOT_FOUND_MESSAGE: &str = "Could not extract player tag from images";

/// Counters for one drain run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Why a single job ended without a tag. Never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error(transparent)]
    NoImages(#[from] ImageError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("{msg}", msg = TAG_NOT_FOUND_MESSAGE)]
    TagNotFound(Rejection),

    #[error("Job pipeline panicked: {0}")]
    Panicked(String),
}

/// Process every pending job once, in queue order, and report the counts.
///
/// Only a failure to list the pending jobs is returned as an error. Each
/// job's failure is reported back to the queue as a failed result, and a
/// result that cannot be submitted is logged and dropped.
pub async fn drain_queue(state: &WorkerState) -> Result<RunSummary, QueueError> {
    let run_id = Uuid::new_v4();

    let jobs = state.queue.pending().await?;
    tracing::info!(run_id = %run_id, count = jobs.len(), "Fetched pending jobs");

    let mut summary = RunSummary::default();
    let total = jobs.len();

    for (index, job) in jobs.iter().enumerate() {
        let span = tracing::info_span!("job", run_id = %run_id, job_id = %job.id);
        let succeeded = run_job(state, job, index + 1, total).instrument(span).await;

        summary.processed += 1;
        if succeeded {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }

    tracing::info!(
        run_id = %run_id,
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Drain run complete"
    );

    Ok(summary)
}

/// Drive one job to `Submitted`. Returns whether a tag was extracted.
async fn run_job(state: &WorkerState, job: &Job, position: usize, total: usize) -> bool {
    tracing::info!(
        position,
        total,
        user_tag = job.user_tag.as_deref().unwrap_or(""),
        images = job.image_urls.len(),
        retry_count = job.retry_count,
        queued_at = ?job.queued_at(),
        stage = %JobStage::Pending,
        "Processing job"
    );

    let outcome = AssertUnwindSafe(extract_tag(state, job))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(JobFailure::Panicked(panic_message(panic.as_ref()))));

    metrics::counter!(JOBS_PROCESSED).increment(1);

    let result = match outcome {
        Ok(tag) => {
            tracing::info!(tag = %tag, "Extracted player tag");
            metrics::counter!(JOBS_SUCCEEDED).increment(1);
            JobResult::success(&job.id, tag)
        }
        Err(failure) => {
            match &failure {
                JobFailure::TagNotFound(rejection) => {
                    tracing::warn!(reason = %rejection, "No usable tag in model answer")
                }
                other => tracing::warn!(error = %other, "Job failed"),
            }
            metrics::counter!(JOBS_FAILED).increment(1);
            JobResult::failure(&job.id, failure.to_string())
        }
    };

    let succeeded = result.success;
    match state.queue.submit(&result).await {
        Ok(()) => {
            tracing::info!(success = succeeded, stage = %JobStage::Submitted, "Submitted result")
        }
        Err(e) => tracing::error!(
            success = succeeded,
            error = %e,
            "Failed to submit result, dropping it"
        ),
    }

    succeeded
}

/// Fetch, invoke, validate. Short-circuits on the first failing stage.
async fn extract_tag(state: &WorkerState, job: &Job) -> Result<String, JobFailure> {
    tracing::debug!(stage = %JobStage::Fetching, "Downloading images");
    let images = state.images.fetch_all(&job.image_urls).await?;

    tracing::debug!(stage = %JobStage::Invoking, images = images.len(), "Calling vision model");
    let start = Instant::now();
    let answer = state.oracle.transcribe(images).await;
    metrics::histogram!(ORACLE_SECONDS).record(start.elapsed().as_secs_f64());
    let answer = answer?;

    tracing::debug!(stage = %JobStage::Validating, answer = %answer.trim(), "Validating answer");
    match state.validator.validate(&answer) {
        TagOutcome::Found(tag) => Ok(tag),
        TagOutcome::NotFound(rejection) => Err(JobFailure::TagNotFound(rejection)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
