use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const JOBS_PROCESSED: &str = "tag_jobs_processed_total";
pub const JOBS_SUCCEEDED: &str = "tag_jobs_succeeded_total";
pub const JOBS_FAILED: &str = "tag_jobs_failed_total";
pub const ORACLE_SECONDS: &str = "tag_oracle_seconds";

/// Register help text for every metric the drain records.
pub fn describe_metrics() {
    metrics::describe_counter!(JOBS_PROCESSED, "Jobs taken from the queue");
    metrics::describe_counter!(JOBS_SUCCEEDED, "Jobs that yielded a valid tag");
    metrics::describe_counter!(JOBS_FAILED, "Jobs reported back as failed");
    metrics::describe_histogram!(ORACLE_SECONDS, "Latency of one vision model call");
}

/// Install the global Prometheus recorder and describe the drain metrics.
///
/// The returned handle renders the text exposition format, which the worker
/// writes out once the run is over.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}
