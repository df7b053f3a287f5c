use std::process::ExitCode;

use tag_vision_worker::{
    app_state::WorkerState,
    config::WorkerConfig,
    services::{
        drain, images::HttpImageFetcher, queue::RemoteQueueClient,
        tag_validation::TagValidator, vision::LmStudioClient,
    },
    telemetry,
};
use tracing_subscriber::EnvFilter;

/// One pass over the pending queue. Scheduling repeated runs is left to
/// whatever invokes the binary (cron, systemd timer, ...).
#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting player tag queue worker");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        remote_api = %config.remote_api_url,
        lm_studio = %config.lm_studio_endpoint,
        model = %config.vision_model,
        "Configuration loaded"
    );

    // Initialize Prometheus metrics recorder
    let metrics_handle = match telemetry::install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            return ExitCode::FAILURE;
        }
    };

    let state = match build_state(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize services");
            return ExitCode::FAILURE;
        }
    };

    let outcome = drain::drain_queue(&state).await;

    if let Some(path) = &config.metrics_file {
        match tokio::fs::write(path, metrics_handle.render()).await {
            Ok(()) => tracing::debug!(path = %path, "Wrote metrics snapshot"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Failed to write metrics snapshot"),
        }
    }

    match outcome {
        Ok(summary) => {
            if summary.processed == 0 {
                tracing::info!("No pending requests to process");
            }
            tracing::info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Processing complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch pending requests");
            ExitCode::FAILURE
        }
    }
}

fn build_state(config: &WorkerConfig) -> Result<WorkerState, Box<dyn std::error::Error>> {
    let queue = RemoteQueueClient::new(
        &config.remote_api_url,
        Some(config.queue_api_secret.clone()),
    )?;

    let images = HttpImageFetcher::new(config.image_timeout())?;

    let oracle = LmStudioClient::new(
        &config.lm_studio_endpoint,
        &config.vision_model,
        config.vision_max_tokens,
        config.vision_timeout(),
    )?;

    let validator = TagValidator::new(config.alphabet()?);
    tracing::info!(alphabet = %validator.alphabet(), "Tag validator ready");

    Ok(WorkerState::new(queue, images, oracle, validator))
}
