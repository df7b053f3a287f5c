use std::io::Read;
use std::process::ExitCode;

use tag_vision_worker::{
    config::BridgeConfig,
    services::chat_bridge::{BridgeError, ChatBridge, GeminiRequest},
};
use tracing_subscriber::EnvFilter;

/// Reads one Gemini `generateContent` request from stdin and prints the
/// Gemini-shaped answer from the local model to stdout.
#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays a single JSON document
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(&config).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Bridge request failed");
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &BridgeConfig) -> Result<String, Box<dyn std::error::Error>> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let request: GeminiRequest = serde_json::from_str(&input).map_err(BridgeError::Json)?;

    let bridge = ChatBridge::new(&config.lm_studio_endpoint, config.timeout())?;
    tracing::info!(endpoint = %config.lm_studio_endpoint, "Forwarding request to local model");

    let response = bridge.generate(&request).await?;
    Ok(serde_json::to_string(&response)?)
}
