use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::images::RawImage;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Instruction sent ahead of the screenshots.
pub const TAG_PROMPT: &str = concat!(
    "Extract the player tag from the following Clash Royale profile screenshot without mistakes, ",
    "even if the image quality is poor. The tag may not be visible at all; in that case answer ",
    "exactly \"NOTAG\". Labels such as \"Clan War Veteran\" are not tags and must be ignored.\n",
    "Task: find the text field holding the player tag. It sits in the profile area below the ",
    "player name and always starts with # (example: #2YLJPV0LQ). Always include the # character.\n",
    "Answer with the recognised tag or \"NOTAG\" only: no extra words, no explanation, no quotes.\n",
    "Quality: read through blur, compression and noise. When a character is unclear, pick the ",
    "most likely one given the official tag format (uppercase A-Z and digits 0-9, starting with #, ",
    "no letter O: a round glyph is the digit 0) and typical confusions such as 0 vs Q, 1 vs I, ",
    "8 vs B and Y vs V. Compare the result with valid tag patterns and correct obvious ",
    "recognition errors.\n",
    "Correctness matters far more than speed."
);

/// Vision-capable model that transcribes text from screenshots.
#[async_trait]
pub trait VisionOracle: Send + Sync {
    /// Send the tag instruction plus `images` and return the raw answer text.
    async fn transcribe(&self, images: Vec<RawImage>) -> Result<String, OracleError>;
}

/// Client for a local OpenAI-compatible chat completions endpoint (LM Studio).
pub struct LmStudioClient {
    http: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ChatContent<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl LmStudioClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(OracleError::Transport)?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }
}

fn data_url(image: &RawImage) -> String {
    format!(
        "data:{};base64,{}",
        image.media_type(),
        base64::engine::general_purpose::STANDARD.encode(&image.bytes)
    )
}

/// Pull `choices[0].message.content` out of a completion body.
///
/// Bodies that are not a chat completion are returned as-is so the tag
/// validator still gets to look at them.
fn answer_text(body: String) -> String {
    let content = serde_json::from_str::<ChatResponse>(&body)
        .ok()
        .and_then(|resp| resp.choices.into_iter().next())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);

    content.unwrap_or(body)
}

#[async_trait]
impl VisionOracle for LmStudioClient {
    async fn transcribe(&self, images: Vec<RawImage>) -> Result<String, OracleError> {
        let mut content = Vec::with_capacity(images.len() + 1);
        content.push(ChatContent::Text { text: TAG_PROMPT });
        content.extend(images.iter().map(|image| ChatContent::ImageUrl {
            image_url: ImageUrl {
                url: data_url(image),
            },
        }));

        let request_body = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body = response.text().await?;
        Ok(answer_text(body))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inference endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}
