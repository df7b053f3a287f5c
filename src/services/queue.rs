use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::models::job::{Job, JobResult};

const PENDING_PATH: &str = "/api/queue/pending";
const RESULT_PATH: &str = "/api/queue/result";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote work queue holding tag extraction jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Snapshot of the jobs currently waiting for a result.
    async fn pending(&self) -> Result<Vec<Job>, QueueError>;

    /// Report the outcome of one job.
    async fn submit(&self, result: &JobResult) -> Result<(), QueueError>;
}

#[derive(Deserialize)]
struct PendingResponse {
    #[serde(default)]
    requests: Vec<Job>,
}

/// HTTP client for the bot backend's queue endpoints.
pub struct RemoteQueueClient {
    http: Client,
    base_url: String,
    api_secret: Option<String>,
}

impl RemoteQueueClient {
    pub fn new(base_url: &str, api_secret: Option<String>) -> Result<Self, QueueError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_secret: api_secret.filter(|s| !s.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_secret {
            Some(secret) => request.bearer_auth(secret),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, QueueError> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(QueueError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

#[async_trait]
impl JobQueue for RemoteQueueClient {
    async fn pending(&self) -> Result<Vec<Job>, QueueError> {
        let response = self
            .authorize(self.http.get(self.url(PENDING_PATH)))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body = response.text().await?;
        let pending: PendingResponse = serde_json::from_str(&body)?;
        Ok(pending.requests)
    }

    async fn submit(&self, result: &JobResult) -> Result<(), QueueError> {
        let response = self
            .authorize(self.http.post(self.url(RESULT_PATH)))
            .json(result)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Queue API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed queue response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = RemoteQueueClient::new("https://bot.example/", None).unwrap();
        assert_eq!(client.url(PENDING_PATH), "https://bot.example/api/queue/pending");
    }

    #[test]
    fn test_empty_secret_disables_auth() {
        let client = RemoteQueueClient::new("https://bot.example", Some(String::new())).unwrap();
        assert!(client.api_secret.is_none());
    }

    #[test]
    fn test_pending_response_without_requests() {
        let pending: PendingResponse = serde_json::from_str("{}").unwrap();
        assert!(pending.requests.is_empty());
    }

    #[test]
    fn test_pending_batch_survives_mistyped_optional_fields() {
        let pending: PendingResponse = serde_json::from_str(
            r#"{"requests":[
                {"id":"a","imageUrls":["x"],"retryCount":null,"timestamp":"2025-01-01"},
                {"id":"b","imageUrls":["y"]}
            ]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = pending.requests.iter().map(|job| job.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(pending.requests[0].retry_count, 0);
        assert!(pending.requests[0].queued_at().is_none());
    }

    #[test]
    fn test_pending_response_requires_job_id() {
        let parsed = serde_json::from_str::<PendingResponse>(r#"{"requests":[{"imageUrls":[]}]}"#);
        assert!(parsed.is_err());
    }
}
