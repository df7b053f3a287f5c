use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

/// Stage of a tag extraction job within a single drain run.
///
/// Stages only move forward; any failure jumps straight to `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum JobStage {
    Pending,
    Fetching,
    Invoking,
    Validating,
    Submitted,
}

/// A pending "find the player tag" request as served by the remote queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,

    #[serde(default, deserialize_with = "lenient")]
    pub message_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub channel_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub guild_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub user_tag: Option<String>,

    /// Epoch milliseconds at which the request was queued.
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<i64>,

    #[serde(default, deserialize_with = "lenient")]
    pub retry_count: u32,

    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Pass-through fields fall back to their default on `null` or a mistyped
/// value, so one odd record cannot break the whole pending batch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl Job {
    pub fn queued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}

/// Outcome record submitted back to the queue, one per job.
///
/// Field names on the wire follow the queue API (`requestId`, `playerTag`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    #[serde(rename = "requestId")]
    pub job_id: String,

    pub success: bool,

    #[serde(rename = "playerTag", skip_serializing_if = "Option::is_none", default)]
    pub extracted_tag: Option<String>,

    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
}

impl JobResult {
    pub fn success(job_id: &str, tag: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: true,
            extracted_tag: Some(tag),
            error_message: None,
        }
    }

    pub fn failure(job_id: &str, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: false,
            extracted_tag: None,
            error_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_only_requires_id() {
        let job: Job = serde_json::from_str(r#"{"id": "req-1"}"#).unwrap();
        assert_eq!(job.id, "req-1");
        assert!(job.image_urls.is_empty());
        assert_eq!(job.retry_count, 0);
        assert!(job.queued_at().is_none());
    }

    #[test]
    fn test_job_passes_through_optional_fields() {
        let job: Job = serde_json::from_str(
            r#"{
                "id": "req-2",
                "messageId": "m1",
                "channelId": "c1",
                "guildId": "g1",
                "userId": "u1",
                "userTag": "someone#0001",
                "timestamp": 1700000000000,
                "retryCount": 2,
                "imageUrls": ["https://cdn.example/a.png", "https://cdn.example/b.png"]
            }"#,
        )
        .unwrap();
        assert_eq!(job.user_tag.as_deref(), Some("someone#0001"));
        assert_eq!(job.retry_count, 2);
        assert_eq!(job.image_urls.len(), 2);
        assert_eq!(job.image_urls[0], "https://cdn.example/a.png");
        assert_eq!(job.queued_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_mistyped_pass_through_fields_fall_back() {
        let job: Job = serde_json::from_str(
            r#"{
                "id": "req-3",
                "userId": 42,
                "userTag": null,
                "timestamp": "2025-01-01",
                "retryCount": null,
                "imageUrls": ["https://cdn.example/a.png"]
            }"#,
        )
        .unwrap();
        assert_eq!(job.user_id, None);
        assert_eq!(job.user_tag, None);
        assert_eq!(job.timestamp, None);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.image_urls, ["https://cdn.example/a.png"]);

        let job: Job = serde_json::from_str(r#"{"id": "req-4", "retryCount": -1}"#).unwrap();
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn test_success_result_wire_shape() {
        let value = serde_json::to_value(JobResult::success("req-1", "#2YLJPV0LQ".into())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"requestId": "req-1", "success": true, "playerTag": "#2YLJPV0LQ"})
        );
    }

    #[test]
    fn test_failure_result_omits_tag() {
        let value = serde_json::to_value(JobResult::failure("req-1", "no images")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"requestId": "req-1", "success": false, "errorMessage": "no images"})
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(JobStage::Fetching.to_string(), "fetching");
        assert_eq!(JobStage::Submitted.to_string(), "submitted");
    }
}
