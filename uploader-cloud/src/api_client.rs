//! HTTP client for the presign API.
//!
//! Exchanges `(filename, contentType)` plus a bearer token for a presigned
//! PUT URL. Uses reqwest with JSON deserialization.

use crate::error::{HttpFailure, body_snippet, transport_cause};
use crate::types::{PresignResponse, UploadTarget};
use reqwest::Client;
use tracing::debug;

/// Client for the endpoint that issues presigned upload URLs.
pub struct PresignClient {
    client: Client,
    endpoint: String,
    body_snippet_limit: usize,
}

impl PresignClient {
    pub fn new(client: Client, endpoint: impl Into<String>, body_snippet_limit: usize) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            body_snippet_limit,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Requests an upload slot for `object_key`.
    pub async fn request_upload_target(
        &self,
        access_token: &str,
        object_key: &str,
        content_type: &str,
    ) -> Result<UploadTarget, HttpFailure> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("filename", object_key), ("contentType", content_type)])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| HttpFailure::Transport {
                cause: transport_cause(e),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| HttpFailure::Transport {
            cause: transport_cause(e),
        })?;

        if !status.is_success() {
            return Err(HttpFailure::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body_snippet: body_snippet(&body, self.body_snippet_limit),
            });
        }

        let parsed: PresignResponse =
            serde_json::from_str(&body).map_err(|e| HttpFailure::MalformedResponse {
                detail: format!("presign response is not valid JSON: {e}"),
            })?;

        let presigned_url = parsed
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| HttpFailure::MalformedResponse {
                detail: "presign response has no url".to_string(),
            })?;

        debug!(
            "received presigned URL for {object_key} (public URL {})",
            if parsed.public_url.is_some() { "provided" } else { "absent" }
        );

        Ok(UploadTarget {
            presigned_url,
            public_url: parsed.public_url,
        })
    }
}
