//! Object storage PUT against a presigned URL.
//!
//! The presigned URL carries its own authorization, so no bearer token is
//! ever sent to storage.

use crate::error::{HttpFailure, body_snippet, transport_cause};
use crate::types::UploadTarget;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Uploads raw bytes to presigned URLs.
pub struct StorageTransport {
    client: Client,
    body_snippet_limit: usize,
}

impl StorageTransport {
    pub fn new(client: Client, body_snippet_limit: usize) -> Self {
        Self {
            client,
            body_snippet_limit,
        }
    }

    /// PUTs `data` to the target's presigned URL.
    pub async fn put(
        &self,
        target: &UploadTarget,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), HttpFailure> {
        let size = data.len();

        let resp = self
            .client
            .put(&target.presigned_url)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| HttpFailure::Transport {
                cause: transport_cause(e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.map_err(|e| HttpFailure::Transport {
                cause: transport_cause(e),
            })?;
            return Err(HttpFailure::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body_snippet: body_snippet(&body, self.body_snippet_limit),
            });
        }

        debug!("uploaded {size} bytes ({content_type})");
        Ok(())
    }
}
