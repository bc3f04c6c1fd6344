//! Uploader configuration.

use crate::error::{UploadError, UploadResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Configuration for the token cache and upload orchestrator.
///
/// Resolved by the host (CLI flags, environment) before anything here runs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Full URL of the OAuth2 token endpoint. Takes precedence over
    /// `cognito_domain`.
    pub token_endpoint: Option<String>,

    /// Cognito hosted domain (e.g., "my-pool.auth.us-east-1.amazoncognito.com").
    /// The token endpoint is derived as `https://<domain>/oauth2/token`.
    pub cognito_domain: Option<String>,

    /// OAuth2 client id.
    pub client_id: String,

    /// OAuth2 client secret.
    pub client_secret: String,

    /// Optional scope requested with the client-credentials grant.
    pub scope: Option<String>,

    /// URL of the presign API.
    pub presign_endpoint: Option<String>,

    /// Tokens are refreshed this many seconds before they expire.
    pub token_refresh_margin_secs: i64,

    /// Timeout applied to every network call.
    pub request_timeout_secs: u64,

    /// Maximum characters of a response body carried in an error.
    pub body_snippet_limit: usize,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            token_endpoint: None,
            cognito_domain: None,
            client_id: String::new(),
            client_secret: String::new(),
            scope: None,
            presign_endpoint: None,
            token_refresh_margin_secs: 30,
            request_timeout_secs: 30,
            body_snippet_limit: 512,
        }
    }
}

impl fmt::Debug for UploaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploaderConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("cognito_domain", &self.cognito_domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("presign_endpoint", &self.presign_endpoint)
            .field("token_refresh_margin_secs", &self.token_refresh_margin_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("body_snippet_limit", &self.body_snippet_limit)
            .finish()
    }
}

impl UploaderConfig {
    /// Resolves the token endpoint URL.
    pub fn token_url(&self) -> UploadResult<String> {
        if let Some(endpoint) = non_empty(&self.token_endpoint) {
            return Ok(endpoint.to_string());
        }
        let domain = non_empty(&self.cognito_domain).ok_or_else(|| {
            UploadError::ConfigurationMissing("token endpoint or cognito domain".to_string())
        })?;
        let domain = domain.trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            Ok(format!("{domain}/oauth2/token"))
        } else {
            Ok(format!("https://{domain}/oauth2/token"))
        }
    }

    /// Presign endpoint, if one is configured.
    pub fn presign_url(&self) -> Option<&str> {
        non_empty(&self.presign_endpoint)
    }

    /// Scope to request, ignoring blank values.
    pub fn effective_scope(&self) -> Option<&str> {
        non_empty(&self.scope)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds the HTTP client shared by every step.
    pub fn http_client(&self) -> UploadResult<reqwest::Client> {
        if self.request_timeout_secs == 0 {
            return Err(UploadError::InvalidConfiguration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
            .map_err(|e| UploadError::InvalidConfiguration(format!("HTTP client: {e}")))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
