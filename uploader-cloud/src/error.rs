//! Upload workflow error types.

use thiserror::Error;

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Failures of a client-credentials token exchange.
///
/// `Clone` so every caller sharing one in-flight exchange receives the same
/// failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token endpoint unreachable: {cause}")]
    TransportFailed { cause: String },

    #[error("token request failed: {status} - {body}")]
    RequestFailed { status: u16, body: String },

    #[error("token response could not be parsed: {detail}")]
    ParseFailed { detail: String },
}

/// Why a single HTTP step (presign or storage PUT) failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HttpFailure {
    #[error("{status} {status_text} {body_snippet}")]
    Status {
        status: u16,
        status_text: String,
        body_snippet: String,
    },

    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },

    #[error("connection error: {cause}")]
    Transport { cause: String },
}

impl HttpFailure {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that can end an upload run.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no file selected: choose a file to upload")]
    NoFileSelected,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] TokenError),

    #[error("failed to get presigned URL: {0}")]
    PresignFailed(HttpFailure),

    #[error("upload failed: {0}")]
    UploadFailed(HttpFailure),
}

impl UploadError {
    /// Name of the workflow step the error is attributed to.
    pub fn step(&self) -> &'static str {
        match self {
            UploadError::ConfigurationMissing(_) | UploadError::InvalidConfiguration(_) => {
                "configuration"
            }
            UploadError::NoFileSelected => "file selection",
            UploadError::AuthenticationFailed(_) => "authentication",
            UploadError::PresignFailed(_) => "presign",
            UploadError::UploadFailed(_) => "upload",
        }
    }
}

/// Collapses a transport error into a message that is safe to show.
///
/// The URL is dropped because a presigned URL carries its signature in the
/// query string.
pub(crate) fn transport_cause(err: reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connect failed"
    } else {
        "request failed"
    };
    let err = err.without_url();
    let mut cause = format!("{kind}: {err}");
    let mut source = std::error::Error::source(&err);
    while let Some(inner) = source {
        cause.push_str(": ");
        cause.push_str(&inner.to_string());
        source = inner.source();
    }
    cause
}

/// Truncates a response body to at most `limit` characters.
pub(crate) fn body_snippet(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let mut snippet: String = trimmed.chars().take(limit).collect();
    snippet.push_str("...");
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_keeps_short_bodies() {
        assert_eq!(body_snippet("  forbidden \n", 32), "forbidden");
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        assert_eq!(body_snippet("ééééé", 3), "ééé...");
    }

    #[test]
    fn snippet_of_empty_body() {
        assert_eq!(body_snippet("", 10), "");
    }
}
