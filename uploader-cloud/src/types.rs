//! Shared types for token acquisition and upload runs.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Content type sent when the selected file does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// OAuth2 client id/secret pair. Never printed.
#[derive(Clone)]
pub struct ClientCredential {
    id: String,
    secret: String,
}

impl ClientCredential {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A bearer token obtained from the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_in_secs: i64,
}

impl TokenRecord {
    /// Absolute expiry, or `None` if it falls outside the representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.expires_in_secs)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
    }

    /// True while `now` is strictly before `expires_at - margin_secs`.
    /// A record whose deadline cannot be computed is never usable.
    pub fn is_usable_at(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        self.expires_at()
            .zip(TimeDelta::try_seconds(margin_secs))
            .and_then(|(expires_at, margin)| expires_at.checked_sub_signed(margin))
            .is_some_and(|deadline| now < deadline)
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Successful token endpoint body. Extra fields (`token_type`) are ignored.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Body returned by the presign API.
#[derive(Deserialize)]
pub(crate) struct PresignResponse {
    pub url: Option<String>,
    #[serde(rename = "publicUrl")]
    pub public_url: Option<String>,
}

/// Where one upload goes. Lives for a single run.
#[derive(Clone)]
pub struct UploadTarget {
    pub presigned_url: String,
    pub public_url: Option<String>,
}

impl fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The query string is the signature.
        let base = self
            .presigned_url
            .split_once('?')
            .map_or(self.presigned_url.as_str(), |(base, _)| base);
        f.debug_struct("UploadTarget")
            .field("presigned_url", &format_args!("{base}?<redacted>"))
            .field("public_url", &self.public_url)
            .finish()
    }
}

/// A file picked for upload.
#[derive(Clone, Debug)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            data,
        }
    }

    pub fn effective_content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Input of a single orchestration run.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub file: Option<SelectedFile>,
    pub role_namespace: String,
}

impl UploadRequest {
    pub fn new(file: Option<SelectedFile>, role_namespace: impl Into<String>) -> Self {
        Self {
            file,
            role_namespace: role_namespace.into(),
        }
    }
}

/// Object key for `filename` under `namespace`.
///
/// The namespace is used as given; hosts restrict it to the role namespaces
/// the presign API serves.
pub fn object_key(namespace: &str, filename: &str) -> String {
    let namespace = namespace.trim_end_matches('/');
    if namespace.is_empty() {
        filename.to_string()
    } else {
        format!("{namespace}/{filename}")
    }
}

/// Public location reported after a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicUrl {
    Provided(String),
    NotProvided,
}

impl PublicUrl {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PublicUrl::Provided(url) => Some(url),
            PublicUrl::NotProvided => None,
        }
    }
}

impl From<Option<String>> for PublicUrl {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(url) if !url.trim().is_empty() => PublicUrl::Provided(url),
            _ => PublicUrl::NotProvided,
        }
    }
}

impl fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicUrl::Provided(url) => f.write_str(url),
            PublicUrl::NotProvided => f.write_str("Uploaded. No public URL returned by API."),
        }
    }
}

/// Phase of an upload run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Idle,
    Authenticating,
    RequestingUploadSlot,
    Uploading,
    Succeeded { public_url: PublicUrl },
    Failed { message: String },
}

impl WorkflowStatus {
    fn rank(&self) -> u8 {
        match self {
            WorkflowStatus::Idle => 0,
            WorkflowStatus::Authenticating => 1,
            WorkflowStatus::RequestingUploadSlot => 2,
            WorkflowStatus::Uploading => 3,
            WorkflowStatus::Succeeded { .. } | WorkflowStatus::Failed { .. } => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 4
    }

    /// Transitions only move forward; terminal states are final.
    pub fn can_advance_to(&self, next: &WorkflowStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn label(&self) -> String {
        match self {
            WorkflowStatus::Idle => "Idle".to_string(),
            WorkflowStatus::Authenticating => "Authenticating...".to_string(),
            WorkflowStatus::RequestingUploadSlot => "Requesting presigned URL...".to_string(),
            WorkflowStatus::Uploading => "Uploading...".to_string(),
            WorkflowStatus::Succeeded { .. } => "Upload successful!".to_string(),
            WorkflowStatus::Failed { message } => format!("Error: {message}"),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A status transition tagged with the run that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub run_id: Uuid,
    pub status: WorkflowStatus,
}

/// Result of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub run_id: Uuid,
    pub object_key: String,
    pub public_url: PublicUrl,
    pub bytes_uploaded: u64,
    /// Hex SHA-256 of the uploaded bytes.
    pub content_sha256: String,
}
