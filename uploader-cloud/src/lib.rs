//! Presigned upload client.
//!
//! Provides service-authenticated uploads to object storage with:
//! - Client-credentials token caching with single-flight refresh
//! - API client for the presign endpoint
//! - Direct PUT to storage via presigned URLs
//! - A status-reporting orchestrator tying the three steps together

pub mod api_client;
pub mod clock;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod storage_transport;
pub mod token_cache;
pub mod types;

pub use config::UploaderConfig;
pub use error::{HttpFailure, TokenError, UploadError, UploadResult};
pub use orchestrator::{UploadOrchestrator, UploadOutcome};
pub use token_cache::TokenCache;
pub use types::*;
