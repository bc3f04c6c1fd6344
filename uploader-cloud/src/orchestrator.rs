//! Upload orchestrator.
//!
//! Drives one upload as a linear sequence:
//! - Authenticating: acquire or reuse a bearer token
//! - RequestingUploadSlot: trade the token for a presigned URL
//! - Uploading: PUT the file to the presigned URL, without the token
//!
//! Every transition is published to subscribers, tagged with the run id.

use crate::api_client::PresignClient;
use crate::config::UploaderConfig;
use crate::error::{UploadError, UploadResult};
use crate::storage_transport::StorageTransport;
use crate::token_cache::TokenCache;
use crate::types::*;

use reqwest::Client;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Terminal result of one run.
pub type UploadOutcome = UploadResult<UploadReceipt>;

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Runs the token → presign → put sequence.
pub struct UploadOrchestrator {
    tokens: Arc<TokenCache>,
    presign: Option<PresignClient>,
    storage: StorageTransport,
    events: broadcast::Sender<StatusUpdate>,
    current: watch::Sender<WorkflowStatus>,
}

impl UploadOrchestrator {
    /// Creates an orchestrator around an existing token cache.
    ///
    /// A missing presign endpoint is reported by `run`, before any network
    /// call, rather than here.
    pub fn new(tokens: Arc<TokenCache>, config: &UploaderConfig, client: Client) -> Self {
        let presign = config
            .presign_url()
            .map(|url| PresignClient::new(client.clone(), url, config.body_snippet_limit));
        let storage = StorageTransport::new(client, config.body_snippet_limit);
        let (events, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let (current, _) = watch::channel(WorkflowStatus::Idle);

        Self {
            tokens,
            presign,
            storage,
            events,
            current,
        }
    }

    /// Builds the HTTP client, token cache and orchestrator from one config.
    pub fn from_config(config: &UploaderConfig) -> UploadResult<Self> {
        let client = config.http_client()?;
        let tokens = Arc::new(TokenCache::new(config, client.clone())?);
        Ok(Self::new(tokens, config, client))
    }

    /// The token cache shared by every run.
    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// Receives every status transition from runs started after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.events.subscribe()
    }

    /// Watches the status of the most recent run.
    pub fn watch_status(&self) -> watch::Receiver<WorkflowStatus> {
        self.current.subscribe()
    }

    pub fn current_status(&self) -> WorkflowStatus {
        self.current.borrow().clone()
    }

    /// Performs one full upload attempt. Nothing is retried.
    pub async fn run(&self, request: UploadRequest) -> UploadOutcome {
        let run_id = Uuid::now_v7();
        let span = info_span!("upload", %run_id);

        async {
            let mut tracker = RunTracker::start(run_id, &self.events, &self.current);
            let outcome = self.execute(run_id, request, &mut tracker).await;

            match &outcome {
                Ok(receipt) => {
                    info!(
                        "uploaded {} ({} bytes)",
                        receipt.object_key, receipt.bytes_uploaded
                    );
                    tracker.advance(WorkflowStatus::Succeeded {
                        public_url: receipt.public_url.clone(),
                    });
                }
                Err(e) => {
                    warn!("upload failed at {} step: {e}", e.step());
                    tracker.advance(WorkflowStatus::Failed {
                        message: e.to_string(),
                    });
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        request: UploadRequest,
        tracker: &mut RunTracker<'_>,
    ) -> UploadOutcome {
        let file = request
            .file
            .filter(|f| !f.name.trim().is_empty())
            .ok_or(UploadError::NoFileSelected)?;
        let presign = self
            .presign
            .as_ref()
            .ok_or_else(|| UploadError::ConfigurationMissing("presign endpoint".to_string()))?;

        let object_key = object_key(&request.role_namespace, &file.name);
        let content_type = file.effective_content_type().to_string();

        tracker.advance(WorkflowStatus::Authenticating);
        let token = self.tokens.get_token().await?;

        tracker.advance(WorkflowStatus::RequestingUploadSlot);
        let target = presign
            .request_upload_target(&token, &object_key, &content_type)
            .await
            .map_err(UploadError::PresignFailed)?;
        debug!("upload target: {target:?}");

        tracker.advance(WorkflowStatus::Uploading);
        let bytes_uploaded = file.data.len() as u64;
        let content_sha256 = hex::encode(Sha256::digest(&file.data));
        self.storage
            .put(&target, &content_type, file.data)
            .await
            .map_err(UploadError::UploadFailed)?;

        Ok(UploadReceipt {
            run_id,
            object_key,
            public_url: target.public_url.into(),
            bytes_uploaded,
            content_sha256,
        })
    }
}

/// Status of a single run; refuses to move backwards.
struct RunTracker<'a> {
    run_id: Uuid,
    status: WorkflowStatus,
    events: &'a broadcast::Sender<StatusUpdate>,
    current: &'a watch::Sender<WorkflowStatus>,
}

impl<'a> RunTracker<'a> {
    fn start(
        run_id: Uuid,
        events: &'a broadcast::Sender<StatusUpdate>,
        current: &'a watch::Sender<WorkflowStatus>,
    ) -> Self {
        let tracker = Self {
            run_id,
            status: WorkflowStatus::Idle,
            events,
            current,
        };
        tracker.publish();
        tracker
    }

    fn advance(&mut self, next: WorkflowStatus) {
        if !self.status.can_advance_to(&next) {
            warn!("ignoring status transition {:?} -> {:?}", self.status, next);
            return;
        }
        debug!("{}", next.label());
        self.status = next;
        self.publish();
    }

    fn publish(&self) {
        self.current.send_replace(self.status.clone());
        // No subscribers is fine.
        let _ = self.events.send(StatusUpdate {
            run_id: self.run_id,
            status: self.status.clone(),
        });
    }
}
