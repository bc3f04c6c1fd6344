//! Client-credentials token lifecycle with single-flight refresh.
//!
//! Holds one bearer token per credential set and exchanges the client
//! id/secret for a new one only when the cached token is missing or about to
//! expire. Concurrent callers that need a new token share one exchange.

use crate::clock::{Clock, SystemClock};
use crate::config::UploaderConfig;
use crate::error::{TokenError, UploadError, UploadResult, body_snippet, transport_cause};
use crate::types::{ClientCredential, TokenRecord, TokenResponse};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Upper bound for `token_refresh_margin_secs` (one day).
pub const MAX_REFRESH_MARGIN_SECS: i64 = 86_400;

type PendingExchange = Shared<BoxFuture<'static, Result<TokenRecord, TokenError>>>;

/// Caches the bearer token for one client credential.
pub struct TokenCache {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    token_url: String,
    credential: ClientCredential,
    scope: Option<String>,
    refresh_margin_secs: i64,
    body_snippet_limit: usize,
    clock: Arc<dyn Clock>,
    record: RwLock<Option<TokenRecord>>,
    /// Exchange currently in flight. Callers arriving while it runs await the
    /// same future instead of starting their own.
    in_flight: Mutex<Option<PendingExchange>>,
    exchanges: AtomicU64,
}

impl TokenCache {
    pub fn new(config: &UploaderConfig, client: Client) -> UploadResult<Self> {
        Self::with_clock(config, client, Arc::new(SystemClock))
    }

    /// Builds a cache that reads time from `clock`.
    pub fn with_clock(
        config: &UploaderConfig,
        client: Client,
        clock: Arc<dyn Clock>,
    ) -> UploadResult<Self> {
        let token_url = config.token_url()?;
        if config.client_id.trim().is_empty() {
            return Err(UploadError::ConfigurationMissing("client id".to_string()));
        }
        if config.client_secret.is_empty() {
            return Err(UploadError::ConfigurationMissing("client secret".to_string()));
        }
        if !(0..=MAX_REFRESH_MARGIN_SECS).contains(&config.token_refresh_margin_secs) {
            return Err(UploadError::InvalidConfiguration(format!(
                "token_refresh_margin_secs must be between 0 and {MAX_REFRESH_MARGIN_SECS}"
            )));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                token_url,
                credential: ClientCredential::new(config.client_id.trim(), &config.client_secret),
                scope: config.effective_scope().map(str::to_string),
                refresh_margin_secs: config.token_refresh_margin_secs,
                body_snippet_limit: config.body_snippet_limit,
                clock,
                record: RwLock::new(None),
                in_flight: Mutex::new(None),
                exchanges: AtomicU64::new(0),
            }),
        })
    }

    /// Returns a token that is valid for at least the refresh margin,
    /// exchanging credentials only when needed.
    ///
    /// Must be called from within a Tokio runtime; the exchange is spawned.
    pub async fn get_token(&self) -> Result<String, TokenError> {
        if let Some(token) = self.inner.usable_token().await {
            return Ok(token);
        }
        self.acquire(false).await
    }

    /// Discards the cached token's validity and fetches a new one.
    ///
    /// Joins an exchange that is already in flight rather than starting a
    /// second one.
    pub async fn refresh(&self) -> Result<String, TokenError> {
        self.acquire(true).await
    }

    /// Clears the cached token (on credential rotation or session end).
    pub async fn clear(&self) {
        *self.inner.record.write().await = None;
    }

    /// Returns true if a cached token is usable right now.
    pub async fn has_valid_token(&self) -> bool {
        self.inner.usable_token().await.is_some()
    }

    /// Absolute expiry of the cached token, if any.
    pub async fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.inner
            .record
            .read()
            .await
            .as_ref()
            .and_then(TokenRecord::expires_at)
    }

    /// Number of token endpoint exchanges started by this cache.
    pub fn exchange_count(&self) -> u64 {
        self.inner.exchanges.load(Ordering::SeqCst)
    }

    pub fn token_url(&self) -> &str {
        &self.inner.token_url
    }

    async fn acquire(&self, force: bool) -> Result<String, TokenError> {
        let pending = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight token exchange");
                    pending.clone()
                }
                None => {
                    // An exchange may have completed while we waited for the slot.
                    if !force {
                        if let Some(token) = self.inner.usable_token().await {
                            return Ok(token);
                        }
                    }
                    let pending = self.start_exchange();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await.map(|record| record.access_token)
    }

    /// Runs the exchange as a detached task so the cache is updated even if
    /// every caller stops waiting.
    fn start_exchange(&self) -> PendingExchange {
        self.inner.exchanges.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let result = inner.exchange().await;
            match &result {
                Ok(record) => {
                    debug!(
                        "obtained access token from {}, expires in {}s",
                        inner.token_url, record.expires_in_secs
                    );
                    *inner.record.write().await = Some(record.clone());
                }
                Err(e) => warn!("token exchange failed: {e}"),
            }
            inner.in_flight.lock().await.take();
            result
        });

        task.map(|joined| {
            joined.unwrap_or_else(|e| {
                Err(TokenError::TransportFailed {
                    cause: format!("token exchange task ended unexpectedly: {e}"),
                })
            })
        })
        .boxed()
        .shared()
    }
}

impl Inner {
    async fn usable_token(&self) -> Option<String> {
        let now = self.clock.now();
        let record = self.record.read().await;
        match record.as_ref() {
            Some(r) if r.is_usable_at(now, self.refresh_margin_secs) => {
                Some(r.access_token.clone())
            }
            Some(_) => {
                debug!("access token expiring within {}s, refreshing", self.refresh_margin_secs);
                None
            }
            None => None,
        }
    }

    async fn exchange(&self) -> Result<TokenRecord, TokenError> {
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credential.id(),
            self.credential.secret()
        ));

        let mut form = vec![("grant_type", "client_credentials")];
        if let Some(scope) = self.scope.as_deref() {
            form.push(("scope", scope));
        }

        let resp = self
            .client
            .post(&self.token_url)
            .header(AUTHORIZATION, format!("Basic {basic}"))
            .form(&form)
            .send()
            .await
            .map_err(|e| TokenError::TransportFailed {
                cause: transport_cause(e),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| TokenError::TransportFailed {
            cause: transport_cause(e),
        })?;

        if !status.is_success() {
            return Err(TokenError::RequestFailed {
                status: status.as_u16(),
                body: body_snippet(&body, self.body_snippet_limit),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| TokenError::ParseFailed {
                detail: e.to_string(),
            })?;

        if parsed.access_token.is_empty() {
            return Err(TokenError::ParseFailed {
                detail: "access_token is empty".to_string(),
            });
        }
        if parsed.expires_in <= 0 {
            return Err(TokenError::ParseFailed {
                detail: format!("expires_in must be positive, got {}", parsed.expires_in),
            });
        }

        let record = TokenRecord {
            access_token: parsed.access_token,
            issued_at: self.clock.now(),
            expires_in_secs: parsed.expires_in,
        };
        if record.expires_at().is_none() {
            return Err(TokenError::ParseFailed {
                detail: format!("expires_in out of range: {}", parsed.expires_in),
            });
        }
        Ok(record)
    }
}
