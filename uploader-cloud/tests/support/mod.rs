//! Shared test helpers for wiremock-backed tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use uploader_cloud::clock::ManualClock;
use uploader_cloud::{TokenCache, UploadOrchestrator, UploaderConfig};
use wiremock::MockServer;

pub const TOKEN_PATH: &str = "/oauth2/token";
pub const PRESIGN_PATH: &str = "/presign";
pub const CLIENT_ID: &str = "svc-uploader";
pub const CLIENT_SECRET: &str = "s3cr3t-value";

/// T=0 for clock-driven tests.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Config pointing token and presign endpoints at `server`.
pub fn test_config(server: &MockServer) -> UploaderConfig {
    UploaderConfig {
        token_endpoint: Some(format!("{}{TOKEN_PATH}", server.uri())),
        client_id: CLIENT_ID.into(),
        client_secret: CLIENT_SECRET.into(),
        scope: Some("uploads/write".into()),
        presign_endpoint: Some(format!("{}{PRESIGN_PATH}", server.uri())),
        request_timeout_secs: 5,
        ..UploaderConfig::default()
    }
}

pub fn token_body(token: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "expires_in": expires_in,
        "token_type": "Bearer"
    })
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

pub fn token_cache(config: &UploaderConfig, clock: Arc<ManualClock>) -> TokenCache {
    let client = config.http_client().unwrap();
    TokenCache::with_clock(config, client, clock).unwrap()
}

/// Orchestrator and its token cache, driven by `clock`.
pub fn orchestrator(
    config: &UploaderConfig,
    clock: Arc<ManualClock>,
) -> (UploadOrchestrator, Arc<TokenCache>) {
    let client = config.http_client().unwrap();
    let tokens = Arc::new(TokenCache::with_clock(config, client.clone(), clock).unwrap());
    (
        UploadOrchestrator::new(Arc::clone(&tokens), config, client),
        tokens,
    )
}

/// Address that accepts TCP connections and drops them without answering.
pub async fn dropping_listener() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => drop(stream),
                Err(_) => break,
            }
        }
    });
    format!("http://{addr}")
}

/// Address that answers every request with a `500` whose body is cut short.
pub async fn truncated_error_listener() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                // Requests here carry no body, so the head is the whole request.
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
                    )
                    .await;
            });
        }
    });
    format!("http://{addr}")
}
