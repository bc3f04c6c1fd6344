//! Argument handling and helpers for the `uploader` binary.
//!
//! Every option can also come from an `UPLOADER_*` environment variable or a
//! `.env` file in the working directory.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use uploader_cloud::{SelectedFile, UploaderConfig};

/// Role namespaces the presign API issues upload slots for.
pub const ROLE_NAMESPACES: [&str; 2] = ["areamgr", "violationmgr"];

#[derive(Parser)]
#[command(name = "uploader", about = "Upload files to object storage through presigned URLs")]
pub struct Cli {
    #[command(flatten)]
    pub endpoints: EndpointArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings. Not `Debug`: it holds the client secret.
#[derive(Args)]
pub struct EndpointArgs {
    /// Full OAuth2 token endpoint URL
    #[arg(long, env = "UPLOADER_TOKEN_ENDPOINT")]
    pub token_endpoint: Option<String>,

    /// Cognito domain; the token endpoint becomes https://<domain>/oauth2/token
    #[arg(long, env = "UPLOADER_COGNITO_DOMAIN")]
    pub cognito_domain: Option<String>,

    /// OAuth2 client id
    #[arg(long, env = "UPLOADER_CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// OAuth2 client secret
    #[arg(
        long,
        env = "UPLOADER_CLIENT_SECRET",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub client_secret: String,

    /// Scope requested with the client-credentials grant
    #[arg(long, env = "UPLOADER_SCOPE")]
    pub scope: Option<String>,

    /// Presign API endpoint
    #[arg(long, env = "UPLOADER_PRESIGN_ENDPOINT")]
    pub presign_endpoint: Option<String>,

    /// Timeout for each network call, in seconds
    #[arg(long, env = "UPLOADER_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file under a role namespace
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Role namespace prefixed to the object key
        #[arg(long, short, value_parser = ROLE_NAMESPACES)]
        namespace: String,
        /// Content type; defaults to application/octet-stream
        #[arg(long)]
        content_type: Option<String>,
        /// Print the receipt as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the client credentials by acquiring a token
    Token,
}

impl EndpointArgs {
    pub fn to_config(&self) -> UploaderConfig {
        UploaderConfig {
            token_endpoint: self.token_endpoint.clone(),
            cognito_domain: self.cognito_domain.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scope: self.scope.clone(),
            presign_endpoint: self.presign_endpoint.clone(),
            request_timeout_secs: self.timeout_secs,
            ..UploaderConfig::default()
        }
    }
}

/// Reads `path` into a [`SelectedFile`] named after its final component.
pub async fn read_selected_file(path: &Path, content_type: Option<String>) -> Result<SelectedFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file name: {}", path.display()))?
        .to_string();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(SelectedFile::new(name, content_type, data))
}

/// Initialize tracing for the CLI. Logs go to stderr; `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
