//! Uploader CLI: acquires a service token, requests a presigned URL and PUTs
//! the file to storage.

use anyhow::{Context, bail};
use clap::Parser;
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;
use uploader_cli::{Cli, Commands, init_tracing, read_selected_file};
use uploader_cloud::{UploadOrchestrator, UploadRequest, UploaderConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.endpoints.to_config();

    match cli.command {
        Commands::Upload {
            file,
            namespace,
            content_type,
            json,
        } => upload(&config, &file, namespace, content_type, json).await,
        Commands::Token => token(&config).await,
    }
}

async fn upload(
    config: &UploaderConfig,
    path: &Path,
    namespace: String,
    content_type: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let orchestrator = UploadOrchestrator::from_config(config)
        .context("Failed to set up uploader. Check UPLOADER_* settings")?;
    let file = read_selected_file(path, content_type).await?;

    let mut updates = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    eprintln!("{}", update.status);
                    if update.status.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = orchestrator
        .run(UploadRequest::new(Some(file), namespace))
        .await;
    let _ = printer.await;

    match outcome {
        Ok(receipt) if json => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        Ok(receipt) => {
            println!("{}", receipt.public_url);
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

async fn token(config: &UploaderConfig) -> anyhow::Result<()> {
    let orchestrator = UploadOrchestrator::from_config(config)
        .context("Failed to set up token client. Check UPLOADER_* settings")?;
    let tokens = orchestrator.tokens();

    tokens
        .get_token()
        .await
        .context("Token request failed")?;

    match tokens.cached_expiry().await {
        Some(expiry) => println!("token acquired from {}, expires at {expiry}", tokens.token_url()),
        None => println!("token acquired from {}", tokens.token_url()),
    }
    Ok(())
}
