use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Parser)]
#[command(name = "absensi", about = "Absensi face attendance CLI")]
struct Cli {
    /// Base URL of the absensid server
    #[arg(long, global = true, default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a photo and print who is in it
    Analyze {
        /// Photo file (JPEG, PNG, ...)
        image: PathBuf,
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let server = cli.server.trim_end_matches('/');

    match cli.command {
        Commands::Analyze { image, json } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("cannot read {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            tracing::debug!(file = %image.display(), bytes = bytes.len(), "uploading");

            let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name));
            let resp = client
                .post(format!("{server}/analyze-face"))
                .multipart(form)
                .send()
                .await
                .with_context(|| format!("cannot reach {server}"))?;
            let body = read_json(resp).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let faces = body["detected_faces"].as_array().cloned().unwrap_or_default();
                println!("{} face(s) detected", faces.len());
                for (i, name) in faces.iter().enumerate() {
                    println!("  {}. {}", i + 1, name.as_str().unwrap_or("?"));
                }
            }
        }
        Commands::Status => {
            let resp = client
                .get(format!("{server}/status"))
                .send()
                .await
                .with_context(|| format!("cannot reach {server}"))?;
            let body = read_json(resp).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

/// Parse a JSON body, turning error responses into an error carrying `detail`.
async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await.context("invalid JSON response")?;
    if !status.is_success() {
        let detail = body["detail"].as_str().unwrap_or("no detail");
        bail!("server returned {status}: {detail}");
    }
    Ok(body)
}
