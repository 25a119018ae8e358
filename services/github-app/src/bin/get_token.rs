//! GitHub App Installation Token Generator
//!
//! Generates a short-lived installation access token from GitHub App credentials.
//! Uses RS256 JWT signing to authenticate as the GitHub App, then exchanges
//! the JWT for an installation token.
//!
//! ## Usage
//! ```bash
//! # With command line arguments, key from the environment
//! GITHUB_APP_PRIVATE_KEY="$(cat key.pem)" get-token \
//!   --app-id 123456 \
//!   --installation-id 78901234
//!
//! # With a key file
//! get-token --app-id 123456 --installation-id 78901234 --private-key-path ./key.pem
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use github_app::{AppClientProvider, KeySource, DEFAULT_API_URL};
use serde::Serialize;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// GitHub App Installation Token Generator
#[derive(Parser, Debug)]
#[command(name = "get-token")]
#[command(about = "Generate GitHub App installation access tokens")]
#[command(version)]
struct Args {
    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    app_id: i64,

    /// GitHub App Installation ID
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    installation_id: i64,

    /// Path to the private key PEM file (defaults to GITHUB_APP_PRIVATE_KEY)
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    private_key_path: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Output file path (optional, prints to stdout if not specified)
    #[arg(long, short)]
    output: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "token")]
    format: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Bare token
    Token,
    /// JSON with installation id and expiry
    Json,
}

#[derive(Serialize)]
struct TokenOutput {
    token: String,
    installation_id: i64,
    expires_at: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let key_source = match &args.private_key_path {
        Some(path) => KeySource::Inline(
            fs::read(path).with_context(|| format!("Failed to read private key: {}", path))?,
        ),
        None => KeySource::Environment,
    };

    info!(
        app_id = args.app_id,
        installation_id = args.installation_id,
        "Exchanging JWT for installation token"
    );
    let token_response = AppClientProvider::new(&args.api_url)
        .with_key_source(key_source)
        .installation_token(args.app_id, args.installation_id)
        .await
        .context("Failed to obtain installation token")?;

    let output = match args.format {
        OutputFormat::Json => {
            let output = TokenOutput {
                token: token_response.token.clone(),
                installation_id: args.installation_id,
                expires_at: token_response.expires_at.to_rfc3339(),
            };
            serde_json::to_string_pretty(&output)?
        }
        OutputFormat::Token => token_response.token.clone(),
    };

    if let Some(output_path) = args.output {
        fs::write(&output_path, &output)
            .with_context(|| format!("Failed to write token to {}", output_path))?;
        // Set restrictive permissions on the token file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&output_path, fs::Permissions::from_mode(0o600))?;
        }
        info!(path = %output_path, "Token saved");
    } else {
        println!("{}", output);
        info!(expires_at = %token_response.expires_at, "Token generated successfully");
    }

    Ok(())
}
