//! PR Job Sync Tool
//!
//! Marks every planned job as pending on a pull request and posts the
//! "projects impacted" comment, authenticating as a GitHub App installation.
//!
//! ## Usage
//! ```bash
//! # jobs.json: [{"project_name": "dev", "commands": ["digger plan"]}]
//! sync-pr \
//!   --repo acme/infra \
//!   --app-id 123456 \
//!   --installation-id 78901234 \
//!   --pr-number 42 \
//!   --jobs jobs.json
//!
//! # Preview the statuses and comment without touching GitHub
//! sync-pr --repo acme/infra --pr-number 42 --jobs jobs.json --dry-run
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use github_app::{
    comment, pr, post_initial_comment, set_statuses, AppClientProvider, ClientProvider,
    GithubService, Job, KeySource, DEFAULT_API_URL,
};
use serde::Serialize;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// PR Job Sync Tool
#[derive(Parser, Debug)]
#[command(name = "sync-pr")]
#[command(about = "Set pending statuses and post the jobs comment on a pull request")]
#[command(version)]
struct Args {
    /// Repository in format owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: String,

    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID", required_unless_present = "dry_run")]
    app_id: Option<i64>,

    /// GitHub App Installation ID
    #[arg(long, env = "GITHUB_INSTALLATION_ID", required_unless_present = "dry_run")]
    installation_id: Option<i64>,

    /// Pull request number
    #[arg(long)]
    pr_number: u64,

    /// Path to a JSON array of jobs
    #[arg(long)]
    jobs: String,

    /// Path to the private key PEM file (defaults to GITHUB_APP_PRIVATE_KEY)
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    private_key_path: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Dry run - print the statuses and comment instead of writing them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct SyncSummary {
    repository: String,
    pr_number: u64,
    dry_run: bool,
    statuses: Vec<String>,
    comment_id: Option<u64>,
    comment: String,
}

fn split_repo(repo: &str) -> Result<(&str, &str)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => anyhow::bail!("Invalid repository format: {}. Expected: owner/repo", repo),
    }
}

fn load_jobs(path: &str) -> Result<Vec<Job>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read jobs: {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid jobs JSON in {}", path))
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

    let (owner, repo_name) = split_repo(&args.repo)?;
    let jobs = load_jobs(&args.jobs)?;

    let mut summary = SyncSummary {
        repository: args.repo.clone(),
        pr_number: args.pr_number,
        dry_run: args.dry_run,
        statuses: pr::status_contexts(&jobs),
        comment_id: None,
        comment: comment::initial_comment(&jobs),
    };

    if !args.dry_run {
        let app_id = args.app_id.context("--app-id is required")?;
        let installation_id = args
            .installation_id
            .context("--installation-id is required")?;

        let key_source = match &args.private_key_path {
            Some(path) => KeySource::Inline(
                fs::read(path).with_context(|| format!("Failed to read private key: {}", path))?,
            ),
            None => KeySource::Environment,
        };

        let provider = AppClientProvider::new(&args.api_url).with_key_source(key_source);
        let (client, _token) = provider
            .obtain(app_id, installation_id)
            .await
            .context("Failed to obtain installation client")?;
        let service = GithubService::new(client, owner, repo_name);

        info!(
            repo = %args.repo,
            pr_number = args.pr_number,
            jobs = jobs.len(),
            "Syncing jobs to pull request"
        );

        set_statuses(&service, args.pr_number, &jobs)
            .await
            .context("Failed to set pending statuses")?;
        let comment_id = post_initial_comment(&service, args.pr_number, &jobs)
            .await
            .context("Failed to post jobs comment")?;
        summary.comment_id = Some(comment_id);
    }

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            for context in &summary.statuses {
                eprintln!("  ⏳ {}: pending", context);
            }
            if args.dry_run {
                println!("{}", summary.comment);
            }
            eprintln!(
                "\n✅ {} status(es) {} on {}#{}{}",
                summary.statuses.len(),
                if args.dry_run { "planned" } else { "set" },
                summary.repository,
                summary.pr_number,
                summary
                    .comment_id
                    .map(|id| format!(" (comment ID: {})", id))
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}
