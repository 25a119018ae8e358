//! GitHub App Sync Library
//!
//! Lets a plan/apply workflow act as a GitHub App: authenticate as an
//! installation, clone repository content into a throwaway workspace, and keep
//! pull-request statuses and the jobs comment in sync with per-project jobs.
//!
//! ## Binaries
//!
//! - `get-token`: Generate GitHub App installation access tokens
//! - `sync-pr`: Mark jobs pending on a PR and post the initial jobs comment
//!
//! ## Flow
//!
//! 1. [`session::get_session`] resolves the installation and app records,
//!    asks a [`provider::ClientProvider`] for a fresh installation client and
//!    returns a [`session::GithubService`] bound to one repository.
//! 2. [`pr::set_statuses`] and [`pr::post_initial_comment`] project jobs onto
//!    the PR through that service.
//! 3. [`clone::clone_and_run`] uses the raw token for a shallow clone when the
//!    caller needs the repository contents.
//!
//! ## Example Pipeline
//!
//! ```bash
//! # Generate installation token
//! TOKEN=$(get-token \
//!   --app-id $GITHUB_APP_ID \
//!   --installation-id $INSTALLATION_ID)
//!
//! # Mark jobs pending and post the comment
//! sync-pr \
//!   --app-id $GITHUB_APP_ID \
//!   --installation-id $INSTALLATION_ID \
//!   --repo acme/infra \
//!   --pr-number 123 \
//!   --jobs jobs.json
//! ```

pub mod auth;
pub mod aws_env;
pub mod client;
pub mod clone;
pub mod comment;
pub mod error;
pub mod pr;
pub mod provider;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_support;

pub use auth::{InstallationToken, KeySource};
pub use client::{GithubClient, DEFAULT_API_URL};
pub use clone::{clone_and_run, CloneExecutor};
pub use error::{ApiError, Error, Result};
pub use pr::{
    post_initial_comment, set_statuses, update_project_block, CommentId, CommitState, Job,
    PullRequestService,
};
pub use provider::{AppClientProvider, ClientProvider, MockClientProvider};
pub use session::{get_session, GithubService};
pub use store::{App, Installation, InstallationStore, MemoryInstallationStore};
