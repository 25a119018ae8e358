//! Repository sessions
//!
//! Resolves an installation, obtains a fresh installation client, and binds
//! it to one owner/repo pair. Sessions are built per request and never
//! cached: installation tokens expire after about an hour and are not
//! refreshed here.

use async_trait::async_trait;
use tracing::{error, info};

use crate::client::GithubClient;
use crate::error::{ApiError, Error, Result};
use crate::pr::{CommentId, CommitState, PullRequestService};
use crate::provider::ClientProvider;
use crate::store::InstallationStore;

/// Authenticated handle for PR operations on one repository
#[derive(Debug, Clone)]
pub struct GithubService {
    pub client: GithubClient,
    pub owner: String,
    pub repo_name: String,
}

impl GithubService {
    pub fn new(client: GithubClient, owner: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo_name: repo_name.into(),
        }
    }
}

#[async_trait]
impl PullRequestService for GithubService {
    async fn set_status(
        &self,
        pr_number: u64,
        state: CommitState,
        context: &str,
    ) -> Result<(), ApiError> {
        let sha = self
            .client
            .pull_request_head_sha(&self.owner, &self.repo_name, pr_number)
            .await?;
        self.client
            .create_status(&self.owner, &self.repo_name, &sha, state, context)
            .await
    }

    async fn publish_comment(&self, pr_number: u64, body: &str) -> Result<CommentId, ApiError> {
        self.client
            .create_comment(&self.owner, &self.repo_name, pr_number, body)
            .await
    }

    async fn edit_comment(&self, comment_id: CommentId, body: &str) -> Result<(), ApiError> {
        self.client
            .update_comment(&self.owner, &self.repo_name, comment_id, body)
            .await
    }
}

/// Build a session for `owner/repo_name` under the given installation
///
/// Fails fast: a missing installation, a missing app, or a failed token
/// exchange aborts the call with no partial session.
pub async fn get_session(
    provider: &dyn ClientProvider,
    store: &dyn InstallationStore,
    installation_id: i64,
    repo_full_name: &str,
    owner: &str,
    repo_name: &str,
) -> Result<(GithubService, String)> {
    let installation = store
        .installation_by_id_and_repo(installation_id, repo_full_name)
        .await
        .map_err(|e| Error::Store(format!("{e:#}")))?
        .ok_or_else(|| {
            error!(installation_id, repo = %repo_full_name, "Error getting installation");
            Error::InstallationNotFound {
                installation_id,
                repo_full_name: repo_full_name.to_string(),
            }
        })?;

    store
        .app(installation.github_app_id)
        .await
        .map_err(|e| Error::Store(format!("{e:#}")))?
        .ok_or_else(|| {
            error!(app_id = installation.github_app_id, "Error getting app");
            Error::AppNotFound {
                app_id: installation.github_app_id,
            }
        })?;

    let (client, token) = provider
        .obtain(
            installation.github_app_id,
            installation.github_installation_id,
        )
        .await?;

    info!(installation_id, owner, repo = repo_name, "Created github service session");

    Ok((GithubService::new(client, owner, repo_name), token))
}
