//! GitHub REST client
//!
//! A thin reqwest wrapper bound to one bearer token and one API base URL.
//! It only knows the calls the PR synchronizer needs.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::pr::{CommentId, CommitState};

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub(crate) const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
pub(crate) const GITHUB_API_VERSION: &str = "2022-11-28";
pub(crate) const USER_AGENT: &str = "lornu-ai-github-app";

#[derive(Debug, Deserialize)]
struct PullRequest {
    head: PullRequestHead,
}

#[derive(Debug, Deserialize)]
struct PullRequestHead {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    id: CommentId,
}

/// Authenticated GitHub API handle
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GithubClient {
    /// Create a client that sends `token` as a bearer credential to `api_base`
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token)
            .header("Accept", ACCEPT_GITHUB_JSON)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }

    /// Look up the head commit of a pull request
    pub async fn pull_request_head_sha(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<String, ApiError> {
        debug!(owner, repo, pr_number, "Fetching pull request head");
        let pr: PullRequest =
            Self::send(self.request(Method::GET, &format!("/repos/{owner}/{repo}/pulls/{pr_number}")))
                .await?;
        Ok(pr.head.sha)
    }

    /// Create a commit status on `sha`
    pub async fn create_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        state: CommitState,
        context: &str,
    ) -> Result<(), ApiError> {
        debug!(owner, repo, sha, %state, context, "Creating commit status");
        let body = serde_json::json!({ "state": state, "context": context });
        let _: serde_json::Value = Self::send(
            self.request(Method::POST, &format!("/repos/{owner}/{repo}/statuses/{sha}"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    /// Post a comment on an issue or pull request, returning its id
    pub async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<CommentId, ApiError> {
        debug!(owner, repo, issue_number, "Creating comment");
        let comment: IssueComment = Self::send(
            self.request(
                Method::POST,
                &format!("/repos/{owner}/{repo}/issues/{issue_number}/comments"),
            )
            .json(&serde_json::json!({ "body": body })),
        )
        .await?;
        Ok(comment.id)
    }

    /// Replace the body of an existing comment
    pub async fn update_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: CommentId,
        body: &str,
    ) -> Result<(), ApiError> {
        debug!(owner, repo, comment_id, "Updating comment");
        let _: IssueComment = Self::send(
            self.request(
                Method::PATCH,
                &format!("/repos/{owner}/{repo}/issues/comments/{comment_id}"),
            )
            .json(&serde_json::json!({ "body": body })),
        )
        .await?;
        Ok(())
    }
}
