//! Error types for installation sessions, workspace clones, and PR sync.

use thiserror::Error;

/// Errors from a single GitHub REST call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response, or the response body was unreadable
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status
    #[error("GitHub API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Errors surfaced to callers of this crate
///
/// Nothing here is retried internally. Every variant carries enough context to
/// log or show to an end user.
#[derive(Debug, Error)]
pub enum Error {
    /// No installation record for the (installation id, repository) pair
    #[error("installation not found: id {installation_id} for repository {repo_full_name}")]
    InstallationNotFound {
        installation_id: i64,
        repo_full_name: String,
    },

    /// The installation points at an app with no record
    #[error("app not found: id {app_id}")]
    AppNotFound { app_id: i64 },

    /// The installation store itself failed
    #[error("installation store lookup failed: {0}")]
    Store(String),

    /// Key loading, JWT signing, or the token exchange failed
    #[error("credential exchange failed: {0}")]
    CredentialExchange(String),

    /// The ephemeral workspace could not be created on the host
    #[error("failed to create temporary workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// git transport or reference error during the shallow clone
    #[error("failed to clone {url} at branch {branch}: {details}")]
    Clone {
        url: String,
        branch: String,
        details: String,
    },

    /// A single status write failed; earlier writes in the batch stand
    #[error("failed to set PR status {context}: {source}")]
    StatusUpdate {
        context: String,
        #[source]
        source: ApiError,
    },

    /// The comment was not published
    #[error("failed to publish PR comment: {0}")]
    CommentPublish(#[source] ApiError),

    /// The comment body has no block for this project
    #[error("comment has no block for project {project}")]
    MissingProjectBlock { project: String },

    /// Editing an existing comment failed
    #[error("failed to edit PR comment {comment_id}: {source}")]
    CommentEdit {
        comment_id: u64,
        #[source]
        source: ApiError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
