//! Pull Request Operations
//!
//! Projects a list of per-project jobs onto PR-visible state: one pending
//! commit status per recognised command, and a summary comment with a
//! marker-delimited block per project.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::comment;
use crate::error::{ApiError, Error, Result};

/// Remote comment identifier
pub type CommentId = u64;

pub const PLAN_COMMAND: &str = "digger plan";
pub const APPLY_COMMAND: &str = "digger apply";

/// Planned work for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub project_name: String,
    /// Command names in execution order
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Job {
    pub fn new(project_name: impl Into<String>, commands: &[&str]) -> Self {
        Self {
            project_name: project_name.into(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Commit status state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitState::Pending => write!(f, "pending"),
            CommitState::Success => write!(f, "success"),
            CommitState::Failure => write!(f, "failure"),
            CommitState::Error => write!(f, "error"),
        }
    }
}

/// PR-scoped writes the synchronizer performs
#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Set a commit status on the PR's head commit
    async fn set_status(
        &self,
        pr_number: u64,
        state: CommitState,
        context: &str,
    ) -> Result<(), ApiError>;

    async fn publish_comment(&self, pr_number: u64, body: &str) -> Result<CommentId, ApiError>;

    async fn edit_comment(&self, comment_id: CommentId, body: &str) -> Result<(), ApiError>;
}

/// Status context for a command, or `None` for commands that get no status
pub fn status_context(project_name: &str, command: &str) -> Option<String> {
    let short = match command {
        PLAN_COMMAND => "plan",
        APPLY_COMMAND => "apply",
        _ => return None,
    };
    Some(format!("{project_name}/{short}"))
}

/// All status contexts for `jobs`, in job order then command order
pub fn status_contexts(jobs: &[Job]) -> Vec<String> {
    jobs.iter()
        .flat_map(|job| {
            job.commands
                .iter()
                .filter_map(|command| status_context(&job.project_name, command))
        })
        .collect()
}

/// Mark every recognised command of every job as pending
///
/// Stops at the first failed write. Statuses already set stay set.
pub async fn set_statuses(
    service: &dyn PullRequestService,
    pr_number: u64,
    jobs: &[Job],
) -> Result<()> {
    for context in status_contexts(jobs) {
        if let Err(source) = service
            .set_status(pr_number, CommitState::Pending, &context)
            .await
        {
            error!(pr_number, context = %context, error = %source, "Error setting pr status");
            return Err(Error::StatusUpdate { context, source });
        }
    }

    info!(pr_number, jobs = jobs.len(), "Set pending statuses for jobs");
    Ok(())
}

/// Publish the initial "projects impacted" comment
pub async fn post_initial_comment(
    service: &dyn PullRequestService,
    pr_number: u64,
    jobs: &[Job],
) -> Result<CommentId> {
    let body = comment::initial_comment(jobs);

    let comment_id = service
        .publish_comment(pr_number, &body)
        .await
        .map_err(|source| {
            error!(pr_number, error = %source, "Error publishing initial comment");
            Error::CommentPublish(source)
        })?;

    info!(pr_number, comment_id, projects = jobs.len(), "Published initial comment");
    Ok(comment_id)
}

/// Rewrite one project's block in an existing comment and push the edit
///
/// Returns the new body so callers can chain further edits.
pub async fn update_project_block(
    service: &dyn PullRequestService,
    comment_id: CommentId,
    current_body: &str,
    project_name: &str,
    content: &str,
) -> Result<String> {
    let body = comment::replace_project_block(current_body, project_name, content).ok_or_else(
        || Error::MissingProjectBlock {
            project: project_name.to_string(),
        },
    )?;

    service
        .edit_comment(comment_id, &body)
        .await
        .map_err(|source| Error::CommentEdit { comment_id, source })?;

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Status(u64, CommitState, String),
        Comment(u64, String),
        Edit(CommentId, String),
    }

    /// Records calls; optionally fails the Nth status write (0-based)
    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<Call>>,
        fail_status_at: Option<usize>,
        fail_comments: bool,
    }

    impl RecordingService {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn status_calls(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Status(..)))
                .count()
        }
    }

    fn rejected() -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }
    }

    #[async_trait]
    impl PullRequestService for RecordingService {
        async fn set_status(
            &self,
            pr_number: u64,
            state: CommitState,
            context: &str,
        ) -> Result<(), ApiError> {
            let attempt = self.status_calls();
            self.calls
                .lock()
                .unwrap()
                .push(Call::Status(pr_number, state, context.to_string()));
            if self.fail_status_at == Some(attempt) {
                return Err(rejected());
            }
            Ok(())
        }

        async fn publish_comment(&self, pr_number: u64, body: &str) -> Result<CommentId, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Comment(pr_number, body.to_string()));
            if self.fail_comments {
                return Err(rejected());
            }
            Ok(555)
        }

        async fn edit_comment(&self, comment_id: CommentId, body: &str) -> Result<(), ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Edit(comment_id, body.to_string()));
            Ok(())
        }
    }

    fn two_jobs() -> Vec<Job> {
        vec![Job::new("A", &[PLAN_COMMAND]), Job::new("B", &[APPLY_COMMAND])]
    }

    #[test]
    fn test_status_context_mapping() {
        assert_eq!(status_context("myproject", "digger plan").as_deref(), Some("myproject/plan"));
        assert_eq!(status_context("myproject", "digger apply").as_deref(), Some("myproject/apply"));
        assert_eq!(status_context("myproject", "digger unlock"), None);
        assert_eq!(status_context("myproject", "plan"), None);
    }

    #[test]
    fn test_commit_state_wire_format() {
        assert_eq!(serde_json::to_value(CommitState::Pending).unwrap(), "pending");
        assert_eq!(CommitState::Failure.to_string(), "failure");
    }

    #[test]
    fn test_job_deserializes_without_commands() {
        let job: Job = serde_json::from_str(r#"{"project_name": "dev"}"#).unwrap();
        assert_eq!(job, Job::new("dev", &[]));
    }

    #[tokio::test]
    async fn test_set_statuses_in_job_then_command_order() {
        let service = RecordingService::default();

        set_statuses(&service, 7, &two_jobs()).await.unwrap();

        assert_eq!(
            service.calls(),
            vec![
                Call::Status(7, CommitState::Pending, "A/plan".to_string()),
                Call::Status(7, CommitState::Pending, "B/apply".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_statuses_skips_unknown_commands() {
        let service = RecordingService::default();
        let jobs = vec![Job::new("A", &["digger lock", PLAN_COMMAND, "terraform fmt", APPLY_COMMAND])];

        set_statuses(&service, 1, &jobs).await.unwrap();

        assert_eq!(
            service.calls(),
            vec![
                Call::Status(1, CommitState::Pending, "A/plan".to_string()),
                Call::Status(1, CommitState::Pending, "A/apply".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_statuses_aborts_on_first_failure() {
        let service = RecordingService {
            fail_status_at: Some(0),
            ..Default::default()
        };

        let err = set_statuses(&service, 7, &two_jobs()).await.unwrap_err();

        match err {
            Error::StatusUpdate { context, .. } => assert_eq!(context, "A/plan"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(service.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_set_statuses_keeps_earlier_writes() {
        let service = RecordingService {
            fail_status_at: Some(1),
            ..Default::default()
        };
        let jobs = vec![
            Job::new("A", &[PLAN_COMMAND]),
            Job::new("B", &[PLAN_COMMAND]),
            Job::new("C", &[PLAN_COMMAND]),
        ];

        assert!(set_statuses(&service, 7, &jobs).await.is_err());

        assert_eq!(
            service.calls(),
            vec![
                Call::Status(7, CommitState::Pending, "A/plan".to_string()),
                Call::Status(7, CommitState::Pending, "B/plan".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_post_initial_comment_publishes_once() {
        let service = RecordingService::default();

        let id = post_initial_comment(&service, 9, &two_jobs()).await.unwrap();

        assert_eq!(id, 555);
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        let Call::Comment(pr, body) = &calls[0] else {
            panic!("expected a comment, got {:?}", calls[0]);
        };
        assert_eq!(*pr, 9);

        let a_start = body.find("<!-- PROJECTHOLDER A -->").unwrap();
        let a_line = body.find(":airplane: A Pending").unwrap();
        let a_end = body.find("<!-- PROJECTHOLDEREND A -->").unwrap();
        let b_start = body.find("<!-- PROJECTHOLDER B -->").unwrap();
        let b_line = body.find(":airplane: B Pending").unwrap();
        let b_end = body.find("<!-- PROJECTHOLDEREND B -->").unwrap();
        assert!(a_start < a_line && a_line < a_end);
        assert!(a_end < b_start && b_start < b_line && b_line < b_end);
    }

    #[tokio::test]
    async fn test_post_initial_comment_failure_is_verbatim() {
        let service = RecordingService {
            fail_comments: true,
            ..Default::default()
        };

        let err = post_initial_comment(&service, 9, &two_jobs()).await.unwrap_err();

        match err {
            Error::CommentPublish(ApiError::Status { body, .. }) => assert_eq!(body, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_project_block_edits_comment() {
        let service = RecordingService::default();
        let body = comment::initial_comment(&two_jobs());

        let updated = update_project_block(&service, 555, &body, "B", ":white_check_mark: B applied")
            .await
            .unwrap();

        assert!(updated.contains(":white_check_mark: B applied"));
        assert!(updated.contains(":airplane: A Pending"));
        assert_eq!(service.calls(), vec![Call::Edit(555, updated)]);
    }

    #[tokio::test]
    async fn test_update_project_block_unknown_project() {
        let service = RecordingService::default();
        let body = comment::initial_comment(&two_jobs());

        let err = update_project_block(&service, 555, &body, "C", "done")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingProjectBlock { ref project } if project == "C"));
        assert!(service.calls().is_empty());
    }
}
