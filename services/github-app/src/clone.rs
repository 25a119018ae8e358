//! Ephemeral repository clones
//!
//! Shallow, single-branch clone into a fresh temporary directory, run a
//! caller-supplied action against the checkout, then remove the directory.
//! Removal is tied to the workspace guard going out of scope, so it happens on
//! every exit path: clone failure, action error, or action panic.
//!
//! This is blocking work. From async code, run it under
//! `tokio::task::spawn_blocking`.

use base64::{engine::general_purpose, Engine as _};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Basic-auth username paired with installation tokens; GitHub only checks the password
pub const CLONE_USERNAME: &str = "x-access-token";

const WORKSPACE_PREFIX: &str = "repo";
const GIT_PROGRAM: &str = "git";

/// Runs actions against throwaway shallow clones
#[derive(Debug, Clone)]
pub struct CloneExecutor {
    temp_root: PathBuf,
    git_program: PathBuf,
}

impl Default for CloneExecutor {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            git_program: PathBuf::from(GIT_PROGRAM),
        }
    }
}

impl CloneExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create workspaces under `temp_root` instead of the host temp directory
    pub fn in_dir(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            ..Self::default()
        }
    }

    /// Run this git executable instead of `git` from `PATH`
    pub fn with_git_program(mut self, git_program: impl Into<PathBuf>) -> Self {
        self.git_program = git_program.into();
        self
    }

    /// Clone `branch` of `repo_url` (depth 1) and run `action` on the checkout
    ///
    /// An empty `token` clones anonymously. The action's return value is
    /// passed through untouched.
    pub fn clone_and_run<R, F>(&self, repo_url: &str, branch: &str, token: &str, action: F) -> Result<R>
    where
        F: FnOnce(&Path) -> R,
    {
        let workspace = self.create_workspace()?;

        shallow_clone(&self.git_program, repo_url, branch, token, workspace.path())?;

        debug!(path = %workspace.path().display(), "Running action in workspace");
        Ok(action(workspace.path()))
    }

    fn create_workspace(&self) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.temp_root)
            .map_err(|e| {
                error!(root = %self.temp_root.display(), error = %e, "Failed to create workspace");
                Error::Workspace(e)
            })
    }
}

/// [`CloneExecutor::clone_and_run`] under the host temp directory
pub fn clone_and_run<R, F>(repo_url: &str, branch: &str, token: &str, action: F) -> Result<R>
where
    F: FnOnce(&Path) -> R,
{
    CloneExecutor::default().clone_and_run(repo_url, branch, token, action)
}

/// Value for an `Authorization: Basic` header carrying `token`
pub fn basic_credentials(token: &str) -> String {
    general_purpose::STANDARD.encode(format!("{CLONE_USERNAME}:{token}"))
}

fn shallow_clone(
    git_program: &Path,
    repo_url: &str,
    branch: &str,
    token: &str,
    dest: &Path,
) -> Result<()> {
    let clone_error = |details: String| Error::Clone {
        url: repo_url.to_string(),
        branch: branch.to_string(),
        details,
    };

    let mut command = Command::new(git_program);
    command.env("GIT_TERMINAL_PROMPT", "0");
    if !token.is_empty() {
        // Config from the environment: the header stays out of both argv and .git/config
        command
            .env("GIT_CONFIG_COUNT", "1")
            .env("GIT_CONFIG_KEY_0", "http.extraHeader")
            .env(
                "GIT_CONFIG_VALUE_0",
                format!("Authorization: Basic {}", basic_credentials(token)),
            );
    }
    command
        .args(["clone", "--depth", "1", "--single-branch", "--branch", branch, "--"])
        .arg(repo_url)
        .arg(dest);

    let output = command
        .output()
        .map_err(|e| clone_error(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(url = %repo_url, branch, stderr = %stderr, "Failed to clone repository");
        return Err(clone_error(stderr));
    }

    info!(url = %repo_url, branch, "Cloned repository");
    Ok(())
}
