//! Installation and app records
//!
//! The persistence layer is owned elsewhere; this module only defines the
//! lookups the session factory needs and an in-memory implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A GitHub App installation bound to a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub github_app_id: i64,
    pub github_installation_id: i64,
    /// `owner/name`
    pub repo_full_name: String,
}

/// A registered GitHub App. The private key is never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub github_app_id: i64,
    pub name: String,
}

/// Lookups against the installation/app persistence collaborator
///
/// `Ok(None)` means the record does not exist; `Err` means the store failed.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn installation_by_id_and_repo(
        &self,
        installation_id: i64,
        repo_full_name: &str,
    ) -> anyhow::Result<Option<Installation>>;

    async fn app(&self, app_id: i64) -> anyhow::Result<Option<App>>;
}

/// In-memory store for tests and single-tenant deployments
#[derive(Debug, Clone, Default)]
pub struct MemoryInstallationStore {
    installations: Vec<Installation>,
    apps: HashMap<i64, App>,
}

impl MemoryInstallationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installation(mut self, installation: Installation) -> Self {
        self.installations.push(installation);
        self
    }

    pub fn with_app(mut self, app: App) -> Self {
        self.apps.insert(app.github_app_id, app);
        self
    }
}

#[async_trait]
impl InstallationStore for MemoryInstallationStore {
    async fn installation_by_id_and_repo(
        &self,
        installation_id: i64,
        repo_full_name: &str,
    ) -> anyhow::Result<Option<Installation>> {
        Ok(self
            .installations
            .iter()
            .find(|i| {
                i.github_installation_id == installation_id && i.repo_full_name == repo_full_name
            })
            .cloned())
    }

    async fn app(&self, app_id: i64) -> anyhow::Result<Option<App>> {
        Ok(self.apps.get(&app_id).cloned())
    }
}
