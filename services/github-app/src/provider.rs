//! Client Providers
//!
//! Trait-based abstraction over "give me an authenticated client for this
//! installation", so every consumer can run against a live GitHub App or a
//! local stand-in without changing code.

use async_trait::async_trait;
use tracing::{error, info};

use crate::auth::{exchange_installation_token, generate_jwt, InstallationToken, KeySource};
use crate::client::{GithubClient, DEFAULT_API_URL};
use crate::error::Result;

/// Token handed out by [`MockClientProvider`]
pub const MOCK_TOKEN: &str = "token";

/// Source of authenticated GitHub clients
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// Obtain a client scoped to one installation, plus the raw token
    ///
    /// The raw token is returned for callers that need it outside the REST
    /// client, e.g. basic-auth git clones.
    async fn obtain(&self, app_id: i64, installation_id: i64) -> Result<(GithubClient, String)>;
}

/// Production provider: signs an app JWT and exchanges it for an installation token
#[derive(Debug, Clone)]
pub struct AppClientProvider {
    http: reqwest::Client,
    api_base: String,
    key_source: KeySource,
}

impl Default for AppClientProvider {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl AppClientProvider {
    /// Provider reading the private key from the environment
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            key_source: KeySource::Environment,
        }
    }

    pub fn with_key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Run the JWT-to-installation-token exchange
    pub async fn installation_token(
        &self,
        app_id: i64,
        installation_id: i64,
    ) -> Result<InstallationToken> {
        let private_key = self.key_source.load()?;
        let jwt = generate_jwt(app_id, &private_key)?;
        exchange_installation_token(&self.http, &self.api_base, &jwt, installation_id).await
    }
}

#[async_trait]
impl ClientProvider for AppClientProvider {
    async fn obtain(&self, app_id: i64, installation_id: i64) -> Result<(GithubClient, String)> {
        let token = self
            .installation_token(app_id, installation_id)
            .await
            .inspect_err(|e| {
                error!(app_id, installation_id, error = %e, "Error initialising github app installation");
            })?;

        info!(
            app_id,
            installation_id,
            expires_at = %token.expires_at,
            "Obtained installation token"
        );

        let client = GithubClient::new(self.http.clone(), &self.api_base, &token.token);
        Ok((client, token.token))
    }
}

/// Test double: no key, no exchange, just a client pointed at an injected transport
#[derive(Debug, Clone)]
pub struct MockClientProvider {
    http: reqwest::Client,
    api_base: String,
}

impl MockClientProvider {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl ClientProvider for MockClientProvider {
    async fn obtain(&self, _app_id: i64, _installation_id: i64) -> Result<(GithubClient, String)> {
        let client = GithubClient::new(self.http.clone(), &self.api_base, MOCK_TOKEN);
        Ok((client, MOCK_TOKEN.to_string()))
    }
}
