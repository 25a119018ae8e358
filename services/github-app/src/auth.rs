//! GitHub App Authentication
//!
//! Utilities for authenticating as a GitHub App using JWT and installation tokens.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::client::{ACCEPT_GITHUB_JSON, GITHUB_API_VERSION, USER_AGENT};
use crate::error::{Error, Result};

/// PEM-encoded app private key
pub const PRIVATE_KEY_ENV: &str = "GITHUB_APP_PRIVATE_KEY";

/// Base64-encoded PEM, read when `GITHUB_APP_PRIVATE_KEY` is unset
pub const PRIVATE_KEY_B64_ENV: &str = "GITHUB_APP_PRIVATE_KEY_B64";

/// JWT claims for GitHub App authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct GitHubAppClaims {
    /// Issued at time (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issuer (GitHub App ID)
    pub iss: String,
}

impl GitHubAppClaims {
    /// Claims for a JWT issued at `now`
    pub fn issued_at(app_id: i64, now: u64) -> Self {
        Self {
            iat: now.saturating_sub(60), // 60 seconds ago to account for clock skew
            exp: now + 600,              // Expires in 10 minutes
            iss: app_id.to_string(),
        }
    }
}

/// Response from GitHub installation token endpoint
#[derive(Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where the app private key comes from
///
/// The key is loaded again on every exchange; nothing is cached.
#[derive(Clone, Default)]
pub enum KeySource {
    /// `GITHUB_APP_PRIVATE_KEY`, then `GITHUB_APP_PRIVATE_KEY_B64`
    #[default]
    Environment,
    /// PEM bytes supplied by the caller
    Inline(Vec<u8>),
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Environment => write!(f, "Environment"),
            KeySource::Inline(_) => write!(f, "Inline(<redacted>)"),
        }
    }
}

impl KeySource {
    /// Load the PEM bytes
    pub fn load(&self) -> Result<Vec<u8>> {
        match self {
            KeySource::Environment => load_private_key_with(|name| std::env::var(name).ok()),
            KeySource::Inline(pem) => Ok(pem.clone()),
        }
    }
}

fn load_private_key_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Vec<u8>> {
    let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = present(PRIVATE_KEY_ENV) {
        return Ok(value.into_bytes());
    }
    if let Some(encoded) = present(PRIVATE_KEY_B64_ENV) {
        return general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| {
                Error::CredentialExchange(format!("{PRIVATE_KEY_B64_ENV} is not valid base64: {e}"))
            });
    }

    Err(Error::CredentialExchange(format!(
        "{PRIVATE_KEY_ENV} not set"
    )))
}

/// Generate a JWT for GitHub App authentication
///
/// # Arguments
/// * `app_id` - The GitHub App ID
/// * `private_key_pem` - The private key in PEM format
///
/// # Returns
/// A JWT string valid for 10 minutes
pub fn generate_jwt(app_id: i64, private_key_pem: &[u8]) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::CredentialExchange(format!("Failed to get current time: {e}")))?
        .as_secs();

    let claims = GitHubAppClaims::issued_at(app_id, now);

    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem).map_err(|e| {
        Error::CredentialExchange(format!("Failed to parse private key as RSA PEM: {e}"))
    })?;

    let header = Header::new(Algorithm::RS256);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| Error::CredentialExchange(format!("Failed to encode JWT: {e}")))
}

/// Exchange JWT for an installation access token using the GitHub REST API
pub async fn exchange_installation_token(
    http: &reqwest::Client,
    api_base: &str,
    jwt: &str,
    installation_id: i64,
) -> Result<InstallationToken> {
    let url = format!(
        "{}/app/installations/{}/access_tokens",
        api_base.trim_end_matches('/'),
        installation_id
    );
    debug!(installation_id, url = %url, "Requesting installation token");

    let response = http
        .post(&url)
        .bearer_auth(jwt)
        .header("Accept", ACCEPT_GITHUB_JSON)
        .header("User-Agent", USER_AGENT)
        .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
        .send()
        .await
        .map_err(|e| {
            Error::CredentialExchange(format!("Failed to send request to GitHub API: {e}"))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::CredentialExchange(format!(
            "GitHub API error ({status}): {body}"
        )));
    }

    let token = response.json::<InstallationToken>().await.map_err(|e| {
        Error::CredentialExchange(format!("Failed to parse installation token response: {e}"))
    })?;

    if token.token.is_empty() {
        return Err(Error::CredentialExchange(
            "GitHub returned an empty installation token".to_string(),
        ));
    }

    Ok(token)
}
