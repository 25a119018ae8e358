//! AWS credentials from the process environment
//!
//! Digger-prefixed variables take precedence over the standard AWS ones so a
//! runner can hold separate credentials for the workflow itself. Environment
//! credentials never expire once retrieved.

use thiserror::Error;

/// Provider name attached to every retrieved credential set
pub const ENV_PROVIDER_NAME: &str = "DiggerEnvProvider";

const ACCESS_KEY_ID_VARS: [&str; 4] = [
    "DIGGER_AWS_ACCESS_KEY_ID",
    "DIGGER_AWS_ACCESS_KEY",
    "AWS_ACCESS_KEY_ID",
    "AWS_ACCESS_KEY",
];

const SECRET_ACCESS_KEY_VARS: [&str; 4] = [
    "DIGGER_AWS_SECRET_ACCESS_KEY",
    "DIGGER_AWS_SECRET_KEY",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SECRET_KEY",
];

const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsEnvError {
    #[error("DIGGER_AWS_ACCESS_KEY_ID, DIGGER_AWS_ACCESS_KEY, AWS_ACCESS_KEY_ID or AWS_ACCESS_KEY not found in environment")]
    AccessKeyIdNotFound,

    #[error("DIGGER_AWS_SECRET_ACCESS_KEY, DIGGER_AWS_SECRET_KEY, AWS_SECRET_ACCESS_KEY or AWS_SECRET_KEY not found in environment")]
    SecretAccessKeyNotFound,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub provider_name: &'static str,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .finish()
    }
}

/// Retrieves AWS keys from environment variables
#[derive(Debug, Default)]
pub struct EnvCredentialProvider {
    retrieved: bool,
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read credentials from the process environment
    pub fn retrieve(&mut self) -> Result<AwsCredentials, AwsEnvError> {
        self.retrieve_with(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; the first variable present wins
    pub fn retrieve_with<F>(&mut self, lookup: F) -> Result<AwsCredentials, AwsEnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.retrieved = false;

        let access_key_id =
            first_present(&ACCESS_KEY_ID_VARS, &lookup).ok_or(AwsEnvError::AccessKeyIdNotFound)?;
        let secret_access_key = first_present(&SECRET_ACCESS_KEY_VARS, &lookup)
            .ok_or(AwsEnvError::SecretAccessKeyNotFound)?;
        let session_token = lookup(SESSION_TOKEN_VAR).filter(|token| !token.is_empty());

        self.retrieved = true;
        Ok(AwsCredentials {
            access_key_id,
            secret_access_key,
            session_token,
            provider_name: ENV_PROVIDER_NAME,
        })
    }

    /// True until a retrieve succeeds
    pub fn is_expired(&self) -> bool {
        !self.retrieved
    }
}

fn first_present<F>(names: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| lookup(name))
}
