use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Environment variable read by [`EnvSecretSource`] by default
pub const SIGNING_SECRET_VAR: &str = "SESSION_SIGNING_SECRET";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecretError {
    #[error("signing secret {0} is not set")]
    Missing(String),

    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Where the issuer gets the secret it signs tokens with.
///
/// Implementations may hit the network; the issuer bounds every call
/// with its configured timeout.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn signing_secret(&self) -> Result<String, SecretError>;
}

/// Reads the secret from an environment variable on every call, so a
/// secret added after startup is picked up without a restart.
pub struct EnvSecretSource {
    var: String,
}

impl EnvSecretSource {
    pub fn new() -> Self {
        Self::from_var(SIGNING_SECRET_VAR)
    }

    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSecretSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn signing_secret(&self) -> Result<String, SecretError> {
        match std::env::var(&self.var) {
            Ok(secret) if !secret.trim().is_empty() => {
                debug!(var = %self.var, "Loaded signing secret from environment");
                Ok(secret)
            }
            _ => Err(SecretError::Missing(self.var.clone())),
        }
    }
}

/// Fixed secret, for tests and embedding
pub struct StaticSecretSource {
    secret: String,
}

impl StaticSecretSource {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn signing_secret(&self) -> Result<String, SecretError> {
        Ok(self.secret.clone())
    }
}

/// Always fails, mirroring a deployment with no secret wired up
pub struct UnavailableSecretSource;

#[async_trait]
impl SecretSource for UnavailableSecretSource {
    async fn signing_secret(&self) -> Result<String, SecretError> {
        Err(SecretError::Unavailable("no secret source configured".to_string()))
    }
}
