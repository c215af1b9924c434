use chrono::Utc;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::{
    generators::{RandomTokenIdGenerator, TokenIdGenerator},
    models::Session,
    secrets::SecretSource,
    token::TokenSigner,
    types::{SessionClaims, SessionRequest},
};
use crate::{config::IssuerConfig, shared::AppError};

/// Issues short-lived signed session tokens.
///
/// Stateless: nothing is stored, and every call produces a new session.
/// Tokens are verified by anyone holding the same secret.
pub struct SessionIssuer {
    config: IssuerConfig,
    secrets: Arc<dyn SecretSource>,
    token_ids: Arc<dyn TokenIdGenerator>,
}

impl SessionIssuer {
    pub fn new(config: IssuerConfig, secrets: Arc<dyn SecretSource>) -> Self {
        Self::with_generator(config, secrets, Arc::new(RandomTokenIdGenerator::new()))
    }

    pub fn with_generator(
        config: IssuerConfig,
        secrets: Arc<dyn SecretSource>,
        token_ids: Arc<dyn TokenIdGenerator>,
    ) -> Self {
        Self {
            config,
            secrets,
            token_ids,
        }
    }

    /// Creates a new session credential for the request
    #[instrument(skip(self, request))]
    pub async fn create_session(&self, request: SessionRequest) -> Result<Session, AppError> {
        request.validate()?;

        let signer = self.signer().await?;

        let ttl = chrono::Duration::from_std(self.config.session_ttl).map_err(|_| {
            warn!(ttl = ?self.config.session_ttl, "Session TTL out of range");
            AppError::Internal
        })?;
        let (issued_at, expires_at) = Session::window(Utc::now(), ttl).ok_or_else(|| {
            warn!(ttl = ?self.config.session_ttl, "Session expiry out of range");
            AppError::Internal
        })?;

        let claims = SessionClaims {
            jti: self.token_ids.generate(),
            iss: self.config.issuer.clone(),
            sub: request.user,
            scope: request.scope,
            iat: issued_at.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = signer.sign(&claims)?;

        info!(
            jti = %claims.jti,
            expires_at = %expires_at.to_rfc3339(),
            "Session issued"
        );

        Ok(Session {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Verifies a previously issued token and returns its claims
    #[instrument(skip(self, token))]
    pub async fn verify_session(&self, token: &str) -> Result<SessionClaims, AppError> {
        let signer = self.signer().await?;
        let claims = signer.verify(token)?;
        info!(jti = %claims.jti, "Session token verified");
        Ok(claims)
    }

    /// Fetches the signing secret, bounded by the configured timeout
    async fn signer(&self) -> Result<TokenSigner, AppError> {
        let secret = match timeout(self.config.secret_timeout, self.secrets.signing_secret()).await
        {
            Ok(Ok(secret)) if !secret.is_empty() => secret,
            Ok(Ok(_)) => {
                return Err(AppError::NotConfigured(
                    "signing secret is empty".to_string(),
                ))
            }
            Ok(Err(e)) => return Err(AppError::NotConfigured(e.to_string())),
            Err(_) => {
                warn!(
                    timeout_ms = self.config.secret_timeout.as_millis() as u64,
                    "Timed out fetching signing secret"
                );
                return Err(AppError::NotConfigured(format!(
                    "secret fetch timed out after {:?}",
                    self.config.secret_timeout
                )));
            }
        };

        Ok(TokenSigner::new(&secret, self.config.issuer.clone()))
    }
}
