use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::SessionClaims;
use crate::shared::AppError;

/// HS256 signer/verifier bound to one secret and issuer name
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenSigner {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    /// Signs the claims into a compact JWT
    #[instrument(skip(self, claims))]
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AppError> {
        debug!(exp_timestamp = claims.exp, "Signing session token");

        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            debug!(error = %e, "Failed to encode session token");
            AppError::Internal
        })
    }

    /// Checks signature, issuer and expiry, returning the claims if valid
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        debug!("Decoding and validating session token");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| {
                debug!(jti = %data.claims.jti, exp = data.claims.exp, "Session token decoded");
                data.claims
            })
            .map_err(|e| {
                debug!(error = %e, "Failed to decode session token");
                AppError::Unauthorized(format!("Invalid session token: {}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims_expiring_in(secs: i64) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            jti: "AAAAAAAAAAAAAAAAAAAAAA".to_string(),
            iss: "chatkit-session".to_string(),
            sub: Some("user-1".to_string()),
            scope: None,
            iat: now as usize,
            exp: (now + secs) as usize,
        }
    }

    #[test]
    fn test_sign_and_verify_token() {
        let signer = TokenSigner::new("secret", "chatkit-session");
        let claims = claims_expiring_in(600);

        let token = signer.sign(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let verified = signer.verify(&token).unwrap();
        assert_eq!(verified, claims);
    }

    #[test]
    fn test_invalid_token() {
        let signer = TokenSigner::new("secret", "chatkit-session");
        let result = signer.verify("invalid.token.here");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_token_with_different_secret_is_rejected() {
        let signer = TokenSigner::new("secret-one", "chatkit-session");
        let other = TokenSigner::new("secret-two", "chatkit-session");

        let token = signer.sign(&claims_expiring_in(600)).unwrap();
        assert!(signer.verify(&token).is_ok());
        assert!(matches!(
            other.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_token_from_other_issuer_is_rejected() {
        let signer = TokenSigner::new("secret", "chatkit-session");
        let other = TokenSigner::new("secret", "someone-else");

        let token = signer.sign(&claims_expiring_in(600)).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = TokenSigner::new("secret", "chatkit-session");
        // well past the default 60s leeway
        let token = signer.sign(&claims_expiring_in(-600)).unwrap();
        assert!(matches!(
            signer.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
