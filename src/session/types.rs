use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::Session;
use crate::shared::AppError;

/// Longest accepted value for any optional request field
const MAX_FIELD_LEN: usize = 256;

/// Optional client metadata sent with a session request.
/// Every field may be omitted; unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionRequest {
    /// Requested capability scope
    #[serde(default)]
    pub scope: Option<String>,
    /// Caller-supplied user identifier, carried as the `sub` claim
    #[serde(default)]
    pub user: Option<String>,
}

impl SessionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_field("scope", self.scope.as_deref())?;
        validate_field("user", self.user.as_deref())
    }
}

fn validate_field(name: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        None => Ok(()),
        Some(v) if v.trim().is_empty() => {
            Err(AppError::BadRequest(format!("{} must not be empty", name)))
        }
        Some(v) if v.chars().count() > MAX_FIELD_LEN => Err(AppError::BadRequest(format!(
            "{} must be at most {} characters",
            name, MAX_FIELD_LEN
        ))),
        Some(_) => Ok(()),
    }
}

/// JWT claims carried by an issued session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub jti: String, // 128 random bits, base64url
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub iat: usize, // Issued at timestamp (standard JWT claim)
    pub exp: usize, // Expiration timestamp (standard JWT claim)
}

/// Response body of the session creation endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            issued_at: session.issued_at,
            expires_at: session.expires_at,
        }
    }
}
