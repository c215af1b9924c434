use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;
use tracing::{error, warn};

use crate::rate_limit::RateLimiter;
use crate::session::service::SessionIssuer;
use crate::telemetry::IssuanceTelemetry;

/// Body returned whenever issuance can't proceed because the signing
/// secret (or the store holding it) isn't available.
pub const NOT_CONFIGURED_MESSAGE: &str = "create-session function exists but is not wired yet";

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<SessionIssuer>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub telemetry: Arc<dyn IssuanceTelemetry>,
    /// Use forwarding headers rather than the peer address to identify clients
    pub trust_forwarded_headers: bool,
}

impl AppState {
    pub fn new(
        issuer: Arc<SessionIssuer>,
        rate_limiter: Arc<dyn RateLimiter>,
        telemetry: Arc<dyn IssuanceTelemetry>,
    ) -> Self {
        Self {
            issuer,
            rate_limiter,
            telemetry,
            trust_forwarded_headers: false,
        }
    }

    pub fn trusting_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }
}

/// Coarse classification of an [`AppError`], used in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    RateLimited,
    NotConfigured,
    Unauthorized,
    MethodNotAllowed,
    Internal,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Carries the operator-facing reason; callers only ever see
    /// [`NOT_CONFIGURED_MESSAGE`].
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) => ErrorKind::BadRequest,
            AppError::RateLimited { .. } => ErrorKind::RateLimited,
            AppError::NotConfigured(_) => ErrorKind::NotConfigured,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            AppError::Internal => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::RateLimited { .. } => "Too many requests, please retry later".to_string(),
            AppError::NotConfigured(reason) => {
                error!(reason = %reason, "Session issuer is not configured");
                NOT_CONFIGURED_MESSAGE.to_string()
            }
            AppError::Unauthorized(msg) => {
                warn!(reason = %msg, "Rejected unauthorized request");
                msg.clone()
            }
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            AppError::Internal => "Internal server error".to_string(),
        };

        // the not-configured body stays exactly `{"error": ...}`
        let body = match &self {
            AppError::NotConfigured(_) => Json(json!({
                "error": error_message
            })),
            _ => Json(json!({
                "error": error_message,
                "code": self.kind().as_ref(),
            })),
        };

        let mut response = (status, body).into_response();
        match self {
            AppError::RateLimited { retry_after_secs } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            AppError::MethodNotAllowed => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static("POST"));
            }
            _ => {}
        }
        response
    }
}
