use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde_json::Value;
use std::net::SocketAddr;
use tracing::{info, instrument, warn};

use super::{
    models::Session,
    types::{SessionRequest, SessionResponse},
};
use crate::middleware::RequestId;
use crate::rate_limit::RateDecision;
use crate::shared::{AppError, AppState};
use crate::telemetry::{IssuanceEvent, IssuanceOutcome};

/// HTTP handler for creating a new session
///
/// POST /session
/// Body is an optional JSON object. Returns 201 with the signed token and
/// its issue/expiry timestamps.
#[instrument(name = "create_session", skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let client = client_key(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.trust_forwarded_headers,
    );
    info!(
        client = %client,
        body_len = body.as_ref().map(|b| b.len()).ok(),
        "Creating new session"
    );

    let result = issue(&state, &client, body).await;
    let outcome = match &result {
        Ok(_) => IssuanceOutcome::Issued,
        Err(e) => IssuanceOutcome::Rejected(e.kind()),
    };
    record(&state, &client, request_id, outcome);

    let session = result?;
    info!(
        expires_at = %session.expires_at.to_rfc3339(),
        ttl_secs = session.ttl().num_seconds(),
        token_length = session.token.len(),
        "Session created successfully"
    );

    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// Any method other than POST on `/session`
#[instrument(name = "session_method_not_allowed", skip_all)]
pub async fn method_not_allowed(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    request_id: Option<Extension<RequestId>>,
) -> AppError {
    let client = client_key(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.trust_forwarded_headers,
    );
    warn!(client = %client, "Unsupported method on /session");

    let error = AppError::MethodNotAllowed;
    record(
        &state,
        &client,
        request_id,
        IssuanceOutcome::Rejected(error.kind()),
    );
    error
}

fn record(
    state: &AppState,
    client: &str,
    request_id: Option<Extension<RequestId>>,
    outcome: IssuanceOutcome,
) {
    state.telemetry.record(IssuanceEvent::new(
        outcome,
        client,
        request_id.map(|Extension(id)| id.0),
    ));
}

async fn issue(
    state: &AppState,
    client: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<Session, AppError> {
    if let RateDecision::Limited { retry_after } = state.rate_limiter.check(client) {
        // round up so clients never retry inside the window
        let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        return Err(AppError::RateLimited {
            retry_after_secs: retry_after_secs.max(1),
        });
    }

    let body = body.map_err(|rejection| {
        warn!(status = %rejection.status(), "Unreadable session request body");
        AppError::BadRequest(rejection.body_text())
    })?;

    let request = parse_request(&body)?;
    state.issuer.create_session(request).await
}

/// Parses the optional request body. Empty means "no metadata"; anything
/// else has to be a JSON object.
fn parse_request(body: &[u8]) -> Result<SessionRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SessionRequest::default());
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed session request body");
        AppError::BadRequest(format!("Malformed JSON body: {}", e))
    })?;

    if !value.is_object() {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid session request: {}", e)))
}

/// Identifies the caller for rate limiting.
///
/// The peer address is used unless `trust_forwarded` is set, in which case
/// the first `X-Forwarded-For` hop, then `X-Real-IP`, take precedence.
/// Falls back to `"unknown"` when nothing is available.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
    };

    trust_forwarded
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
