// Library crate for the chat-kit session issuer
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod middleware;
pub mod rate_limit;
pub mod session;
pub mod shared;
pub mod telemetry;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Re-export commonly used types for easier access in tests
pub use config::IssuerConfig;
pub use rate_limit::{FixedWindowRateLimiter, RateDecision, RateLimiter};
pub use session::{SessionIssuer, SessionRequest, SessionResponse};
pub use shared::{AppError, AppState, NOT_CONFIGURED_MESSAGE};
pub use telemetry::{IssuanceTelemetry, RecordingTelemetry, TracingTelemetry};

/// Largest accepted `/session` request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the HTTP router with all routes and layers attached
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/session",
            post(session::create_session).fallback(session::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
