use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use chatkit_session::{
    router,
    session::{SecretSource, StaticSecretSource},
    AppState, FixedWindowRateLimiter, IssuerConfig, RecordingTelemetry, SessionIssuer,
};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Peer address every test request appears to come from
pub const TEST_PEER: ([u8; 4], u16) = ([192, 0, 2, 44], 51_000);

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub state: AppState,
    pub telemetry: Arc<RecordingTelemetry>,
}

pub struct TestSetupBuilder {
    config: IssuerConfig,
    secrets: Arc<dyn SecretSource>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            config: IssuerConfig::default(),
            secrets: Arc::new(StaticSecretSource::new(TEST_SECRET)),
        }
    }

    pub fn with_secret_source(mut self, secrets: Arc<dyn SecretSource>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_ttl = ttl;
        self
    }

    pub fn with_secret_timeout(mut self, timeout: Duration) -> Self {
        self.config.secret_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.config.rate_limit_max = max_requests;
        self.config.rate_limit_window = window;
        self
    }

    /// Identify clients by `X-Forwarded-For` as if behind a trusted proxy
    pub fn with_trusted_proxy(mut self) -> Self {
        self.config.trust_forwarded_headers = true;
        self
    }

    pub fn build(self) -> TestSetup {
        let telemetry = Arc::new(RecordingTelemetry::new());
        let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
            self.config.rate_limit_max,
            self.config.rate_limit_window,
        ));
        let trust_forwarded_headers = self.config.trust_forwarded_headers;
        let issuer = Arc::new(SessionIssuer::new(self.config, self.secrets));
        let state = AppState::new(issuer, rate_limiter, telemetry.clone())
            .trusting_forwarded_headers(trust_forwarded_headers);

        TestSetup {
            app: router(state.clone()).layer(MockConnectInfo(SocketAddr::from(TEST_PEER))),
            state,
            telemetry,
        }
    }
}

impl TestSetup {
    /// POSTs `body` to /session and returns status, headers and parsed JSON body
    pub async fn post_session(
        &self,
        body: &str,
        client_ip: Option<&str>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method("POST").uri("/session");
        if let Some(ip) = client_ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    /// Sends any request through the full router
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }
}
