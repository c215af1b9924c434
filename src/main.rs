use chatkit_session::{
    router, session::EnvSecretSource, AppState, FixedWindowRateLimiter, IssuerConfig,
    SessionIssuer, TracingTelemetry,
};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatkit_session=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting session issuer");

    let config = match IssuerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        ttl_secs = config.session_ttl.as_secs(),
        rate_limit_max = config.rate_limit_max,
        trust_proxy = config.trust_forwarded_headers,
        "Loaded configuration"
    );

    let bind_addr = config.bind_addr.clone();
    let trust_forwarded_headers = config.trust_forwarded_headers;
    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
        config.rate_limit_max,
        config.rate_limit_window,
    ));
    // The secret is looked up per request; a missing one yields 500s, not a crash
    let issuer = Arc::new(SessionIssuer::new(config, Arc::new(EnvSecretSource::new())));
    let app_state = AppState::new(issuer, rate_limiter, Arc::new(TracingTelemetry::new()))
        .trusting_forwarded_headers(trust_forwarded_headers);

    let app = router(app_state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %bind_addr, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    info!("Server running on http://{}", bind_addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await {
        error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
