use std::env;
use std::time::Duration;

use thiserror::Error;

/// Longest session lifetime accepted from configuration (one day)
pub const MAX_SESSION_TTL_SECS: u64 = 86_400;

/// Process-wide settings for the session issuer.
///
/// Loaded once at startup and handed to the components that need it, so
/// tests can build one directly with whatever values they want.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    pub bind_addr: String,
    /// Value of the `iss` claim on issued tokens
    pub issuer: String,
    pub session_ttl: Duration,
    /// Upper bound on fetching the signing secret
    pub secret_timeout: Duration,
    /// Requests allowed per client per window (0 disables limiting)
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// Key rate limiting on `X-Forwarded-For`/`X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    MustBePositive { key: &'static str },

    #[error("{key} must be at most {max}")]
    TooLarge { key: &'static str, max: u64 },
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            issuer: "chatkit-session".to_string(),
            session_ttl: Duration::from_secs(600),
            secret_timeout: Duration::from_millis(2000),
            rate_limit_max: 30,
            rate_limit_window: Duration::from_secs(60),
            trust_forwarded_headers: false,
        }
    }
}

impl IssuerConfig {
    /// Loads configuration from `SESSION_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`IssuerConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let session_ttl_secs = parse_or(&lookup, "SESSION_TTL_SECONDS", 600u64)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::MustBePositive {
                key: "SESSION_TTL_SECONDS",
            });
        }
        if session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::TooLarge {
                key: "SESSION_TTL_SECONDS",
                max: MAX_SESSION_TTL_SECS,
            });
        }

        let secret_timeout_ms = parse_or(&lookup, "SESSION_SECRET_TIMEOUT_MS", 2000u64)?;
        if secret_timeout_ms == 0 {
            return Err(ConfigError::MustBePositive {
                key: "SESSION_SECRET_TIMEOUT_MS",
            });
        }

        let rate_limit_window_secs = parse_or(&lookup, "SESSION_RATE_LIMIT_WINDOW_SECS", 60u64)?;
        if rate_limit_window_secs == 0 {
            return Err(ConfigError::MustBePositive {
                key: "SESSION_RATE_LIMIT_WINDOW_SECS",
            });
        }

        Ok(Self {
            bind_addr: lookup("SESSION_BIND_ADDR").unwrap_or(defaults.bind_addr),
            issuer: lookup("SESSION_ISSUER")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.issuer),
            session_ttl: Duration::from_secs(session_ttl_secs),
            secret_timeout: Duration::from_millis(secret_timeout_ms),
            rate_limit_max: parse_or(&lookup, "SESSION_RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            trust_forwarded_headers: parse_or(
                &lookup,
                "SESSION_TRUST_PROXY",
                defaults.trust_forwarded_headers,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}
