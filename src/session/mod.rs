// Public API - what other modules can use
pub use handlers::{client_key, create_session, method_not_allowed};
pub use middleware::require_session;
pub use models::Session;
pub use secrets::{EnvSecretSource, SecretError, SecretSource, StaticSecretSource, UnavailableSecretSource};
pub use service::SessionIssuer;
pub use types::{SessionClaims, SessionRequest, SessionResponse};

// Internal modules
pub mod generators;
mod handlers;
mod middleware;
pub mod models;
pub mod secrets;
pub mod service;
pub mod token;
pub mod types;
