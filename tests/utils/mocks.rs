use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chatkit_session::session::{SecretError, SecretSource};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Returns the secret only after sleeping, to exercise the fetch timeout
pub struct DelayedSecretSource {
    pub delay: Duration,
    pub secret: String,
}

impl DelayedSecretSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            secret: "delayed-secret".to_string(),
        }
    }
}

#[async_trait]
impl SecretSource for DelayedSecretSource {
    async fn signing_secret(&self) -> Result<String, SecretError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.secret.clone())
    }
}

/// Static secret that counts how often it was asked for
pub struct CountingSecretSource {
    secret: String,
    calls: AtomicUsize,
}

impl CountingSecretSource {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for CountingSecretSource {
    async fn signing_secret(&self) -> Result<String, SecretError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.secret.clone())
    }
}
