use chrono::{DateTime, Duration, SubsecRound, Utc};

/// An issued session credential. Never stored; handed straight back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Issuance timestamps truncated to whole seconds so they line up
    /// exactly with the token's `iat`/`exp` claims. `None` if the expiry
    /// falls outside the representable range.
    pub fn window(now: DateTime<Utc>, ttl: Duration) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at.checked_add_signed(ttl)?;
        Some((issued_at, expires_at))
    }

    pub fn ttl(&self) -> Duration {
        self.expires_at - self.issued_at
    }
}
