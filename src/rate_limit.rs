use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default upper bound on distinct keys held at once
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Decides whether a caller identified by `key` may make another request
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

/// Per-key fixed-window counter held in memory.
///
/// Each key gets `max_requests` within a window of `window`; the window
/// restarts on the first request after it has elapsed. A `max_requests`
/// of zero turns limiting off.
///
/// At most `max_keys` keys are tracked. Admitting a new key into a full
/// table first drops expired windows, then the oldest tenth of the rest.
pub struct FixedWindowRateLimiter {
    max_requests: u32,
    window: Duration,
    max_keys: usize,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl FixedWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_max_keys(max_requests, window, DEFAULT_MAX_TRACKED_KEYS)
    }

    pub fn with_max_keys(max_requests: u32, window: Duration, max_keys: usize) -> Self {
        Self {
            max_requests,
            window,
            max_keys: max_keys.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if self.max_requests == 0 {
            return RateDecision::Allowed;
        }

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() >= self.max_keys && !windows.contains_key(key) {
            self.make_room(&mut windows, now);
        }

        let entry = windows.entry(key.to_string()).or_insert(WindowState {
            window_start: now,
            count: 0,
        });

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.window_start));
            warn!(
                client = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return RateDecision::Limited { retry_after };
        }

        entry.count += 1;
        RateDecision::Allowed
    }

    fn make_room(&self, windows: &mut HashMap<String, WindowState>, now: Instant) {
        let window = self.window;
        windows.retain(|_, state| now.duration_since(state.window_start) < window);

        if windows.len() >= self.max_keys {
            let evict = (self.max_keys / 10).max(1) + windows.len() - self.max_keys;
            let mut by_age: Vec<(Instant, String)> = windows
                .iter()
                .map(|(k, state)| (state.window_start, k.clone()))
                .collect();
            by_age.sort_unstable_by_key(|(start, _)| *start);
            for (_, k) in by_age.into_iter().take(evict) {
                windows.remove(&k);
            }
        }
        debug!(remaining = windows.len(), "Evicted rate limit windows");
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_then_limits() {
        let limiter = FixedWindowRateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_at("10.0.0.1", now), RateDecision::Allowed);
        }

        match limiter.check_at("10.0.0.1", now + Duration::from_secs(20)) {
            RateDecision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(40));
            }
            RateDecision::Allowed => panic!("fourth request should be limited"),
        }
    }

    #[test]
    fn test_window_resets_after_elapsed() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(10));
        let now = Instant::now();

        assert_eq!(limiter.check_at("client", now), RateDecision::Allowed);
        assert!(matches!(
            limiter.check_at("client", now + Duration::from_secs(5)),
            RateDecision::Limited { .. }
        ));
        assert_eq!(
            limiter.check_at("client", now + Duration::from_secs(10)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(limiter.check_at("a", now), RateDecision::Allowed);
        assert_eq!(limiter.check_at("b", now), RateDecision::Allowed);
        assert!(matches!(
            limiter.check_at("a", now),
            RateDecision::Limited { .. }
        ));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_zero_max_disables_limiting() {
        let limiter = FixedWindowRateLimiter::new(0, Duration::from_secs(60));

        for _ in 0..100 {
            assert_eq!(limiter.check("anyone"), RateDecision::Allowed);
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_tracked_keys_are_capped() {
        let limiter = FixedWindowRateLimiter::with_max_keys(1, Duration::from_secs(60), 100);
        let now = Instant::now();

        for i in 0..1_000 {
            limiter.check_at(&format!("10.0.{}.{}", i / 256, i % 256), now);
            assert!(limiter.tracked_keys() <= 100);
        }
    }

    #[test]
    fn test_eviction_drops_oldest_windows_first() {
        let limiter = FixedWindowRateLimiter::with_max_keys(1, Duration::from_secs(60), 10);
        let start = Instant::now();

        for i in 0..10u64 {
            limiter.check_at(&format!("client-{}", i), start + Duration::from_secs(i));
        }
        // table is full; a newcomer pushes out client-0
        limiter.check_at("newcomer", start + Duration::from_secs(20));

        assert_eq!(
            limiter.check_at("client-0", start + Duration::from_secs(21)),
            RateDecision::Allowed
        );
        assert!(matches!(
            limiter.check_at("client-9", start + Duration::from_secs(21)),
            RateDecision::Limited { .. }
        ));
    }
}
