//! Fixed-window request counter keyed by client identity.
//!
//! State is process-local and lost on restart. Each limiter instance is an
//! explicit object held in [`crate::state::AppState`], so the redirect and
//! management scopes keep separate tables.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

pub trait RateLimiter: Send + Sync {
    /// Counts a request for `key` and decides whether it may proceed.
    fn check(&self, key: &str) -> RateDecision;

    /// Drops records whose window has elapsed. Returns how many were removed.
    fn prune_expired(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    expires_at: Instant,
}

/// Allows `max` requests per key in each window of `window` length.
///
/// A window starts with the first request after the previous one elapsed.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    records: DashMap<String, WindowRecord>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max: max.max(1),
            window,
            records: DashMap::new(),
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }

    /// [`RateLimiter::check`] against an explicit clock reading.
    ///
    /// The entry guard holds the key's shard lock, so the read and the update
    /// of one key never interleave with another request for the same key.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut record = self
            .records
            .entry(key.to_string())
            .or_insert(WindowRecord {
                count: 0,
                expires_at: now,
            });

        if now >= record.expires_at {
            *record = WindowRecord {
                count: 1,
                expires_at: now + self.window,
            };
            return RateDecision::Allowed {
                remaining: self.max - 1,
            };
        }

        if record.count >= self.max {
            let remaining = record.expires_at.saturating_duration_since(now);
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return RateDecision::Limited {
                retry_after_secs: secs.max(1),
            };
        }

        record.count += 1;
        RateDecision::Allowed {
            remaining: self.max - record.count,
        }
    }

    pub fn prune_at(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at > now);
        before.saturating_sub(self.records.len())
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn prune_expired(&self) -> usize {
        self.prune_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_three_per_minute() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(
            limiter.check_at("1.2.3.4", start),
            RateDecision::Allowed { remaining: 2 }
        );
        assert_eq!(
            limiter.check_at("1.2.3.4", start + Duration::from_secs(1)),
            RateDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check_at("1.2.3.4", start + Duration::from_secs(2)),
            RateDecision::Allowed { remaining: 0 }
        );

        match limiter.check_at("1.2.3.4", start + Duration::from_secs(3)) {
            RateDecision::Limited { retry_after_secs } => {
                assert_eq!(retry_after_secs, 57);
                assert!(retry_after_secs <= 60);
            }
            other => panic!("expected limit, got {other:?}"),
        }

        assert_eq!(
            limiter.check_at("1.2.3.4", start + Duration::from_secs(60)),
            RateDecision::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        limiter.check_at("k", start);
        assert_eq!(
            limiter.check_at("k", start + Duration::from_millis(9_500)),
            RateDecision::Limited { retry_after_secs: 1 }
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(matches!(limiter.check_at("a", now), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at("b", now), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at("a", now), RateDecision::Limited { .. }));
    }

    #[test]
    fn test_prune_drops_elapsed_windows() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(10));
        let start = Instant::now();

        limiter.check_at("old", start);
        limiter.check_at("new", start + Duration::from_secs(8));

        assert_eq!(limiter.prune_at(start + Duration::from_secs(11)), 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_max() {
        let limiter = Arc::new(FixedWindowLimiter::new(50, Duration::from_secs(60)));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| {
                            matches!(limiter.check_at("shared", now), RateDecision::Allowed { .. })
                        })
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 50);
    }
}
