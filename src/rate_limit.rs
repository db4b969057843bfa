// Rate-Limit Guard: process-wide, per-supplier "blocked until T" state.
//
// Consulted before every outbound call so that a supplier known to be
// rejecting traffic is never hit with a doomed request. The guard itself
// never touches the network; it only parses retry directives and answers a
// clock comparison.

use crate::clock::Clock;
use crate::supplier::Supplier;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound in seconds on any block window, so a malformed or hostile
/// Retry-After header cannot wedge a supplier closed indefinitely.
const MAX_BLOCK_SECS: i64 = 24 * 60 * 60;

/// Applied in seconds when the retry directive is absent or unparseable.
const DEFAULT_BLOCK_SECS: i64 = 60;

fn max_block() -> Duration {
    Duration::seconds(MAX_BLOCK_SECS)
}

fn default_block() -> Duration {
    Duration::seconds(DEFAULT_BLOCK_SECS)
}

pub struct RateLimitGuard {
    blocked_until: DashMap<Supplier, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl RateLimitGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            blocked_until: DashMap::new(),
            clock,
        }
    }

    /// Fast in-memory check; the first step of every orchestrator operation.
    pub fn is_blocked(&self, supplier: Supplier) -> bool {
        match self.blocked_until.get(&supplier) {
            Some(until) => self.clock.now() < *until,
            None => false,
        }
    }

    /// Record a capacity-exceeded signal. `retry_after` is the raw header
    /// value: a delay in seconds or an HTTP-date. Last write wins; writes are
    /// rare and serialized per supplier by the dashmap shard lock.
    pub fn record_block(&self, supplier: Supplier, retry_after: Option<&str>) {
        let now = self.clock.now();
        let window = parse_retry_after(retry_after, now);
        let until = now + window;
        debug!(%supplier, window_secs = window.num_seconds(), "recording rate-limit block");
        self.blocked_until.insert(supplier, until);
    }

    /// Remaining block window, if any. Callers can surface it as a
    /// retry-later hint.
    pub fn blocked_for(&self, supplier: Supplier) -> Option<Duration> {
        let until = *self.blocked_until.get(&supplier)?;
        let now = self.clock.now();
        (now < until).then(|| until - now)
    }
}

fn parse_retry_after(raw: Option<&str>, now: DateTime<Utc>) -> Duration {
    let raw = match raw {
        Some(raw) => raw.trim(),
        None => return default_block(),
    };

    // Delay-seconds form.
    if let Ok(secs) = raw.parse::<i64>() {
        if secs < 0 {
            warn!(retry_after = raw, "negative Retry-After, using default block");
            return default_block();
        }
        return Duration::seconds(secs).min(max_block());
    }

    // HTTP-date form.
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        let delta = date.with_timezone(&Utc) - now;
        return delta.clamp(Duration::zero(), max_block());
    }

    warn!(retry_after = raw, "unparseable Retry-After, using default block");
    default_block()
}
