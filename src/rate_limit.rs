//! Per-key fixed-window rate limiting.
//!
//! One `QuotaEntry` per limit key, kept in a shared [`DashMap`]. The limiter is
//! a politeness throttle, not a security boundary: with `fail_open` set (the
//! default) an internal fault lets the request through instead of failing it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::auth::ApiKeyContext;
use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;
use crate::tiers::{Tier, TierLimits};

// tracks requests for one key within the current window
#[derive(Debug, Clone)]
pub struct QuotaEntry {
    pub count: u32,
    pub window_reset_at: Instant,
}

// outcome of a single check-and-consume pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_in_secs: u64,
    },
    Rejected {
        limit: u32,
        retry_after_secs: u64,
    },
}

/// The quota table. Owned by `AppState` and injected into the middleware, so
/// lifecycle and test isolation stay explicit.
pub struct RateLimiter {
    table: DashMap<String, QuotaEntry>,
    fail_open: bool,
}

impl RateLimiter {
    pub fn new(fail_open: bool) -> Self {
        Self {
            table: DashMap::new(),
            fail_open,
        }
    }

    pub fn fail_open(&self) -> bool {
        self.fail_open
    }

    /// Check the key's quota and consume one point if allowed.
    ///
    /// Entries are created lazily, reset in place once their window has
    /// elapsed, and never incremented on rejection.
    pub fn check_and_consume(&self, key: &str, limits: TierLimits) -> Decision {
        let now = Instant::now();

        let mut entry = self
            .table
            .entry(key.to_string())
            .or_insert_with(|| QuotaEntry {
                count: 0,
                window_reset_at: now + limits.window,
            });

        // window expired? replace it wholesale
        if now > entry.window_reset_at {
            entry.count = 0;
            entry.window_reset_at = now + limits.window;
        }

        if entry.count >= limits.points {
            let retry = ceil_secs(entry.window_reset_at.saturating_duration_since(now)).max(1);
            return Decision::Rejected {
                limit: limits.points,
                retry_after_secs: retry,
            };
        }

        entry.count += 1;
        let remaining = limits.points - entry.count;
        let reset_in = ceil_secs(entry.window_reset_at.saturating_duration_since(now));
        drop(entry);

        metrics::QUOTA_ENTRIES.set(self.table.len() as f64);

        Decision::Allowed {
            limit: limits.points,
            remaining,
            reset_in_secs: reset_in,
        }
    }

    // read the current window without consuming quota; None reset means no live window
    pub fn peek(&self, key: &str, limits: TierLimits) -> (u32, Option<u64>) {
        let now = Instant::now();
        match self.table.get(key) {
            Some(entry) if now <= entry.window_reset_at => (
                limits.points.saturating_sub(entry.count),
                Some(ceil_secs(entry.window_reset_at.saturating_duration_since(now))),
            ),
            _ => (limits.points, None),
        }
    }

    /// Drop every entry whose window has already elapsed. Purely memory-bound
    /// cleanup: expired entries are also reset on next access.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.table.len();
        self.table.retain(|_, entry| entry.window_reset_at >= now);
        let after = self.table.len();
        metrics::QUOTA_ENTRIES.set(after as f64);
        before.saturating_sub(after)
    }

    pub fn entry_count(&self) -> usize {
        self.table.len()
    }

    pub fn count_for(&self, key: &str) -> Option<u32> {
        self.table.get(key).map(|e| e.count)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    if d.subsec_nanos() > 0 {
        d.as_secs() + 1
    } else {
        d.as_secs()
    }
}

pub(crate) fn set_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_at: i64) {
    headers.insert(HeaderName::from_static("x-ratelimit-limit"), limit.into());
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        remaining.into(),
    );
    headers.insert(HeaderName::from_static("x-ratelimit-reset"), reset_at.into());
}

// shared enforcement path for both middleware variants
async fn enforce(
    state: &AppState,
    key: String,
    limits: TierLimits,
    strict: bool,
    req: Request,
    next: Next,
) -> Response {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        state.limiter.check_and_consume(&key, limits)
    }));

    let decision = match outcome {
        Ok(decision) => decision,
        Err(_) => {
            metrics::LIMITER_FAILURES.inc();
            if state.limiter.fail_open() {
                warn!(key = %key, "limiter failure, letting request through");
                return next.run(req).await;
            }
            return ApiError::Internal("rate limiter failure".to_string()).into_response();
        }
    };

    match decision {
        Decision::Allowed {
            limit,
            remaining,
            reset_in_secs,
        } => {
            let mut resp = next.run(req).await;
            let reset_at = chrono::Utc::now().timestamp() + reset_in_secs as i64;
            set_rate_limit_headers(resp.headers_mut(), limit, remaining, reset_at);
            resp
        }
        Decision::Rejected {
            limit,
            retry_after_secs,
        } => {
            if strict {
                metrics::STRICT_RATE_LIMITED_TOTAL.inc();
            } else {
                metrics::RATE_LIMITED_TOTAL.inc();
            }
            debug!(key = %key, retry_after_secs, "rate limit exceeded");
            ApiError::RateLimited {
                limit,
                retry_after: retry_after_secs,
                reset_at: chrono::Utc::now().timestamp() + retry_after_secs as i64,
            }
            .into_response()
        }
    }
}

// general limiter: every authenticated API request consumes one point
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<ApiKeyContext>().cloned() else {
        // upstream auth did not run; reject without touching the table
        metrics::UNAUTHORIZED_TOTAL.inc();
        return ApiError::Unauthorized("API key required".to_string()).into_response();
    };

    let limits = Tier::resolve(&ctx.permissions).limits();
    let start = Instant::now();
    let resp = enforce(&state, ctx.id, limits, false, req, next).await;
    metrics::REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
    resp
}

// strict variant: separate counter under a prefixed key, half the allowance
pub async fn strict_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<ApiKeyContext>().cloned() else {
        metrics::UNAUTHORIZED_TOTAL.inc();
        return ApiError::Unauthorized("API key required".to_string()).into_response();
    };

    let limits = Tier::resolve(&ctx.permissions).limits().strict();
    let key = format!("strict_{}", ctx.id);
    enforce(&state, key, limits, true, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::Tier;
    use tokio::time::{Duration, advance};

    fn limiter() -> RateLimiter {
        RateLimiter::new(true)
    }

    #[tokio::test(start_paused = true)]
    async fn count_tracks_accepted_requests() {
        let limiter = limiter();
        let limits = Tier::Basic.limits();

        for n in 1..=50u32 {
            let decision = limiter.check_and_consume("key_a", limits);
            assert_eq!(limiter.count_for("key_a"), Some(n));
            match decision {
                Decision::Allowed { remaining, limit, .. } => {
                    assert_eq!(limit, 50);
                    assert_eq!(remaining, 50 - n);
                }
                Decision::Rejected { .. } => panic!("request {n} should be allowed"),
            }
        }

        // the 51st request within the same window is rejected and not counted
        let decision = limiter.check_and_consume("key_a", limits);
        assert!(matches!(decision, Decision::Rejected { limit: 50, .. }));
        assert_eq!(limiter.count_for("key_a"), Some(50));
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_resets_the_counter() {
        let limiter = limiter();
        let limits = Tier::Default.limits();

        for _ in 0..10 {
            limiter.check_and_consume("key_a", limits);
        }
        assert!(matches!(
            limiter.check_and_consume("key_a", limits),
            Decision::Rejected { .. }
        ));

        advance(Duration::from_secs(61)).await;

        // next request is accepted and the count restarts at 1
        assert!(matches!(
            limiter.check_and_consume("key_a", limits),
            Decision::Allowed { .. }
        ));
        assert_eq!(limiter.count_for("key_a"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn strict_and_general_counters_are_independent() {
        let limiter = limiter();
        let limits = Tier::Basic.limits();
        let strict = limits.strict();

        limiter.check_and_consume("key_a", limits);
        limiter.check_and_consume("key_a", limits);
        limiter.check_and_consume("strict_key_a", strict);

        assert_eq!(limiter.count_for("key_a"), Some(2));
        assert_eq!(limiter.count_for("strict_key_a"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_reports_remaining_window() {
        let limiter = limiter();
        let limits = Tier::Default.limits();

        for _ in 0..10 {
            limiter.check_and_consume("key_a", limits);
        }
        advance(Duration::from_secs(40)).await;

        match limiter.check_and_consume("key_a", limits) {
            Decision::Rejected {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, 20),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_tier_never_rejects() {
        let limiter = limiter();
        let limits = Tier::Unlimited.limits();

        for _ in 0..10_000 {
            assert!(matches!(
                limiter.check_and_consume("key_a", limits),
                Decision::Allowed { .. }
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn peek_does_not_consume() {
        let limiter = limiter();
        let limits = Tier::Basic.limits();

        assert_eq!(limiter.peek("key_a", limits), (50, None));
        limiter.check_and_consume("key_a", limits);

        let (remaining, reset) = limiter.peek("key_a", limits);
        assert_eq!(remaining, 49);
        assert!(reset.is_some());
        assert_eq!(limiter.count_for("key_a"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_entries() {
        let limiter = limiter();
        let limits = Tier::Basic.limits();

        limiter.check_and_consume("old", limits);
        advance(Duration::from_secs(30)).await;
        limiter.check_and_consume("fresh", limits);
        advance(Duration::from_secs(31)).await;

        // "old"'s window ended a second ago, "fresh" still has 29s left
        let removed = limiter.sweep();
        assert_eq!(removed, 1);
        assert_eq!(limiter.count_for("old"), None);
        assert_eq!(limiter.count_for("fresh"), Some(1));
    }
}
