//! Daily request quota enforcement.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::Serialize;

use storyforge_domain::{AccessTier, Requester};

use crate::infrastructure::ports::{ClockPort, RateLimitStore};

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining_requests: u32,
    /// When the counter rolls over; set on denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<DateTime<Utc>>,
}

/// Enforces per-identity daily request counters.
///
/// Counting is delegated to the store's atomic conditional increment; this
/// layer resolves the UTC day bucket, the tier limit, and the reset time.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn ClockPort>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn ClockPort>) -> Self {
        Self { store, clock }
    }

    /// Consume one request from the identity's daily budget.
    ///
    /// Fails OPEN: a store error logs a warning and allows the request.
    /// Availability is prioritized over strict quota enforcement - the cost
    /// of a few extra generations is lower than turning users away on a
    /// storage hiccup. Deliberate and load-bearing; do not "fix" to fail
    /// closed.
    pub async fn enforce(&self, requester: &Requester, tier: AccessTier) -> RateLimitDecision {
        let now = self.clock.now();
        let date = now.date_naive();
        let limit = tier.daily_limit();
        let identity = requester.key();

        match self
            .store
            .try_increment(&identity, date, requester.is_guest(), limit)
            .await
        {
            Ok(check) if check.allowed => RateLimitDecision {
                allowed: true,
                limit,
                remaining_requests: limit.saturating_sub(check.count),
                reset_time: None,
            },
            Ok(_) => {
                tracing::info!(identity = %identity, tier = %tier, limit, "Daily story limit reached");
                RateLimitDecision {
                    allowed: false,
                    limit,
                    remaining_requests: 0,
                    reset_time: Some(next_utc_midnight(now)),
                }
            }
            Err(e) => {
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    "Rate-limit store unavailable, failing open"
                );
                RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining_requests: limit,
                    reset_time: None,
                }
            }
        }
    }

    /// Read the identity's standing without consuming quota.
    ///
    /// Follows the same fail-open policy as `enforce`.
    pub async fn status(&self, requester: &Requester, tier: AccessTier) -> RateLimitDecision {
        let now = self.clock.now();
        let date = now.date_naive();
        let limit = tier.daily_limit();
        let identity = requester.key();

        let used = match self.store.get(&identity, date).await {
            Ok(record) => record.map(|r| r.request_count).unwrap_or(0),
            Err(e) => {
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    "Rate-limit store unavailable, failing open"
                );
                0
            }
        };

        let remaining = limit.saturating_sub(used);
        RateLimitDecision {
            allowed: remaining > 0,
            limit,
            remaining_requests: remaining,
            reset_time: (remaining == 0).then(|| next_utc_midnight(now)),
        }
    }
}

/// Start of the next UTC day - when daily counters roll over.
fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or(now.date_naive());
    next_day
        .and_time(NaiveTime::MIN)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use storyforge_domain::RateLimitRecord;

    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::persistence::memory::InMemoryRateLimitStore;
    use crate::infrastructure::ports::{QuotaCheck, RepoError};

    fn fixed_clock() -> Arc<FixedClock> {
        let now = Utc
            .with_ymd_and_hms(2025, 6, 15, 13, 45, 0)
            .single()
            .expect("valid timestamp");
        Arc::new(FixedClock(now))
    }

    #[tokio::test]
    async fn test_guest_gets_three_requests_then_denial() {
        let limiter = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), fixed_clock());
        let guest = Requester::guest("s-1");

        let mut allowed = Vec::new();
        let mut remaining = Vec::new();
        for _ in 0..4 {
            let decision = limiter.enforce(&guest, AccessTier::Guest).await;
            allowed.push(decision.allowed);
            remaining.push(decision.remaining_requests);
        }

        assert_eq!(allowed, vec![true, true, true, false]);
        assert_eq!(remaining, vec![2, 1, 0, 0]);
    }

    #[tokio::test]
    async fn test_denial_resets_at_next_utc_midnight() {
        let limiter = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), fixed_clock());
        let guest = Requester::guest("s-1");

        for _ in 0..3 {
            limiter.enforce(&guest, AccessTier::Guest).await;
        }
        let denied = limiter.enforce(&guest, AccessTier::Guest).await;

        let expected = Utc
            .with_ymd_and_hms(2025, 6, 16, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(denied.reset_time, Some(expected));
    }

    #[tokio::test]
    async fn test_premium_limit_is_one_hundred() {
        let limiter = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), fixed_clock());
        let user = Requester::user("u-1");

        let decision = limiter.enforce(&user, AccessTier::Premium).await;
        assert!(decision.allowed);
        assert_eq!(decision.limit, 100);
        assert_eq!(decision.remaining_requests, 99);
    }

    #[tokio::test]
    async fn test_status_does_not_consume_quota() {
        let limiter = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), fixed_clock());
        let guest = Requester::guest("s-1");

        limiter.enforce(&guest, AccessTier::Guest).await;
        let status = limiter.status(&guest, AccessTier::Guest).await;
        assert_eq!(status.remaining_requests, 2);

        let again = limiter.status(&guest, AccessTier::Guest).await;
        assert_eq!(again.remaining_requests, 2);
    }

    #[tokio::test]
    async fn test_counter_rolls_over_at_utc_midnight() {
        let before = Utc
            .with_ymd_and_hms(2025, 6, 15, 23, 59, 0)
            .single()
            .expect("valid timestamp");
        let after = Utc
            .with_ymd_and_hms(2025, 6, 16, 0, 1, 0)
            .single()
            .expect("valid timestamp");

        let mut clock = crate::infrastructure::ports::MockClockPort::new();
        let mut seq = mockall::Sequence::new();
        for ts in [before, before, before, after] {
            clock
                .expect_now()
                .times(1)
                .in_sequence(&mut seq)
                .return_const(ts);
        }

        let limiter = RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), Arc::new(clock));
        let guest = Requester::guest("s-1");

        for _ in 0..3 {
            assert!(limiter.enforce(&guest, AccessTier::Guest).await.allowed);
        }
        // A new UTC day starts a fresh counter.
        let fresh = limiter.enforce(&guest, AccessTier::Guest).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining_requests, 2);
    }

    struct FailingStore;

    #[async_trait]
    impl RateLimitStore for FailingStore {
        async fn try_increment(
            &self,
            _identity: &str,
            _date: NaiveDate,
            _is_guest: bool,
            _limit: u32,
        ) -> Result<QuotaCheck, RepoError> {
            Err(RepoError::Database("connection refused".to_string()))
        }

        async fn get(
            &self,
            _identity: &str,
            _date: NaiveDate,
        ) -> Result<Option<RateLimitRecord>, RepoError> {
            Err(RepoError::Database("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_error_fails_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore), fixed_clock());
        let guest = Requester::guest("s-1");

        let decision = limiter.enforce(&guest, AccessTier::Guest).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining_requests, 3);
    }
}
