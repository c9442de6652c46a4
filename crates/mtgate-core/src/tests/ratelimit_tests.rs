//! Sliding-window rate limiter tests

use std::time::Duration;
use tokio::time::{Instant, advance};

use crate::ratelimit::{DEFAULT_MAX_ACTIONS, RateLimiter, Verdict};

#[tokio::test(start_paused = true)]
async fn test_allows_up_to_limit_then_rejects() {
    let limiter = RateLimiter::new();

    for _ in 0..DEFAULT_MAX_ACTIONS {
        assert_eq!(limiter.check(7), Verdict::Allowed);
    }
    assert_eq!(limiter.check(7), Verdict::Limited);
    assert_eq!(limiter.limited_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_users_are_throttled_independently() {
    let limiter = RateLimiter::with_policy(Duration::from_secs(60), 1);

    assert_eq!(limiter.check(1), Verdict::Allowed);
    assert_eq!(limiter.check(1), Verdict::Limited);
    assert_eq!(limiter.check(2), Verdict::Allowed);
}

#[tokio::test(start_paused = true)]
async fn test_window_expiry_restores_budget() {
    let limiter = RateLimiter::with_policy(Duration::from_secs(60), 2);

    assert_eq!(limiter.check(1), Verdict::Allowed);
    assert_eq!(limiter.check(1), Verdict::Allowed);
    assert_eq!(limiter.check(1), Verdict::Limited);

    advance(Duration::from_secs(61)).await;
    assert_eq!(limiter.check(1), Verdict::Allowed);
}

#[tokio::test(start_paused = true)]
async fn test_limited_attempts_do_not_extend_the_window() {
    let limiter = RateLimiter::with_policy(Duration::from_secs(60), 1);

    assert_eq!(limiter.check(1), Verdict::Allowed);

    // Hammering while limited must not push the window forward: once the
    // original action ages out, the user is allowed again.
    for _ in 0..10 {
        advance(Duration::from_secs(5)).await;
        assert_eq!(limiter.check(1), Verdict::Limited);
    }
    advance(Duration::from_secs(61)).await;
    assert_eq!(limiter.check(1), Verdict::Allowed);
}

#[tokio::test(start_paused = true)]
async fn test_check_at_prunes_only_expired_actions() {
    let limiter = RateLimiter::with_policy(Duration::from_secs(60), 2);
    let start = Instant::now();

    assert_eq!(limiter.check_at(1, start), Verdict::Allowed);
    assert_eq!(
        limiter.check_at(1, start + Duration::from_secs(30)),
        Verdict::Allowed
    );
    // First action is 61s old and drops out; the second is still live.
    assert_eq!(
        limiter.check_at(1, start + Duration::from_secs(61)),
        Verdict::Allowed
    );
    assert_eq!(
        limiter.check_at(1, start + Duration::from_secs(62)),
        Verdict::Limited
    );
}
