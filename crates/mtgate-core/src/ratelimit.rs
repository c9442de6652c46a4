//! Per-user sliding-window throttle.
//!
//! Guards the coordinator from abusive request volume: at most 5
//! actions per user in any 60 second window, enforced lazily on each
//! check. A limited attempt is not recorded, so a user who keeps
//! hammering does not push their own window forward.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ACTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Limited,
}

pub struct RateLimiter {
    window: Duration,
    max_actions: usize,
    windows: Mutex<HashMap<i64, VecDeque<Instant>>>,
    limited: AtomicU64,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_WINDOW, DEFAULT_MAX_ACTIONS)
    }

    #[must_use]
    pub fn with_policy(window: Duration, max_actions: usize) -> Self {
        Self {
            window,
            max_actions,
            windows: Mutex::new(HashMap::new()),
            limited: AtomicU64::new(0),
        }
    }

    /// Check and record an action for `user_id` at the current time.
    pub fn check(&self, user_id: i64) -> Verdict {
        self.check_at(user_id, Instant::now())
    }

    /// Check and record an action at an explicit instant.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned, which only happens after
    /// a panic on another thread.
    pub fn check_at(&self, user_id: i64, now: Instant) -> Verdict {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let actions = windows.entry(user_id).or_default();

        while let Some(&oldest) = actions.front() {
            if now.duration_since(oldest) > self.window {
                actions.pop_front();
            } else {
                break;
            }
        }

        if actions.len() >= self.max_actions {
            self.limited.fetch_add(1, Ordering::Relaxed);
            return Verdict::Limited;
        }

        actions.push_back(now);
        Verdict::Allowed
    }

    /// Total attempts rejected since construction.
    #[must_use]
    pub fn limited_count(&self) -> u64 {
        self.limited.load(Ordering::Relaxed)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
