//! Restart cooldown computation.
//!
//! The proxy daemon tolerates only so many restarts; the coordinator
//! waits out the remainder of the cooldown window before each mutation.
//! This is a pure function so the policy is testable without a clock.

use std::time::Duration;
use tokio::time::Instant;

/// Minimum interval between daemon restarts.
pub const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(5);

/// Remaining wait before another restart may proceed.
///
/// Returns zero when no restart has happened yet or the window has
/// already elapsed.
#[must_use]
pub fn time_until_ready(
    now: Instant,
    last_restart: Option<Instant>,
    cooldown: Duration,
) -> Duration {
    match last_restart {
        Some(last) => cooldown.saturating_sub(now.duration_since(last)),
        None => Duration::ZERO,
    }
}
