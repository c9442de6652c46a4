pub mod control;
pub mod registry;
pub mod service;

pub(crate) mod cooldown;

mod coordinator;
mod error;
mod link;
mod ratelimit;
mod reconciler;
mod secret;

#[cfg(test)]
mod tests;

pub use coordinator::{Admitted, CoordinatorStats, ProxyAccessCoordinator, Removed};
pub use cooldown::{DEFAULT_RESTART_COOLDOWN, time_until_ready};
pub use error::{Error, Result};
pub use link::{FALLBACK_PUBLIC_IP, build_link};
pub use ratelimit::{RateLimiter, Verdict};
pub use reconciler::{
    AccessGrant, JoinOutcome, LeaveOutcome, MembershipReconciler, Notice, NoticeKind,
};
pub use secret::Secret;
