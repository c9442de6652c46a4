//! Membership reconciliation.
//!
//! Translates external channel-membership changes (and explicit access
//! requests) into grant/revoke actions against the coordinator. The
//! ordering contract matters: the registry is written only after the
//! coordinator succeeded, so a user is never marked deactivated while
//! their secret is still live in the daemon, and vice versa.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::coordinator::ProxyAccessCoordinator;
use crate::ratelimit::{RateLimiter, Verdict};
use crate::registry::UserRegistry;
use crate::{Error, Result, Secret};

/// User-facing notice kinds; the transport layer localizes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    WelcomeNew,
    WelcomeBack,
    Deactivated,
}

/// A best-effort notification dispatched after a state transition
/// commits. Delivery failure never affects the transition's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub user_id: i64,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Existing active grant; nothing minted, user re-notified.
    AlreadyActive,
    /// A fresh secret was admitted and recorded.
    Granted,
    /// Event dropped before any mutation.
    RateLimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// No active record; nothing touched.
    NoActiveRecord,
    /// Secret evicted and record deactivated.
    Revoked,
    /// Event dropped before any mutation.
    RateLimited,
}

/// Result of the explicit request path ([`MembershipReconciler::provide_access`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub secret: Secret,
    pub newly_created: bool,
}

pub struct MembershipReconciler<R: UserRegistry> {
    coordinator: Arc<ProxyAccessCoordinator>,
    registry: Arc<R>,
    limiter: Arc<RateLimiter>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<R: UserRegistry> MembershipReconciler<R> {
    pub fn new(
        coordinator: Arc<ProxyAccessCoordinator>,
        registry: Arc<R>,
        limiter: Arc<RateLimiter>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            limiter,
            notices,
        }
    }

    /// Handle a user joining the channel.
    ///
    /// Rejoin with an active grant is idempotent: no new secret is
    /// minted. Otherwise a fresh secret goes through the coordinator
    /// and the record is created or reactivated only on success.
    ///
    /// # Errors
    ///
    /// Coordinator and registry failures propagate; the registry is
    /// untouched when the coordinator call failed.
    pub async fn on_join(&self, user_id: i64, display_name: &str) -> Result<JoinOutcome> {
        if self.limiter.check(user_id) == Verdict::Limited {
            warn!("Rate limited user {user_id}, dropping join event");
            return Ok(JoinOutcome::RateLimited);
        }

        if let Some(record) = self.registry.get(user_id)?
            && record.is_active
        {
            info!("User {user_id} rejoined with an active grant");
            self.notify(user_id, NoticeKind::WelcomeBack);
            return Ok(JoinOutcome::AlreadyActive);
        }

        let secret = Secret::generate();
        self.coordinator.add_secret(&secret).await?;
        self.registry.upsert(user_id, display_name, &secret)?;

        info!("Granted proxy access to user {user_id}");
        self.notify(user_id, NoticeKind::WelcomeNew);
        Ok(JoinOutcome::Granted)
    }

    /// Handle a user leaving the channel.
    ///
    /// The record is deactivated only after the coordinator confirmed
    /// the secret is gone from the daemon; on failure it stays active so
    /// the revocation can be retried.
    ///
    /// # Errors
    ///
    /// Coordinator and registry failures propagate.
    pub async fn on_leave(&self, user_id: i64) -> Result<LeaveOutcome> {
        if self.limiter.check(user_id) == Verdict::Limited {
            warn!("Rate limited user {user_id}, dropping leave event");
            return Ok(LeaveOutcome::RateLimited);
        }

        let Some(record) = self.registry.get(user_id)? else {
            debug!("User {user_id} left with no registry record");
            return Ok(LeaveOutcome::NoActiveRecord);
        };
        if !record.is_active {
            debug!("User {user_id} left with no active grant");
            return Ok(LeaveOutcome::NoActiveRecord);
        }

        self.coordinator.remove_secret(&record.secret).await?;
        self.registry.deactivate(user_id)?;

        info!("Revoked proxy access for user {user_id}");
        self.notify(user_id, NoticeKind::Deactivated);
        Ok(LeaveOutcome::Revoked)
    }

    /// Explicit request path (a `/start`-style command).
    ///
    /// Unlike the membership events, a limited request surfaces
    /// [`Error::RateLimited`] so the caller can send retry-soon
    /// messaging. The caller is responsible for having verified
    /// membership first.
    ///
    /// # Errors
    ///
    /// [`Error::RateLimited`] on throttle; otherwise as [`Self::on_join`].
    pub async fn provide_access(&self, user_id: i64, display_name: &str) -> Result<AccessGrant> {
        if self.limiter.check(user_id) == Verdict::Limited {
            return Err(Error::RateLimited);
        }

        if let Some(record) = self.registry.get(user_id)?
            && record.is_active
        {
            return Ok(AccessGrant {
                secret: record.secret,
                newly_created: false,
            });
        }

        let secret = Secret::generate();
        self.coordinator.add_secret(&secret).await?;
        self.registry.upsert(user_id, display_name, &secret)?;

        info!("Created proxy access for user {user_id} on request");
        Ok(AccessGrant {
            secret,
            newly_created: true,
        })
    }

    fn notify(&self, user_id: i64, kind: NoticeKind) {
        // Unbounded channel: the send itself cannot block the flow, and
        // a closed receiver only means the transport is gone.
        if self.notices.send(Notice { user_id, kind }).is_err() {
            warn!("Notice channel closed, dropping {kind:?} for user {user_id}");
        }
    }
}
