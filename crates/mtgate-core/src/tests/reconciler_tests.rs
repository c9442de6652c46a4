//! Membership reconciliation flow tests

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;

use super::fixtures::{MockControl, config_with_secrets, temp_store};
use crate::registry::{FileRegistry, UserRegistry};
use crate::{
    Error, JoinOutcome, LeaveOutcome, MembershipReconciler, Notice, NoticeKind,
    ProxyAccessCoordinator, RateLimiter,
};

struct Harness {
    _dir: tempfile::TempDir,
    control: Arc<MockControl>,
    registry: Arc<FileRegistry>,
    reconciler: MembershipReconciler<FileRegistry>,
    notices: mpsc::UnboundedReceiver<Notice>,
}

fn harness() -> Harness {
    harness_with_limit(crate::ratelimit::DEFAULT_MAX_ACTIONS)
}

fn harness_with_limit(max_actions: usize) -> Harness {
    let (dir, store) = temp_store(&config_with_secrets(0));
    let control = Arc::new(MockControl::new());
    let coordinator = Arc::new(ProxyAccessCoordinator::with_cooldown(
        store,
        control.clone(),
        Duration::ZERO,
    ));
    let registry = Arc::new(FileRegistry::open(dir.path().join("users.json")));
    let limiter = Arc::new(RateLimiter::with_policy(Duration::from_secs(60), max_actions));
    let (tx, rx) = mpsc::unbounded_channel();

    Harness {
        control,
        registry: registry.clone(),
        reconciler: MembershipReconciler::new(coordinator, registry, limiter, tx),
        notices: rx,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_join_grants_and_notifies() {
    let mut h = harness();

    let outcome = h.reconciler.on_join(42, "Alice").await.unwrap();

    assert_eq!(outcome, JoinOutcome::Granted);
    let record = h.registry.get(42).unwrap().unwrap();
    assert!(record.is_active);
    assert_eq!(
        h.notices.try_recv().unwrap(),
        Notice {
            user_id: 42,
            kind: NoticeKind::WelcomeNew
        }
    );
}

#[tokio::test]
async fn test_rejoin_with_active_grant_is_idempotent() {
    let mut h = harness();

    h.reconciler.on_join(42, "Alice").await.unwrap();
    let first_secret = h.registry.get(42).unwrap().unwrap().secret;
    let restarts_after_first = h.control.restart_calls();

    let outcome = h.reconciler.on_join(42, "Alice").await.unwrap();

    assert_eq!(outcome, JoinOutcome::AlreadyActive);
    assert_eq!(h.registry.get(42).unwrap().unwrap().secret, first_secret);
    assert_eq!(h.control.restart_calls(), restarts_after_first);

    h.notices.try_recv().unwrap();
    assert_eq!(h.notices.try_recv().unwrap().kind, NoticeKind::WelcomeBack);
}

#[tokio::test]
async fn test_leave_revokes_and_deactivates() {
    let mut h = harness();

    h.reconciler.on_join(42, "Alice").await.unwrap();
    let outcome = h.reconciler.on_leave(42).await.unwrap();

    assert_eq!(outcome, LeaveOutcome::Revoked);
    let record = h.registry.get(42).unwrap().unwrap();
    assert!(!record.is_active);

    h.notices.try_recv().unwrap();
    assert_eq!(h.notices.try_recv().unwrap().kind, NoticeKind::Deactivated);
}

#[tokio::test]
async fn test_leave_without_record_touches_nothing() {
    let mut h = harness();

    let outcome = h.reconciler.on_leave(42).await.unwrap();

    assert_eq!(outcome, LeaveOutcome::NoActiveRecord);
    assert_eq!(h.control.restart_calls(), 0);
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_leave_after_leave_is_noop() {
    let mut h = harness();

    h.reconciler.on_join(42, "Alice").await.unwrap();
    h.reconciler.on_leave(42).await.unwrap();
    let restarts = h.control.restart_calls();

    let outcome = h.reconciler.on_leave(42).await.unwrap();

    assert_eq!(outcome, LeaveOutcome::NoActiveRecord);
    assert_eq!(h.control.restart_calls(), restarts);
}

#[tokio::test]
async fn test_registry_untouched_when_coordinator_fails() {
    let h = harness();
    h.control.fail_start.store(true, Ordering::SeqCst);

    let err = h.reconciler.on_join(42, "Alice").await.unwrap_err();

    assert!(matches!(err, Error::DaemonControl(_)));
    assert!(h.registry.get(42).unwrap().is_none());
}

#[tokio::test]
async fn test_record_stays_active_when_revocation_fails() {
    let h = harness();

    h.reconciler.on_join(42, "Alice").await.unwrap();
    h.control.fail_start.store(true, Ordering::SeqCst);

    let err = h.reconciler.on_leave(42).await.unwrap_err();

    assert!(matches!(err, Error::DaemonControl(_)));
    // Still active, so the revocation can be retried later.
    assert!(h.registry.get(42).unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_limited_join_drops_without_mutation() {
    let mut h = harness_with_limit(0);

    let outcome = h.reconciler.on_join(42, "Alice").await.unwrap();

    assert_eq!(outcome, JoinOutcome::RateLimited);
    assert!(h.registry.get(42).unwrap().is_none());
    assert_eq!(h.control.restart_calls(), 0);
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_limited_leave_drops_without_mutation() {
    let h = harness_with_limit(1);

    h.reconciler.on_join(42, "Alice").await.unwrap();
    let outcome = h.reconciler.on_leave(42).await.unwrap();

    assert_eq!(outcome, LeaveOutcome::RateLimited);
    assert!(h.registry.get(42).unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_provide_access_mints_once() {
    let h = harness();

    let first = h.reconciler.provide_access(42, "Alice").await.unwrap();
    assert!(first.newly_created);

    let second = h.reconciler.provide_access(42, "Alice").await.unwrap();
    assert!(!second.newly_created);
    assert_eq!(second.secret, first.secret);
}

#[tokio::test]
async fn test_provide_access_surfaces_rate_limit() {
    let h = harness_with_limit(0);

    let err = h.reconciler.provide_access(42, "Alice").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited));
}
