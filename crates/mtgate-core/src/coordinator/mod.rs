//! Serialized mutation of the proxy daemon's configuration.
//!
//! The daemon is a single shared external resource: concurrent restarts
//! would corrupt in-flight connections or the on-disk unit file. The
//! coordinator therefore runs every mutating operation inside one
//! process-wide critical section — wait out the cooldown, load the
//! config fresh, mutate, persist, restart the daemon, stamp the
//! cooldown — and callers queue behind its lock. A semaphore bounds the
//! queue so request floods are shed with [`Error::Busy`] instead of
//! growing without limit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::control::ServiceControl;
use crate::cooldown::{DEFAULT_RESTART_COOLDOWN, time_until_ready};
use crate::service::ServiceStore;
use crate::{Error, Result, Secret};

/// Upper bound on concurrently pending mutations before shedding.
pub const PENDING_OPERATION_LIMIT: usize = 50;

/// Outcome of [`ProxyAccessCoordinator::add_secret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admitted {
    /// The secret was inserted and the daemon restarted.
    Added,
    /// The secret was already granted; no restart happened.
    AlreadyPresent,
}

/// Outcome of [`ProxyAccessCoordinator::remove_secret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    /// The secret was evicted and the daemon restarted.
    Removed,
    /// The secret was not in the config; no restart happened.
    NotPresent,
}

/// Mutation counters, snapshotted for the admin stats surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub proxies_created: u64,
    pub proxies_removed: u64,
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    removed: AtomicU64,
    errors: AtomicU64,
}

struct MutationState {
    last_restart: Option<Instant>,
}

pub struct ProxyAccessCoordinator {
    store: ServiceStore,
    control: Arc<dyn ServiceControl>,
    cooldown: Duration,
    state: Mutex<MutationState>,
    admission: Semaphore,
    counters: Counters,
}

impl ProxyAccessCoordinator {
    #[must_use]
    pub fn new(store: ServiceStore, control: Arc<dyn ServiceControl>) -> Self {
        Self::with_cooldown(store, control, DEFAULT_RESTART_COOLDOWN)
    }

    #[must_use]
    pub fn with_cooldown(
        store: ServiceStore,
        control: Arc<dyn ServiceControl>,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            control,
            cooldown,
            state: Mutex::new(MutationState { last_restart: None }),
            admission: Semaphore::new(PENDING_OPERATION_LIMIT),
            counters: Counters::default(),
        }
    }

    /// Admit a secret into the daemon's live configuration.
    ///
    /// Idempotent: a secret that is already granted returns
    /// [`Admitted::AlreadyPresent`] without touching the daemon.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] when the pending queue is full,
    /// [`Error::ConfigUnreadable`] / [`Error::WriteFailed`] for unit
    /// file problems (the daemon is left untouched), and
    /// [`Error::DaemonControl`] when a restart step fails after the
    /// config was already persisted.
    pub async fn add_secret(&self, secret: &Secret) -> Result<Admitted> {
        let _permit = self.admission.try_acquire().map_err(|_| Error::Busy)?;
        let mut state = self.state.lock().await;

        self.wait_for_cooldown(state.last_restart).await;

        let mut config = self.load_config()?;
        if !config.insert(secret.clone()) {
            debug!("Secret {:?} already granted, nothing to do", secret);
            return Ok(Admitted::AlreadyPresent);
        }

        self.persist_and_restart(&config).await?;
        state.last_restart = Some(Instant::now());
        self.counters.created.fetch_add(1, Ordering::Relaxed);

        info!(
            "Granted secret {:?} ({} secrets active)",
            secret,
            config.secrets.len()
        );
        Ok(Admitted::Added)
    }

    /// Evict a secret from the daemon's live configuration.
    ///
    /// Idempotent: an absent secret returns [`Removed::NotPresent`]
    /// without touching the daemon.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::add_secret`].
    pub async fn remove_secret(&self, secret: &Secret) -> Result<Removed> {
        let _permit = self.admission.try_acquire().map_err(|_| Error::Busy)?;
        let mut state = self.state.lock().await;

        self.wait_for_cooldown(state.last_restart).await;

        let mut config = self.load_config()?;
        if !config.remove(secret) {
            debug!("Secret {:?} not in config, nothing to do", secret);
            return Ok(Removed::NotPresent);
        }

        self.persist_and_restart(&config).await?;
        state.last_restart = Some(Instant::now());
        self.counters.removed.fetch_add(1, Ordering::Relaxed);

        info!(
            "Revoked secret {:?} ({} secrets active)",
            secret,
            config.secrets.len()
        );
        Ok(Removed::Removed)
    }

    #[must_use]
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            proxies_created: self.counters.created.load(Ordering::Relaxed),
            proxies_removed: self.counters.removed.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    async fn wait_for_cooldown(&self, last_restart: Option<Instant>) {
        let wait = time_until_ready(Instant::now(), last_restart, self.cooldown);
        if !wait.is_zero() {
            info!("Waiting {:.1}s for daemon cooldown", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    fn load_config(&self) -> Result<crate::service::ProxyConfig> {
        self.store.load().inspect_err(|e| {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to load service unit: {e}");
        })
    }

    /// Persist the mutated config, then cycle the daemon. A failed write
    /// aborts before any control step; a failed reload/start leaves the
    /// persisted config ahead of the running daemon, which is surfaced
    /// to the caller rather than rolled back.
    async fn persist_and_restart(&self, config: &crate::service::ProxyConfig) -> Result<()> {
        self.store.save(config).inspect_err(|e| {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to persist service unit: {e}");
        })?;

        if let Err(e) = self.control.stop().await {
            // A daemon that is not running cannot meaningfully fail to stop.
            warn!("Daemon stop failed (tolerated): {e}");
        }

        let result = async {
            self.control.reload_manager().await?;
            self.control.start().await?;
            Ok::<(), crate::control::ControlError>(())
        }
        .await;

        result.map_err(|e| {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!("Daemon restart failed with config already persisted: {e}");
            Error::DaemonControl(e)
        })
    }
}
