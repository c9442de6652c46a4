//! Inbound event dispatch.
//!
//! Bridges the transport layer to the coordination core: membership
//! events flow into the reconciler, the explicit request path checks
//! channel membership first, and outbound messages (including the
//! connection link) go through the notifier. A failed membership lookup
//! is treated as unknown and never grants access.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use mtgate_core::control::ServiceControl;
use mtgate_core::registry::{FileRegistry, UserRegistry};
use mtgate_core::service::ServiceStore;
use mtgate_core::{
    Error, FALLBACK_PUBLIC_IP, JoinOutcome, MembershipReconciler, Notice, ProxyAccessCoordinator,
    Secret, build_link,
};

use crate::texts::{self, Lang};
use crate::transport::{InboundEvent, Membership, Notifier};

pub struct Dispatcher<M: Membership, N: Notifier> {
    reconciler: MembershipReconciler<FileRegistry>,
    coordinator: Arc<ProxyAccessCoordinator>,
    registry: Arc<FileRegistry>,
    store: ServiceStore,
    control: Arc<dyn ServiceControl>,
    membership: M,
    notifier: Arc<N>,
    lang: Lang,
    admin_user_id: i64,
    public_ip: String,
}

impl<M: Membership, N: Notifier> Dispatcher<M, N> {
    #[allow(clippy::too_many_arguments)] // startup wiring, called once from main
    pub fn new(
        reconciler: MembershipReconciler<FileRegistry>,
        coordinator: Arc<ProxyAccessCoordinator>,
        registry: Arc<FileRegistry>,
        store: ServiceStore,
        control: Arc<dyn ServiceControl>,
        membership: M,
        notifier: Arc<N>,
        lang: Lang,
        admin_user_id: i64,
        public_ip: Option<String>,
    ) -> Self {
        Self {
            reconciler,
            coordinator,
            registry,
            store,
            control,
            membership,
            notifier,
            lang,
            admin_user_id,
            public_ip: public_ip.unwrap_or_else(|| FALLBACK_PUBLIC_IP.to_string()),
        }
    }

    /// Consume events until the channel closes.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<InboundEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }
        info!("Event channel closed, dispatcher stopping");
    }

    async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Join {
                user_id,
                display_name,
            } => self.handle_join(user_id, &display_name).await,
            InboundEvent::Leave { user_id } => self.handle_leave(user_id).await,
            InboundEvent::Start {
                user_id,
                display_name,
            } => self.handle_start(user_id, &display_name).await,
            InboundEvent::Stats { user_id } => self.handle_stats(user_id).await,
            InboundEvent::Restart { user_id } => self.handle_restart(user_id).await,
        }
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_id != 0 && user_id == self.admin_user_id
    }

    async fn handle_join(&self, user_id: i64, display_name: &str) {
        match self.reconciler.on_join(user_id, display_name).await {
            Ok(JoinOutcome::Granted | JoinOutcome::AlreadyActive) => {
                self.send_link(user_id).await;
            }
            Ok(JoinOutcome::RateLimited) => {}
            Err(e) => error!("Join handling failed for user {user_id}: {e}"),
        }
    }

    async fn handle_leave(&self, user_id: i64) {
        if let Err(e) = self.reconciler.on_leave(user_id).await {
            error!("Leave handling failed for user {user_id}: {e}");
        }
    }

    async fn handle_start(&self, user_id: i64, display_name: &str) {
        match self.check_membership(user_id).await {
            Ok(true) => {}
            Ok(false) => {
                self.notifier
                    .send_text(user_id, texts::must_join_first(self.lang))
                    .await;
                return;
            }
            Err(e) => {
                // Unknown membership must not grant access.
                warn!("Membership lookup failed for user {user_id}: {e}");
                self.notifier
                    .send_text(user_id, texts::membership_check_failed(self.lang))
                    .await;
                return;
            }
        }

        match self.reconciler.provide_access(user_id, display_name).await {
            Ok(grant) => {
                let text = format!(
                    "{}\n{}",
                    texts::proxy_ready(self.lang),
                    self.link_for(&grant.secret)
                );
                self.notifier.send_text(user_id, &text).await;
            }
            Err(Error::RateLimited) => {
                self.notifier
                    .send_text(user_id, texts::rate_limited(self.lang))
                    .await;
            }
            Err(e) => {
                error!("Access request failed for user {user_id}: {e}");
                self.notifier
                    .send_text(user_id, texts::creation_failed(self.lang))
                    .await;
            }
        }
    }

    async fn handle_restart(&self, user_id: i64) {
        if !self.is_admin(user_id) {
            self.notifier
                .send_text(user_id, texts::access_denied(self.lang))
                .await;
            return;
        }

        info!("Admin {user_id} requested a daemon restart");
        match self.control.restart().await {
            Ok(()) => {
                self.notifier
                    .send_text(user_id, texts::restart_succeeded(self.lang))
                    .await;
            }
            Err(e) => {
                error!("Admin restart failed: {e}");
                self.notifier
                    .send_text(user_id, texts::restart_failed(self.lang))
                    .await;
            }
        }
    }

    async fn handle_stats(&self, user_id: i64) {
        if !self.is_admin(user_id) {
            self.notifier
                .send_text(user_id, texts::access_denied(self.lang))
                .await;
            return;
        }

        let stats = self.coordinator.stats();
        let active = self
            .registry
            .list_active()
            .map_or(0, |users| users.len());
        let text = format!(
            "Bot statistics\nActive users: {active}\nProxies created: {}\nProxies removed: {}\nErrors: {}",
            stats.proxies_created, stats.proxies_removed, stats.errors
        );
        self.notifier.send_text(user_id, &text).await;
    }

    async fn check_membership(&self, user_id: i64) -> mtgate_core::Result<bool> {
        self.membership
            .is_member(user_id)
            .await
            .map_err(|e| Error::MembershipUnknown(e.to_string()))
    }

    /// Send the user their connection link, looked up from the registry.
    async fn send_link(&self, user_id: i64) {
        let Ok(Some(record)) = self.registry.get(user_id) else {
            warn!("No registry record for user {user_id} after grant");
            return;
        };
        let text = format!(
            "{}\n{}",
            texts::proxy_ready(self.lang),
            self.link_for(&record.secret)
        );
        self.notifier.send_text(user_id, &text).await;
    }

    fn link_for(&self, secret: &Secret) -> String {
        match self.store.load() {
            Ok(config) => build_link(secret, &config, &self.public_ip),
            Err(e) => {
                // The secret alone still lets the user connect manually.
                warn!("Could not load config for link, using bare secret: {e}");
                secret.to_string()
            }
        }
    }
}

/// Forward reconciler notices to the notifier until the channel closes.
pub async fn pump_notices<N: Notifier>(
    mut rx: mpsc::UnboundedReceiver<Notice>,
    notifier: Arc<N>,
    lang: Lang,
) {
    while let Some(notice) = rx.recv().await {
        notifier
            .send_text(notice.user_id, texts::notice_text(lang, notice.kind))
            .await;
    }
}
