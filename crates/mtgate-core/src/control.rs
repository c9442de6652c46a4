//! Abstract control over the external proxy daemon.
//!
//! The coordinator only needs stop/reload/start; how those map onto the
//! host is behind [`ServiceControl`] so tests can count calls and other
//! service managers can be plugged in.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {detail}")]
    Failed { command: String, detail: String },
}

/// Control operations on the proxy daemon.
///
/// All three are idempotent from the caller's perspective. `stop`
/// failure is tolerated by the coordinator (a daemon that is not
/// running cannot meaningfully fail to stop); `reload_manager` and
/// `start` failures are fatal to the enclosing operation.
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn stop(&self) -> Result<(), ControlError>;
    async fn reload_manager(&self) -> Result<(), ControlError>;
    async fn start(&self) -> Result<(), ControlError>;

    /// Whether the daemon currently reports as running.
    async fn is_active(&self) -> bool;

    /// Full stop/start cycle with a status probe, for the admin-facing
    /// restart command. Unlike the coordinator path this does not touch
    /// the unit file.
    ///
    /// # Errors
    ///
    /// Fails when `start` fails or the daemon does not report active
    /// afterwards.
    async fn restart(&self) -> Result<(), ControlError> {
        if let Err(e) = self.stop().await {
            warn!("Stop before restart failed (continuing): {e}");
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.start().await?;

        if self.is_active().await {
            info!("Service restarted");
            Ok(())
        } else {
            Err(ControlError::Failed {
                command: "restart".to_string(),
                detail: "service did not come back up".to_string(),
            })
        }
    }
}

/// systemd-backed implementation shelling out to `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemdControl {
    unit: String,
}

impl SystemdControl {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }

    async fn systemctl(args: &[&str]) -> Result<(), ControlError> {
        let command = format!("systemctl {}", args.join(" "));
        let output = Command::new("systemctl")
            .args(args)
            .output()
            .await
            .map_err(|source| ControlError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ControlError::Failed {
                command,
                detail: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }

}

#[async_trait]
impl ServiceControl for SystemdControl {
    async fn stop(&self) -> Result<(), ControlError> {
        Self::systemctl(&["stop", &self.unit]).await
    }

    async fn reload_manager(&self) -> Result<(), ControlError> {
        Self::systemctl(&["daemon-reload"]).await
    }

    async fn start(&self) -> Result<(), ControlError> {
        Self::systemctl(&["start", &self.unit]).await
    }

    async fn is_active(&self) -> bool {
        Command::new("systemctl")
            .args(["is-active", "--quiet", &self.unit])
            .status()
            .await
            .is_ok_and(|status| status.success())
    }
}
