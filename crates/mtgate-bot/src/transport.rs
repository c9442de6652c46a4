//! Chat transport seam.
//!
//! The bot core is driven through two traits: [`Membership`] answers
//! channel-membership questions and [`Notifier`] delivers outbound
//! messages. Inbound traffic arrives as one JSON event per line, which
//! keeps the binary testable and lets any chat bridge feed it over a
//! pipe.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A user joined the gated channel.
    Join { user_id: i64, display_name: String },
    /// A user left (or was removed from) the gated channel.
    Leave { user_id: i64 },
    /// Explicit proxy request, the `/start` command.
    Start { user_id: i64, display_name: String },
    /// Admin stats request.
    Stats { user_id: i64 },
    /// Admin request to cycle the proxy daemon without a config change.
    Restart { user_id: i64 },
}

#[derive(Debug, thiserror::Error)]
#[error("membership lookup failed: {0}")]
pub struct MembershipError(pub String);

/// Channel membership oracle.
///
/// Lookups can fail (the chat platform is remote); callers must treat a
/// failure as "unknown" and never as membership.
#[async_trait]
pub trait Membership: Send + Sync {
    async fn is_member(&self, user_id: i64) -> Result<bool, MembershipError>;
}

/// Outbound message sink. Delivery is best effort; failures are logged
/// by implementations and never propagate into state transitions.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, user_id: i64, text: &str);
}

/// Notifier that writes outbound messages to the log. Stands in until a
/// chat bridge is attached to the process.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_text(&self, user_id: i64, text: &str) {
        tracing::info!("[outbound to {user_id}] {text}");
    }
}

/// Membership oracle that admits everyone. For local runs without a
/// chat bridge.
pub struct AllowAll;

#[async_trait]
impl Membership for AllowAll {
    async fn is_member(&self, _user_id: i64) -> Result<bool, MembershipError> {
        Ok(true)
    }
}

/// Read newline-delimited JSON events from `reader` into `tx` until EOF.
///
/// Malformed lines are logged and skipped so one bad event cannot wedge
/// the whole intake.
///
/// # Errors
///
/// Propagates read failures from the underlying stream.
pub async fn read_events<R>(
    reader: R,
    tx: mpsc::UnboundedSender<InboundEvent>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => {
                debug!("Inbound event: {event:?}");
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => warn!("Skipping malformed event line: {e}"),
        }
    }
    Ok(())
}
