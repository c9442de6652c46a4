//! mtgate bot entry point.
//!
//! Wires the coordination core to a line-based chat transport: inbound
//! membership events and commands arrive as JSON lines on stdin,
//! outbound messages go through the configured notifier.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mtgate_core::control::SystemdControl;
use mtgate_core::registry::FileRegistry;
use mtgate_core::service::ServiceStore;
use mtgate_core::{MembershipReconciler, ProxyAccessCoordinator, RateLimiter};

mod events;
mod settings;
mod texts;
mod transport;

use settings::Settings;
use texts::Lang;
use transport::{AllowAll, LogNotifier};

/// mtgate bot - membership-gated access control for an MTProxy daemon
#[derive(Parser, Debug)]
#[command(name = "mtgate-bot")]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file (JSON). Environment variables override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Systemd unit name of the proxy daemon
    #[arg(long, default_value = "MTProxy")]
    unit: String,
}

/// Set up logging with file output for debugging.
/// In debug builds, defaults to debug level and logs to timestamped file.
/// In release builds, defaults to info level and logs to stderr.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mtgate={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("mtgate-bot-{timestamp}.log");
        let log_path = temp_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();

        eprintln!("Logging to: {} (and stderr)", log_path.display());
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    setup_logging();

    let settings = Settings::load(args.config.as_deref())?;
    let lang = Lang::from_code(&settings.language);
    info!(
        "Starting mtgate bot for channel {} (unit {})",
        settings.channel_id, args.unit
    );

    let store = ServiceStore::new(&settings.service_unit_path);
    let control = Arc::new(SystemdControl::new(&args.unit));
    let coordinator = Arc::new(ProxyAccessCoordinator::with_cooldown(
        store.clone(),
        control.clone(),
        std::time::Duration::from_secs(settings.cooldown_seconds),
    ));
    let registry = Arc::new(FileRegistry::open(&settings.registry_path));
    let limiter = Arc::new(RateLimiter::new());

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let reconciler = MembershipReconciler::new(
        coordinator.clone(),
        registry.clone(),
        limiter,
        notice_tx,
    );

    let notifier = Arc::new(LogNotifier);
    let dispatcher = events::Dispatcher::new(
        reconciler,
        coordinator,
        registry,
        store,
        control,
        AllowAll,
        notifier.clone(),
        lang,
        settings.admin_user_id,
        settings.public_ip.clone(),
    );

    tokio::spawn(events::pump_notices(notice_rx, notifier, lang));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let dispatch = tokio::spawn(dispatcher.run(event_rx));

    transport::read_events(tokio::io::BufReader::new(tokio::io::stdin()), event_tx).await?;
    dispatch.await?;

    info!("mtgate bot stopped");
    Ok(())
}
