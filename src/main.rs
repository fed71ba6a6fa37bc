use std::sync::Arc;

use anyhow::Context;

use registration_bot::channels::{Channel, CliChannel, TelegramChannel};
use registration_bot::config::{BotConfig, TransportConfig};
use registration_bot::dispatcher::Dispatcher;
use registration_bot::mirror::{GoogleSheetsMirror, MirrorSheet};
use registration_bot::registration::{Reconciler, RegistrationService};
use registration_bot::routes::{RegistrationRouteState, registration_routes};
use registration_bot::store::LibSqlBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env().context("Failed to read configuration")?;
    let _log_guard = registration_bot::logging::init("info", config.log_dir.as_deref())?;

    eprintln!("📝 Registration bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.store.db_path.display());

    // ── Database ─────────────────────────────────────────────────────────
    let db = Arc::new(
        LibSqlBackend::new_local(&config.store.db_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    config.store.db_path.display()
                )
            })?,
    );

    // ── Mirror ───────────────────────────────────────────────────────────
    let mirror: Option<Arc<dyn MirrorSheet>> = match config.sheets {
        Some(sheets) => {
            eprintln!(
                "   Mirror: Google Sheets {} (worksheet '{}')",
                sheets.spreadsheet_id, sheets.worksheet
            );
            Some(Arc::new(GoogleSheetsMirror::new(sheets)?))
        }
        None => {
            eprintln!("   Mirror: disabled");
            None
        }
    };

    let reconciler = Reconciler::new(db.clone(), mirror, config.store.timeout);
    let service = Arc::new(RegistrationService::new(
        db.clone(),
        reconciler,
        config.store.timeout,
    ));

    // ── REST API ─────────────────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let app = registration_routes(RegistrationRouteState { store: db.clone() });
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("Failed to bind HTTP port {port}"))?;
        eprintln!("   HTTP API: http://0.0.0.0:{port}/api/registrations/stats");
        tokio::spawn(async move {
            tracing::info!(port, "HTTP API started");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "HTTP API stopped");
            }
        });
    }

    // ── Channel ──────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.transport {
        TransportConfig::Telegram { bot_token } => {
            let telegram = TelegramChannel::new(bot_token);
            telegram
                .health_check()
                .await
                .context("Telegram bot token rejected")?;
            eprintln!("   Channel: telegram\n");
            Arc::new(telegram)
        }
        TransportConfig::Cli { user_id } => {
            eprintln!("   Channel: cli (user {user_id}). Type /start to begin.\n");
            Arc::new(CliChannel::new(user_id))
        }
    };

    Dispatcher::new(service, channel).run().await?;
    Ok(())
}
