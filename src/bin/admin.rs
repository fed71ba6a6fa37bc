use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use registration_bot::config::{SheetsConfig, StoreConfig};
use registration_bot::mirror::{GoogleSheetsMirror, MirrorSheet};
use registration_bot::registration::{MirrorOutcome, Reconciler};
use registration_bot::store::{LibSqlBackend, RegistrationStore, StoredRegistration};

#[derive(Parser)]
#[command(name = "registration-admin")]
#[command(about = "Inspect and maintain stored registrations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all registrations, newest first
    Users,
    /// Show registration counts
    Stats,
    /// Delete every registration from the primary store
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Write every stored registration to the spreadsheet mirror again
    Resync,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Да" } else { "Нет" }
}

fn print_registration(stored: &StoredRegistration) {
    let r = &stored.record;
    println!("👤 ID: {}", stored.id);
    println!("   Telegram ID: {}", r.telegram_id);
    match &r.username {
        Some(handle) => println!("   Username: @{handle}"),
        None => println!("   Username: Нет username"),
    }
    println!("   Имя: {} {}", r.first_name, r.last_name);
    println!("   Пакет: {}", r.package_type.display_name());
    println!("   Участвовал в МБ ранее: {}", yes_no(r.participated_before));
    if let Some(year) = &r.participation_year {
        println!("   Год участия: {year}");
    }
    println!("   Выпускник ВШМ: {}", yes_no(r.is_graduate));
    if let Some(year) = &r.graduation_year {
        println!("   Год выпуска: {year}");
    }
    println!(
        "   Дата регистрации: {}",
        stored.created_at.format("%d.%m.%Y %H:%M")
    );
    println!("{}", "-".repeat(40));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = registration_bot::logging::init("warn", None)?;

    let store_config = StoreConfig::from_env().context("Failed to read store configuration")?;
    let db = Arc::new(
        LibSqlBackend::new_local(&store_config.db_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    store_config.db_path.display()
                )
            })?,
    );

    match cli.command {
        Commands::Users => {
            let registrations = db.list_registrations().await?;
            if registrations.is_empty() {
                println!("📝 No registrations found");
                return Ok(());
            }
            println!("📊 Registrations: {}", registrations.len());
            println!("{}", "=".repeat(80));
            for stored in &registrations {
                print_registration(stored);
            }
        }
        Commands::Stats => {
            let stats = db.registration_stats().await?;
            println!("📊 Registration statistics");
            println!("{}", "=".repeat(50));
            println!("Total: {}", stats.total);
            println!("\n📦 By package:");
            println!("  • Business program: {}", stats.business);
            println!("  • Gala dinner: {}", stats.gala);
            println!("  • Full package: {}", stats.full);
            println!("\n🎓 Participated before: {}", stats.participated_before);
            println!("🏫 Graduates: {}", stats.graduates);
        }
        Commands::Purge { yes } => {
            if !yes {
                bail!("Refusing to delete all registrations without --yes");
            }
            let deleted = db.purge_registrations().await?;
            println!("✅ Deleted {deleted} registrations");
        }
        Commands::Resync => {
            let Some(sheets) = SheetsConfig::from_env() else {
                bail!("Spreadsheet mirror is not configured (set GOOGLE_SHEETS_SPREADSHEET_ID and GOOGLE_SHEETS_ACCESS_TOKEN)");
            };
            let mirror: Arc<dyn MirrorSheet> = Arc::new(GoogleSheetsMirror::new(sheets)?);
            let reconciler = Reconciler::new(db.clone(), Some(mirror), store_config.timeout);

            // Oldest first so appended rows keep registration order.
            let mut registrations = db.list_registrations().await?;
            registrations.reverse();

            let mut failed = 0usize;
            for stored in &registrations {
                match reconciler.mirror(stored).await {
                    MirrorOutcome::Failed(e) => {
                        failed += 1;
                        eprintln!("❌ {}: {e}", stored.record.telegram_id);
                    }
                    outcome => {
                        tracing::info!(telegram_id = %stored.record.telegram_id, ?outcome, "Mirrored");
                    }
                }
            }

            println!(
                "✅ Mirrored {} of {} registrations",
                registrations.len() - failed,
                registrations.len()
            );
            if failed > 0 {
                bail!("{failed} registrations could not be mirrored");
            }
        }
    }

    Ok(())
}
