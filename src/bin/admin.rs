//! CLI administration tool for clickpath.
//!
//! Provides commands for viewing statistics, disabling links and managing
//! access-log cursors without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Fleet statistics
//! cargo run --bin admin -- stats
//!
//! # Disable a link by code
//! cargo run --bin admin -- link disable Promo2026
//!
//! # Show access-log read positions
//! cargo run --bin admin -- cursor list
//!
//! # Re-read a source from the start (ingest keys prevent duplicates)
//! cargo run --bin admin -- cursor reset edge
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string

use clickpath::application::services::{LinkService, StatsService};
use clickpath::domain::audit::TracingAuditSink;
use clickpath::domain::repositories::{CursorRepository, EventCounts};
use clickpath::infrastructure::persistence::{
    PgCursorRepository, PgLinkRepository, PgStatsRepository,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Actor recorded in audit entries for CLI operations.
const CLI_ACTOR: &str = "admin-cli";

/// CLI tool for managing clickpath.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Show statistics
    Stats,

    /// Manage links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Manage access-log cursors
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Soft-disable a link; it then answers 410 Gone
    Disable {
        code: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CursorAction {
    /// List stored read positions
    List,

    /// Forget the read position of a source
    Reset {
        source: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn,audit=info"))
        .init();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    let pool = Arc::new(pool);

    match cli.command {
        Commands::Stats => handle_stats(pool).await?,
        Commands::Link { action } => handle_link_action(action, pool).await?,
        Commands::Cursor { action } => handle_cursor_action(action, pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Displays fleet statistics.
///
/// # Output Format
///
/// ```text
/// Statistics
///
///   Links: 42
///
///   Window      Total  Clicks  QR scans  Ad views  Ad clicks
///   today           5       4         1         0          0
///   ...
/// ```
async fn handle_stats(pool: Arc<PgPool>) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let service = StatsService::new(
        Arc::new(PgLinkRepository::new(pool.clone())),
        Arc::new(PgStatsRepository::new(pool)),
    );

    let summary = service
        .summary()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load statistics: {e}"))?;

    println!(
        "  Links: {}",
        summary.links_total.to_string().bright_green().bold()
    );
    println!();
    println!(
        "  {:<10} {:>8} {:>8} {:>9} {:>9} {:>10}",
        "Window".bright_white().bold(),
        "Total".bright_white().bold(),
        "Clicks".bright_white().bold(),
        "QR scans".bright_white().bold(),
        "Ad views".bright_white().bold(),
        "Ad clicks".bright_white().bold()
    );
    println!("  {}", "─".repeat(60).bright_black());

    let window = &summary.window;
    for (label, counts) in [
        ("today", &window.today),
        ("7 days", &window.week),
        ("30 days", &window.month),
        ("all time", &window.all_time),
    ] {
        print_counts_row(label, counts);
    }
    println!();

    Ok(())
}

fn print_counts_row(label: &str, counts: &EventCounts) {
    println!(
        "  {:<10} {:>8} {:>8} {:>9} {:>9} {:>10}",
        label.cyan(),
        counts.total().to_string().bright_green(),
        counts.link_click,
        counts.qr_scan,
        counts.ad_view,
        counts.ad_click
    );
}

async fn handle_link_action(action: LinkAction, pool: Arc<PgPool>) -> Result<()> {
    match action {
        LinkAction::Disable { code, yes } => {
            println!("{}", "🔒 Disable Link".bright_blue().bold());
            println!();
            println!("  Code: {}", code.cyan());
            println!();

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Disable this link?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "❌ Cancelled".red());
                    return Ok(());
                }
            }

            let service = LinkService::new(
                Arc::new(PgLinkRepository::new(pool.clone())),
                Arc::new(PgStatsRepository::new(pool)),
                Arc::new(TracingAuditSink),
                clickpath::utils::code_generator::DEFAULT_CODE_LENGTH,
            );

            let link = service
                .disable_by_code(CLI_ACTOR, &code)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to disable link: {e}"))?;

            println!(
                "{} {} → {}",
                "✅ Disabled".green().bold(),
                link.code.cyan(),
                link.target_url.bright_black()
            );
        }
    }

    Ok(())
}

async fn handle_cursor_action(action: CursorAction, pool: Arc<PgPool>) -> Result<()> {
    let repo = PgCursorRepository::new(pool);

    match action {
        CursorAction::List => {
            println!("{}", "📋 Access-log Cursors".bright_blue().bold());
            println!();

            let cursors = repo
                .list()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list cursors: {e}"))?;

            if cursors.is_empty() {
                println!("{}", "  No cursors stored".yellow());
                return Ok(());
            }

            println!(
                "  {:<16} {:<28} {:>14} {:<20}",
                "Source".bright_white().bold(),
                "File".bright_white().bold(),
                "Offset".bright_white().bold(),
                "Updated".bright_white().bold()
            );
            println!("  {}", "─".repeat(80).bright_black());

            for cursor in &cursors {
                println!(
                    "  {:<16} {:<28} {:>14} {}",
                    cursor.source.cyan(),
                    cursor.file_id,
                    cursor.offset,
                    cursor
                        .updated_at
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .bright_black()
                );
            }
            println!();
        }
        CursorAction::Reset { source, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Reset cursor of '{source}'? Its log is re-read from the start on next run"
                    ))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "❌ Cancelled".red());
                    return Ok(());
                }
            }

            let removed = repo
                .reset(&source)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to reset cursor: {e}"))?;

            if removed {
                println!("{}", "✅ Cursor reset".green().bold());
            } else {
                println!("{}", format!("⚠️  No cursor stored for '{source}'").yellow());
            }
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
                .fetch_one(pool)
                .await
                .unwrap_or(0);

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Migrations: {}", applied.to_string().bright_white());
            println!();
        }
    }

    Ok(())
}
