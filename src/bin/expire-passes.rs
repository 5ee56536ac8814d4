/// Expire subscriptions and certificates whose expiry date has passed.
/// The API runs the same sweep hourly; this is for cron or manual runs.
///
/// Usage: expire-passes [--dry-run]
///   --dry-run : only count what would expire
use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use stable_crm_api::services::expiry;

#[derive(Parser)]
#[command(name = "expire-passes", about = "Mark overdue subscriptions and certificates as expired")]
struct Args {
    /// Count overdue passes without changing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let report = expiry::sweep(&pool, args.dry_run).await?;
    if args.dry_run {
        tracing::info!(
            subscriptions = report.subscriptions,
            certificates = report.certificates,
            "Dry run: passes that would expire"
        );
    } else {
        tracing::info!(
            subscriptions = report.subscriptions,
            certificates = report.certificates,
            "Passes expired"
        );
    }
    Ok(())
}
