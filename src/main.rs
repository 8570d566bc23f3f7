use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod db;
mod engine;
mod models;
mod report;

use models::SnapshotRecord;

#[derive(Parser)]
#[command(name = "objective-progress")]
#[command(about = "Strategic objective progress tracker for restaurant operations consulting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import objectives and snapshots from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record one KPI snapshot for an objective
    Record {
        #[arg(long)]
        objective: Uuid,
        #[arg(long)]
        value: f64,
        /// Snapshot date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Grade one objective's progress
    Progress {
        #[arg(long)]
        objective: Uuid,
        /// Live KPI reading; falls back to the latest snapshot
        #[arg(long)]
        value: Option<f64>,
        /// Grade as of this date instead of today
        #[arg(long)]
        on: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown portfolio report
    Report {
        #[arg(long)]
        restaurant: Option<String>,
        /// Grade as of this date instead of today
        #[arg(long)]
        on: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Live reading wins; otherwise the most recent snapshot stands in for it.
fn resolve_current_value(live: Option<f64>, snapshots: &[SnapshotRecord]) -> Option<f64> {
    live.or_else(|| {
        snapshots
            .iter()
            .max_by_key(|s| s.snapshot_date)
            .map(|s| s.kpi_value)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} snapshots from {}.", csv.display());
        }
        Commands::Record {
            objective,
            value,
            date,
        } => {
            let snapshot_date = date.unwrap_or_else(|| chrono::Utc::now().date_naive());
            db::insert_snapshot(&pool, objective, value, snapshot_date).await?;
            println!("Snapshot recorded for {objective} on {snapshot_date}.");
        }
        Commands::Progress {
            objective,
            value,
            on,
            json,
        } => {
            let today = on.unwrap_or_else(|| chrono::Utc::now().date_naive());
            let record = db::fetch_objective(&pool, objective).await?;
            let snapshots = db::fetch_snapshots(&pool, objective).await?;
            let current = resolve_current_value(value, &snapshots);
            let data = engine::compute_progress(&record, current, &snapshots, today);

            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else if data.is_loading {
                println!(
                    "{} ({}): no KPI reading yet; {} days elapsed, {} remaining.",
                    record.name, record.restaurant, data.days_elapsed, data.days_remaining
                );
            } else {
                println!(
                    "{} ({}, {}) is {}:",
                    record.name,
                    record.restaurant,
                    record.status.as_str(),
                    data.health_status.as_str()
                );
                match (data.progress_percentage, data.expected_progress) {
                    (Some(actual), Some(expected)) => println!(
                        "- progress {actual:.1}% against {expected:.1}% expected at day {} of {}",
                        data.days_elapsed, data.total_days
                    ),
                    _ => println!("- progress not gradable (objective has no usable target)"),
                }
                match data.velocity {
                    Some(v) => println!(
                        "- velocity {v:.2} {}/day, trend {}",
                        record.kpi_unit,
                        data.trend.as_str()
                    ),
                    None => println!("- not enough snapshots for a velocity"),
                }
                match data.projected_value {
                    Some(p) => println!(
                        "- projected {p:.2} {} at the deadline, {}",
                        record.kpi_unit,
                        if data.will_complete {
                            "on course to complete"
                        } else {
                            "short of the target"
                        }
                    ),
                    None => println!("- no projection (no velocity or no days remaining)"),
                }
            }
        }
        Commands::Report {
            restaurant,
            on,
            out,
        } => {
            let today = on.unwrap_or_else(|| chrono::Utc::now().date_naive());
            let objectives = db::fetch_objectives(&pool, restaurant.as_deref()).await?;
            let mut graded = Vec::new();
            for record in objectives {
                let snapshots = db::fetch_snapshots(&pool, record.id).await?;
                let current = resolve_current_value(None, &snapshots);
                let data = engine::compute_progress(&record, current, &snapshots, today);
                graded.push((record, data));
            }
            let report = report::build_report(restaurant.as_deref(), today, &graded);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
