//! Jobs command - Email queue worker and maintenance.
//!
//! Salary slip emails are queued by the API in the apalis PostgreSQL storage
//! and delivered here:
//!
//! ```bash
//! payroll-api jobs work    # deliver queued emails until Ctrl+C
//! payroll-api jobs list    # counts per status
//! payroll-api jobs clear   # drop failed jobs
//! ```

use apalis::prelude::*;
use apalis_sql::postgres::PostgresStorage;
use apalis_sql::sqlx::postgres::PgPoolOptions;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use crate::cli::args::{JobsAction, JobsArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;
use crate::jobs::{email_job_handler, EmailJob};

const WORKER_NAME: &str = "salary-slip-mailer";

/// Execute the jobs command
pub async fn execute(args: JobsArgs, config: Config) -> AppResult<()> {
    match args.action {
        JobsAction::Work => run_worker(&config).await,
        JobsAction::List => list_jobs(&config).await,
        JobsAction::Clear => clear_failed_jobs(&config).await,
    }
}

async fn run_worker(config: &Config) -> AppResult<()> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect job worker: {}", e)))?;

    PostgresStorage::setup(&pool)
        .await
        .map_err(|e| AppError::internal(format!("Failed to setup job storage: {}", e)))?;

    let storage: PostgresStorage<EmailJob> = PostgresStorage::new(pool);
    let worker = WorkerBuilder::new(WORKER_NAME)
        .backend(storage)
        .build_fn(email_job_handler);

    tracing::info!(worker = WORKER_NAME, "Email worker started, Ctrl+C to stop");

    tokio::select! {
        result = Monitor::new().register(worker).run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Email worker crashed");
                return Err(AppError::internal(format!("Worker failed: {}", e)));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping email worker");
        }
    }

    tracing::info!("Email worker stopped");
    Ok(())
}

/// `None` until a worker has created the apalis schema
async fn queue_connection(config: &Config) -> AppResult<Option<DatabaseConnection>> {
    let db = Database::connect_without_migrations(config).await?.get_connection();

    let row = db
        .query_one(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT EXISTS(SELECT 1 FROM information_schema.schemata \
             WHERE schema_name = 'apalis') AS present",
        ))
        .await?;
    let present = row
        .and_then(|r| r.try_get::<bool>("", "present").ok())
        .unwrap_or(false);

    Ok(present.then_some(db))
}

async fn list_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = queue_connection(config).await? else {
        println!("Email queue not initialized; run `payroll-api jobs work` once to create it.");
        return Ok(());
    };

    let rows = db
        .query_all(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT status::text AS status, COUNT(*)::bigint AS count \
             FROM apalis.jobs GROUP BY status ORDER BY status",
        ))
        .await?;

    println!("Email queue");
    if rows.is_empty() {
        println!("  (empty)");
    }
    for row in rows {
        let status: String = row.try_get("", "status")?;
        let count: i64 = row.try_get("", "count")?;
        println!("  {:<10} {}", status, count);
    }

    Ok(())
}

async fn clear_failed_jobs(config: &Config) -> AppResult<()> {
    let Some(db) = queue_connection(config).await? else {
        println!("Email queue not initialized, nothing to clear.");
        return Ok(());
    };

    let result = db
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "DELETE FROM apalis.jobs WHERE status = 'Failed'",
        ))
        .await?;

    tracing::info!(removed = result.rows_affected(), "Failed email jobs cleared");
    println!("Cleared {} failed job(s).", result.rows_affected());
    Ok(())
}
