//! Outbound mail: enqueue on the request path, deliver in the job worker.

use apalis::prelude::Storage;
use apalis_sql::postgres::PostgresStorage;
use apalis_sql::sqlx::postgres::PgPoolOptions;
use async_trait::async_trait;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::jobs::EmailJob;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fire-and-forget mail sink.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn enqueue(&self, job: EmailJob) -> AppResult<()>;
}

/// apalis PostgreSQL queue drained by `jobs work`
#[derive(Clone)]
pub struct EmailQueue {
    storage: PostgresStorage<EmailJob>,
}

impl EmailQueue {
    /// Connect and make sure the apalis tables exist.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&config.database_url)
            .await
            .map_err(|e| AppError::internal(format!("Failed to connect job queue: {}", e)))?;

        PostgresStorage::setup(&pool)
            .await
            .map_err(|e| AppError::internal(format!("Failed to setup job storage: {}", e)))?;

        Ok(Self {
            storage: PostgresStorage::new(pool),
        })
    }
}

#[async_trait]
impl Mailer for EmailQueue {
    async fn enqueue(&self, job: EmailJob) -> AppResult<()> {
        let to = job.to.clone();
        let mut storage = self.storage.clone();
        storage
            .push(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to queue email: {}", e)))?;

        tracing::info!(to = %to, "Email queued");
        Ok(())
    }
}

/// Mailer used when the queue is unavailable: logs and drops the message.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn enqueue(&self, job: EmailJob) -> AppResult<()> {
        tracing::warn!(
            to = %job.to,
            subject = %job.subject,
            "Email queue unavailable, message dropped"
        );
        Ok(())
    }
}
