//! Scheduled Jobs
//!
//! Background maintenance: expired sessions and stale rate-limit windows
//! are deleted on a schedule so neither table grows without bound.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

// =========================================================================
// Expired session cleanup
// =========================================================================

/// Delete sessions past their expiry.
pub async fn cleanup_expired_sessions(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
        .execute(pool)
        .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(rows_deleted, "Cleaned up expired sessions");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Rate limit bucket cleanup
// =========================================================================

/// Remove rate-limit windows older than 2 minutes. A window only matters
/// while it is the current minute.
pub async fn cleanup_rate_limit_buckets(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        DELETE FROM rate_limit_buckets
        WHERE window_start < NOW() - INTERVAL '2 minutes'
        "#,
    )
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(rows_deleted, "Cleaned up expired rate limit buckets");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for session cleanup (default: 10 minutes)
    pub session_cleanup_interval: Duration,
    /// Interval for rate limit cleanup (default: 1 minute)
    pub rate_limit_cleanup_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            session_cleanup_interval: Duration::from_secs(600),
            rate_limit_cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background.
    /// Returns a handle that can be used to abort the scheduler.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut session_interval = interval(self.config.session_cleanup_interval);
        let mut rate_limit_interval = interval(self.config.rate_limit_cleanup_interval);

        loop {
            tokio::select! {
                _ = session_interval.tick() => {
                    if let Err(e) = cleanup_expired_sessions(&self.pool).await {
                        tracing::error!(error = %e, "Session cleanup failed");
                    }
                }
                _ = rate_limit_interval.tick() => {
                    if let Err(e) = cleanup_rate_limit_buckets(&self.pool).await {
                        tracing::error!(error = %e, "Rate limit cleanup failed");
                    }
                }
            }
        }
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
