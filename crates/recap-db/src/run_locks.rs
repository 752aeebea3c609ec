//! Run-lock (lease) repository implementation.
//!
//! At most one live lease exists per partition. Acquisition is a single
//! atomic conditional upsert — take the row if it is absent or its lease
//! has expired — which avoids the check-then-insert race the same way the
//! job-queue deduplication insert does.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::{info, warn};
use uuid::Uuid;

use recap_core::{Error, Result, RunLease, RunLockRepository};

/// PostgreSQL implementation of RunLockRepository.
pub struct PgRunLockRepository {
    pool: Pool<Postgres>,
}

impl PgRunLockRepository {
    /// Create a new PgRunLockRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLockRepository for PgRunLockRepository {
    async fn acquire(&self, partition: &str, ttl: Duration) -> Result<RunLease> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).map_err(|e| {
            Error::InvalidInput(format!("Lease TTL out of range: {e}"))
        })?;
        let holder = Uuid::now_v7();

        // The WHERE clause on the conflict arm means a live lease is left
        // untouched and the insert returns no row.
        let row = sqlx::query(
            "INSERT INTO run_lock (partition, holder, acquired_at, heartbeat_at, expires_at)
             VALUES ($1, $2, $3, $3, $4)
             ON CONFLICT (partition) DO UPDATE
             SET holder = EXCLUDED.holder,
                 acquired_at = EXCLUDED.acquired_at,
                 heartbeat_at = EXCLUDED.heartbeat_at,
                 expires_at = EXCLUDED.expires_at
             WHERE run_lock.expires_at <= $3
             RETURNING partition, holder, acquired_at, heartbeat_at, expires_at",
        )
        .bind(partition)
        .bind(holder)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => {
                info!(
                    subsystem = "db",
                    component = "run_lock",
                    op = "acquire",
                    partition = partition,
                    run_id = %holder,
                    "Run lease acquired"
                );
                Ok(RunLease {
                    partition: row.get("partition"),
                    holder: row.get("holder"),
                    acquired_at: row.get("acquired_at"),
                    heartbeat_at: row.get("heartbeat_at"),
                    expires_at: row.get("expires_at"),
                })
            }
            None => Err(Error::RunLockContention(partition.to_string())),
        }
    }

    async fn heartbeat(&self, lease: &RunLease, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).map_err(|e| {
            Error::InvalidInput(format!("Lease TTL out of range: {e}"))
        })?;

        let result = sqlx::query(
            "UPDATE run_lock
             SET heartbeat_at = $1, expires_at = $2
             WHERE partition = $3 AND holder = $4",
        )
        .bind(now)
        .bind(expires_at)
        .bind(&lease.partition)
        .bind(lease.holder)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            // The lease expired and was taken over; this run has lost
            // exclusivity and must not extend the new holder's lease.
            warn!(
                subsystem = "db",
                component = "run_lock",
                op = "heartbeat",
                partition = %lease.partition,
                run_id = %lease.holder,
                "Heartbeat on a lease no longer held"
            );
            return Err(Error::RunLockContention(lease.partition.clone()));
        }
        Ok(())
    }

    async fn release(&self, lease: &RunLease) -> Result<()> {
        sqlx::query("DELETE FROM run_lock WHERE partition = $1 AND holder = $2")
            .bind(&lease.partition)
            .bind(lease.holder)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "run_lock",
            op = "release",
            partition = %lease.partition,
            run_id = %lease.holder,
            "Run lease released"
        );
        Ok(())
    }
}
