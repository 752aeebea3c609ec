//! Digest repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use recap_core::{Digest, DigestRepository, Error, Result, Theme};

/// PostgreSQL implementation of DigestRepository.
pub struct PgDigestRepository {
    pool: Pool<Postgres>,
}

impl PgDigestRepository {
    /// Create a new PgDigestRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_digest_row(row: sqlx::postgres::PgRow) -> Result<Digest> {
        let themes_json: serde_json::Value = row.get("themes");
        let themes: Vec<Theme> = serde_json::from_value(themes_json)?;
        Ok(Digest {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            window_start: row.get("window_start"),
            window_end: row.get("window_end"),
            themes,
            message_count: row.get("message_count"),
            generated_at: row.get("generated_at"),
        })
    }
}

#[async_trait]
impl DigestRepository for PgDigestRepository {
    async fn upsert(&self, digest: &Digest) -> Result<Uuid> {
        if digest.window_start >= digest.window_end {
            return Err(Error::InvalidInput(format!(
                "Digest window is empty or inverted: {} .. {}",
                digest.window_start, digest.window_end
            )));
        }

        let themes_json = serde_json::to_value(&digest.themes)?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Windows for one chat must not overlap. An exact window match is
        // the upsert target; a partial overlap is a caller bug.
        let overlapping: Option<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT window_start, window_end FROM digest
             WHERE chat_id = $1
               AND window_start < $3 AND window_end > $2
               AND NOT (window_start = $2 AND window_end = $3)
             LIMIT 1",
        )
        .bind(digest.chat_id)
        .bind(digest.window_start)
        .bind(digest.window_end)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if let Some((start, end)) = overlapping {
            return Err(Error::InvalidInput(format!(
                "Digest window {} .. {} overlaps existing window {} .. {} for chat {}",
                digest.window_start, digest.window_end, start, end, digest.chat_id
            )));
        }

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO digest (id, chat_id, window_start, window_end, themes, message_count, generated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT ON CONSTRAINT digest_window_key DO UPDATE
             SET themes = EXCLUDED.themes,
                 message_count = EXCLUDED.message_count,
                 generated_at = EXCLUDED.generated_at
             RETURNING id",
        )
        .bind(digest.id)
        .bind(digest.chat_id)
        .bind(digest.window_start)
        .bind(digest.window_end)
        .bind(&themes_json)
        .bind(digest.message_count)
        .bind(digest.generated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "digests",
            op = "upsert",
            digest_id = %id,
            chat_id = digest.chat_id,
            theme_count = digest.themes.len(),
            "Digest stored"
        );
        Ok(id)
    }

    async fn get(
        &self,
        chat_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Option<Digest>> {
        let row = sqlx::query(
            "SELECT id, chat_id, window_start, window_end, themes, message_count, generated_at
             FROM digest
             WHERE chat_id = $1 AND window_start = $2 AND window_end = $3",
        )
        .bind(chat_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_digest_row).transpose()
    }

    async fn get_latest(&self, chat_id: i64) -> Result<Option<Digest>> {
        let row = sqlx::query(
            "SELECT id, chat_id, window_start, window_end, themes, message_count, generated_at
             FROM digest
             WHERE chat_id = $1
             ORDER BY generated_at DESC
             LIMIT 1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_digest_row).transpose()
    }

    async fn list_for_chat(&self, chat_id: i64, limit: i64) -> Result<Vec<Digest>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, window_start, window_end, themes, message_count, generated_at
             FROM digest
             WHERE chat_id = $1
             ORDER BY generated_at DESC
             LIMIT $2",
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_digest_row).collect()
    }
}
