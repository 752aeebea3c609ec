//! Message repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use recap_core::{Error, Message, MessageRepository, NewMessage, Result};

/// PostgreSQL implementation of MessageRepository.
pub struct PgMessageRepository {
    pool: Pool<Postgres>,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a message row into a Message struct.
    fn parse_message_row(row: sqlx::postgres::PgRow) -> Message {
        Message {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            author_ref: row.get("author_ref"),
            text: row.get("content"),
            sent_at: row.get("sent_at"),
            processed: row.get("processed"),
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, req: NewMessage) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO message (chat_id, author_ref, content, sent_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(req.chat_id)
        .bind(&req.author_ref)
        .bind(&req.text)
        .bind(req.sent_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, chat_id, author_ref, content, sent_at, processed
             FROM message WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_message_row))
    }

    async fn fetch_unprocessed(&self, limit: i64) -> Result<Vec<Message>> {
        // Oldest first to bound staleness. Bot commands and empty texts are
        // never classified, so they are filtered at fetch time rather than
        // marked processed.
        let rows = sqlx::query(
            "SELECT id, chat_id, author_ref, content, sent_at, processed
             FROM message
             WHERE NOT processed
               AND content <> ''
               AND content NOT LIKE '/%'
             ORDER BY sent_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_message_row).collect())
    }

    async fn mark_processed(&self, id: i64) -> Result<()> {
        // The flag may only follow the label: the EXISTS guard makes the
        // write-label-then-mark ordering a database invariant, so a crash
        // between the two writes leaves the message re-fetchable.
        let result = sqlx::query(
            "UPDATE message
             SET processed = TRUE
             WHERE id = $1
               AND EXISTS (SELECT 1 FROM label WHERE message_id = $1)",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::MessageNotFound(id));
        }
        Ok(())
    }

    async fn list_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, author_ref, content, sent_at, processed
             FROM message
             WHERE chat_id = $1 AND sent_at >= $2 AND sent_at < $3
             ORDER BY sent_at ASC",
        )
        .bind(chat_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_message_row).collect())
    }

    async fn unprocessed_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message
             WHERE NOT processed AND content <> '' AND content NOT LIKE '/%'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }
}
