//! Label repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use recap_core::{Error, Label, LabelRepository, LabeledMessage, Message, Result};

/// PostgreSQL implementation of LabelRepository.
pub struct PgLabelRepository {
    pool: Pool<Postgres>,
}

impl PgLabelRepository {
    /// Create a new PgLabelRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_label_row(row: &sqlx::postgres::PgRow) -> Label {
        Label {
            message_id: row.get("message_id"),
            sentiment_score: row.get("sentiment_score"),
            topic_id: row.get("topic_id"),
            topic_name: row.get("topic_name"),
            labeled_at: row.get("labeled_at"),
        }
    }
}

#[async_trait]
impl LabelRepository for PgLabelRepository {
    async fn upsert(&self, label: &Label) -> Result<()> {
        // A retried run overwrites with an equivalent value; the write is
        // idempotent by message id.
        sqlx::query(
            "INSERT INTO label (message_id, sentiment_score, topic_id, topic_name, labeled_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (message_id) DO UPDATE
             SET sentiment_score = EXCLUDED.sentiment_score,
                 topic_id = EXCLUDED.topic_id,
                 topic_name = EXCLUDED.topic_name,
                 labeled_at = EXCLUDED.labeled_at",
        )
        .bind(label.message_id)
        .bind(label.sentiment_score)
        .bind(label.topic_id)
        .bind(&label.topic_name)
        .bind(label.labeled_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn get(&self, message_id: i64) -> Result<Option<Label>> {
        let row = sqlx::query(
            "SELECT message_id, sentiment_score, topic_id, topic_name, labeled_at
             FROM label WHERE message_id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| Self::parse_label_row(&r)))
    }

    async fn list_labeled_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabeledMessage>> {
        let rows = sqlx::query(
            "SELECT m.id, m.chat_id, m.author_ref, m.content, m.sent_at, m.processed,
                    l.message_id, l.sentiment_score, l.topic_id, l.topic_name, l.labeled_at
             FROM message m
             JOIN label l ON l.message_id = m.id
             WHERE m.chat_id = $1 AND m.sent_at >= $2 AND m.sent_at < $3
             ORDER BY m.sent_at ASC",
        )
        .bind(chat_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| LabeledMessage {
                message: Message {
                    id: row.get("id"),
                    chat_id: row.get("chat_id"),
                    author_ref: row.get("author_ref"),
                    text: row.get("content"),
                    sent_at: row.get("sent_at"),
                    processed: row.get("processed"),
                },
                label: Self::parse_label_row(&row),
            })
            .collect())
    }
}
