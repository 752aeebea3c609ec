//! Shared in-memory fakes and builders for the job integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use recap_core::{
    Digest, DigestRepository, Error, Label, LabelRepository, LabeledMessage, Message,
    MessageRepository, NewMessage, Result, RunLease, RunLockRepository,
};

/// Fixed origin for test timelines.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
}

/// In-memory implementation of all four store traits.
#[derive(Default)]
pub struct MemoryStore {
    messages: Mutex<Vec<Message>>,
    labels: Mutex<HashMap<i64, Label>>,
    digests: Mutex<Vec<Digest>>,
    leases: Mutex<HashMap<String, RunLease>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn label_count(&self) -> usize {
        self.labels.lock().unwrap().len()
    }

    pub fn digest_count(&self) -> usize {
        self.digests.lock().unwrap().len()
    }

    pub fn message(&self, id: i64) -> Option<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn append(&self, req: NewMessage) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.messages.lock().unwrap().push(Message {
            id,
            chat_id: req.chat_id,
            author_ref: req.author_ref,
            text: req.text,
            sent_at: req.sent_at,
            processed: false,
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<Message>> {
        Ok(self.message(id))
    }

    async fn fetch_unprocessed(&self, limit: i64) -> Result<Vec<Message>> {
        let mut batch: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !m.processed && !m.text.is_empty() && !m.text.starts_with('/'))
            .cloned()
            .collect();
        batch.sort_by_key(|m| m.sent_at);
        batch.truncate(limit.max(0) as usize);
        Ok(batch)
    }

    async fn mark_processed(&self, id: i64) -> Result<()> {
        if !self.labels.lock().unwrap().contains_key(&id) {
            return Err(Error::MessageNotFound(id));
        }
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.processed = true;
                Ok(())
            }
            None => Err(Error::MessageNotFound(id)),
        }
    }

    async fn list_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        let mut window: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id && m.sent_at >= start && m.sent_at < end)
            .cloned()
            .collect();
        window.sort_by_key(|m| m.sent_at);
        Ok(window)
    }

    async fn unprocessed_count(&self) -> Result<i64> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !m.processed && !m.text.is_empty() && !m.text.starts_with('/'))
            .count() as i64)
    }
}

#[async_trait]
impl LabelRepository for MemoryStore {
    async fn upsert(&self, label: &Label) -> Result<()> {
        self.labels
            .lock()
            .unwrap()
            .insert(label.message_id, label.clone());
        Ok(())
    }

    async fn get(&self, message_id: i64) -> Result<Option<Label>> {
        Ok(self.labels.lock().unwrap().get(&message_id).cloned())
    }

    async fn list_labeled_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabeledMessage>> {
        let labels = self.labels.lock().unwrap();
        let mut window: Vec<LabeledMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id && m.sent_at >= start && m.sent_at < end)
            .filter_map(|m| {
                labels.get(&m.id).map(|label| LabeledMessage {
                    message: m.clone(),
                    label: label.clone(),
                })
            })
            .collect();
        window.sort_by_key(|lm| lm.message.sent_at);
        Ok(window)
    }
}

#[async_trait]
impl DigestRepository for MemoryStore {
    async fn upsert(&self, digest: &Digest) -> Result<Uuid> {
        let mut digests = self.digests.lock().unwrap();

        let overlapping = digests.iter().any(|d| {
            d.chat_id == digest.chat_id
                && d.window_start < digest.window_end
                && d.window_end > digest.window_start
                && !(d.window_start == digest.window_start && d.window_end == digest.window_end)
        });
        if overlapping {
            return Err(Error::InvalidInput(format!(
                "Digest window {} .. {} overlaps an existing window for chat {}",
                digest.window_start, digest.window_end, digest.chat_id
            )));
        }

        if let Some(existing) = digests.iter_mut().find(|d| {
            d.chat_id == digest.chat_id
                && d.window_start == digest.window_start
                && d.window_end == digest.window_end
        }) {
            existing.themes = digest.themes.clone();
            existing.message_count = digest.message_count;
            existing.generated_at = digest.generated_at;
            return Ok(existing.id);
        }

        digests.push(digest.clone());
        Ok(digest.id)
    }

    async fn get(
        &self,
        chat_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Option<Digest>> {
        Ok(self
            .digests
            .lock()
            .unwrap()
            .iter()
            .find(|d| {
                d.chat_id == chat_id
                    && d.window_start == window_start
                    && d.window_end == window_end
            })
            .cloned())
    }

    async fn get_latest(&self, chat_id: i64) -> Result<Option<Digest>> {
        Ok(self
            .digests
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.chat_id == chat_id)
            .max_by_key(|d| d.generated_at)
            .cloned())
    }

    async fn list_for_chat(&self, chat_id: i64, limit: i64) -> Result<Vec<Digest>> {
        let mut history: Vec<Digest> = self
            .digests
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.chat_id == chat_id)
            .cloned()
            .collect();
        history.sort_by_key(|d| std::cmp::Reverse(d.generated_at));
        history.truncate(limit.max(0) as usize);
        Ok(history)
    }
}

#[async_trait]
impl RunLockRepository for MemoryStore {
    async fn acquire(&self, partition: &str, ttl: Duration) -> Result<RunLease> {
        let now = Utc::now();
        let mut leases = self.leases.lock().unwrap();

        if let Some(existing) = leases.get(partition) {
            if existing.expires_at > now {
                return Err(Error::RunLockContention(partition.to_string()));
            }
        }

        let lease = RunLease {
            partition: partition.to_string(),
            holder: Uuid::now_v7(),
            acquired_at: now,
            heartbeat_at: now,
            expires_at: now
                + chrono::Duration::from_std(ttl)
                    .map_err(|e| Error::InvalidInput(e.to_string()))?,
        };
        leases.insert(partition.to_string(), lease.clone());
        Ok(lease)
    }

    async fn heartbeat(&self, lease: &RunLease, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let mut leases = self.leases.lock().unwrap();
        match leases.get_mut(&lease.partition) {
            Some(held) if held.holder == lease.holder => {
                held.heartbeat_at = now;
                held.expires_at = now
                    + chrono::Duration::from_std(ttl)
                        .map_err(|e| Error::InvalidInput(e.to_string()))?;
                Ok(())
            }
            _ => Err(Error::RunLockContention(lease.partition.clone())),
        }
    }

    async fn release(&self, lease: &RunLease) -> Result<()> {
        let mut leases = self.leases.lock().unwrap();
        if leases
            .get(&lease.partition)
            .map(|held| held.holder == lease.holder)
            .unwrap_or(false)
        {
            leases.remove(&lease.partition);
        }
        Ok(())
    }
}

/// Message-store wrapper that fails `mark_processed` once per configured id,
/// simulating a crash in the window between the label write and the flag
/// flip.
pub struct FlakyMarkStore {
    inner: Arc<MemoryStore>,
    fail_marks: Mutex<HashSet<i64>>,
}

impl FlakyMarkStore {
    pub fn new(inner: Arc<MemoryStore>, fail_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inner,
            fail_marks: Mutex::new(fail_ids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl MessageRepository for FlakyMarkStore {
    async fn append(&self, req: NewMessage) -> Result<i64> {
        self.inner.append(req).await
    }

    async fn get(&self, id: i64) -> Result<Option<Message>> {
        MessageRepository::get(&*self.inner, id).await
    }

    async fn fetch_unprocessed(&self, limit: i64) -> Result<Vec<Message>> {
        self.inner.fetch_unprocessed(limit).await
    }

    async fn mark_processed(&self, id: i64) -> Result<()> {
        if self.fail_marks.lock().unwrap().remove(&id) {
            return Err(Error::Internal(
                "injected crash before the flag flip".to_string(),
            ));
        }
        self.inner.mark_processed(id).await
    }

    async fn list_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        self.inner.list_window(chat_id, start, end).await
    }

    async fn unprocessed_count(&self) -> Result<i64> {
        self.inner.unprocessed_count().await
    }
}

/// Label-store wrapper that reports the store as unreachable.
pub struct UnreachableLabelStore {
    inner: Arc<MemoryStore>,
    broken: Mutex<bool>,
}

impl UnreachableLabelStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            broken: Mutex::new(true),
        }
    }
}

#[async_trait]
impl LabelRepository for UnreachableLabelStore {
    async fn upsert(&self, label: &Label) -> Result<()> {
        if *self.broken.lock().unwrap() {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }
        LabelRepository::upsert(&*self.inner, label).await
    }

    async fn get(&self, message_id: i64) -> Result<Option<Label>> {
        LabelRepository::get(&*self.inner, message_id).await
    }

    async fn list_labeled_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabeledMessage>> {
        self.inner.list_labeled_window(chat_id, start, end).await
    }
}

/// Append a plain message `minute` minutes after [`base_time`].
pub async fn seed_message(store: &MemoryStore, chat_id: i64, text: &str, minute: i64) -> i64 {
    store
        .append(NewMessage {
            chat_id,
            author_ref: format!("user-{}", minute % 3),
            text: text.to_string(),
            sent_at: base_time() + chrono::Duration::minutes(minute),
        })
        .await
        .expect("seed message")
}

/// Append a message and label it directly (summarizer-path seeding).
pub async fn seed_labeled(
    store: &MemoryStore,
    chat_id: i64,
    topic_id: i32,
    text: &str,
    minute: i64,
) -> i64 {
    let id = seed_message(store, chat_id, text, minute).await;
    LabelRepository::upsert(
        store,
        &Label {
            message_id: id,
            sentiment_score: 0.2,
            topic_id,
            topic_name: format!("topic-{topic_id}"),
            labeled_at: base_time() + chrono::Duration::minutes(minute),
        },
    )
    .await
    .expect("seed label");
    id
}

/// A conforming generation response echoing the given representative ids.
pub fn valid_draft_json(ids: &[i64], name: &str) -> String {
    serde_json::json!({
        "messages_id": ids,
        "name": name,
        "emoji": "💬",
        "key_takeaways": ["First takeaway", "Second takeaway"],
    })
    .to_string()
}

/// A response missing the emoji field — shape-invalid, must be rejected.
pub fn draft_missing_emoji(ids: &[i64]) -> String {
    serde_json::json!({
        "messages_id": ids,
        "name": "No emoji here",
        "key_takeaways": ["First takeaway", "Second takeaway"],
    })
    .to_string()
}
