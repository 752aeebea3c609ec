//! Core traits for recap abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// MESSAGE REPOSITORY TRAITS
// =============================================================================

/// Repository for the append-only message store.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a new message; the store assigns and returns the id.
    async fn append(&self, req: NewMessage) -> Result<i64>;

    /// Fetch a message by id.
    async fn get(&self, id: i64) -> Result<Option<Message>>;

    /// Fetch up to `limit` unprocessed messages, oldest first.
    ///
    /// Command messages (leading `/`) and empty texts are skipped — they
    /// are never classified.
    async fn fetch_unprocessed(&self, limit: i64) -> Result<Vec<Message>>;

    /// Flip the processed flag for a message.
    ///
    /// Refuses (returns `MessageNotFound`) unless a label row already
    /// exists for the message: the flag must never lead the label.
    async fn mark_processed(&self, id: i64) -> Result<()>;

    /// List a chat's messages in `[start, end)`, ordered by sent time.
    async fn list_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>>;

    /// Count of messages still awaiting classification.
    async fn unprocessed_count(&self) -> Result<i64>;
}

// =============================================================================
// LABEL REPOSITORY TRAITS
// =============================================================================

/// Repository for per-message labels.
#[async_trait]
pub trait LabelRepository: Send + Sync {
    /// Write a label, replacing any existing label for the same message.
    async fn upsert(&self, label: &Label) -> Result<()>;

    /// Fetch the label for a message, if present.
    async fn get(&self, message_id: i64) -> Result<Option<Label>>;

    /// List a chat's labeled messages in `[start, end)`, ordered by sent
    /// time. Unlabeled messages in the window are simply absent.
    async fn list_labeled_window(
        &self,
        chat_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LabeledMessage>>;
}

// =============================================================================
// DIGEST REPOSITORY TRAITS
// =============================================================================

/// Repository for generated digests.
#[async_trait]
pub trait DigestRepository: Send + Sync {
    /// Insert or replace the digest for its `(chat_id, window)` key.
    ///
    /// A window that overlaps an existing *different* window for the same
    /// chat is rejected with `InvalidInput`.
    async fn upsert(&self, digest: &Digest) -> Result<uuid::Uuid>;

    /// Fetch the digest for an exact window, if present.
    async fn get(
        &self,
        chat_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Option<Digest>>;

    /// Most recently generated digest for a chat.
    async fn get_latest(&self, chat_id: i64) -> Result<Option<Digest>>;

    /// Digest history for a chat, newest first.
    async fn list_for_chat(&self, chat_id: i64, limit: i64) -> Result<Vec<Digest>>;
}

// =============================================================================
// RUN LOCK TRAITS
// =============================================================================

/// Repository for run leases.
///
/// At most one live lease exists per partition; acquisition takes over an
/// expired lease atomically, so a crashed run blocks its successor for at
/// most one TTL.
#[async_trait]
pub trait RunLockRepository: Send + Sync {
    /// Acquire the lease for a partition.
    ///
    /// Fails with `RunLockContention` if a live lease is held elsewhere.
    async fn acquire(&self, partition: &str, ttl: Duration) -> Result<RunLease>;

    /// Extend the lease expiry. No-op (error) if the lease is no longer
    /// held by this holder.
    async fn heartbeat(&self, lease: &RunLease, ttl: Duration) -> Result<()>;

    /// Release the lease. Only the holder's row is deleted.
    async fn release(&self, lease: &RunLease) -> Result<()>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for sentiment/topic classification.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Classify a batch of texts; one result per input, same order.
    async fn classify(&self, texts: &[String]) -> Result<Vec<Classification>>;

    /// Load the model onto the accelerator for this run.
    async fn load(&self) -> Result<()>;

    /// Release the model. Called on every run exit path.
    async fn release(&self) -> Result<()>;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate output constrained to the given JSON Schema.
    ///
    /// The returned string is the raw model output; callers validate it
    /// against the schema's Rust shape before trusting it.
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        schema: &JsonValue,
    ) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
