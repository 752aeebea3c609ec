//! Core data models for recap.
//!
//! These types are shared across all recap crates and represent the
//! core domain entities of the enrichment pipeline.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// A stored chat message.
///
/// Messages are append-only; the only mutation after insert is the
/// `processed` flag, flipped by the classifier job once — and only after —
/// its label has been durably written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned monotonic id.
    pub id: i64,
    pub chat_id: i64,
    /// Opaque reference to the author on the chat platform.
    pub author_ref: String,
    pub text: String,
    /// When the message was sent in the chat (not when it was stored).
    pub sent_at: DateTime<Utc>,
    pub processed: bool,
}

/// Request to append a new message; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub chat_id: i64,
    pub author_ref: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

// =============================================================================
// LABEL TYPES
// =============================================================================

/// Per-message enrichment produced by the classifier job.
///
/// Immutable once written; a retried run overwrites with an equivalent
/// value (topic assignment is deterministic for the same text and model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub message_id: i64,
    /// Signed sentiment in [-1.0, 1.0].
    pub sentiment_score: f32,
    pub topic_id: i32,
    /// Resolved through the topic map at labeling time.
    pub topic_name: String,
    pub labeled_at: DateTime<Utc>,
}

/// Raw model output for one text, before topic resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment_score: f32,
    pub topic_id: i32,
}

/// A message joined with its label, as read back for summarization.
#[derive(Debug, Clone)]
pub struct LabeledMessage {
    pub message: Message,
    pub label: Label,
}

// =============================================================================
// THEME / DIGEST TYPES
// =============================================================================

/// One discussion theme within a digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Representative message ids, chronological: start, middle, end.
    pub message_ids: Vec<i64>,
    pub name: String,
    pub emoji: String,
    pub key_takeaways: Vec<String>,
}

/// Wire shape the generation backend must return for one theme.
///
/// The JSON Schema derived from this type is sent with every generation
/// request; responses that do not conform are rejected, not coerced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThemeDraft {
    /// IDs of the representative messages for this theme. There should be
    /// just 3-4 IDs indicating the start, middle, and end of the discussion.
    pub messages_id: Vec<i64>,
    /// The name of the theme, phrased as a short sentence.
    pub name: String,
    /// A single emoji that summarizes the theme.
    pub emoji: String,
    /// Key takeaways covering the important points and the opinions of the
    /// active participants. Between 2 and 4 entries.
    pub key_takeaways: Vec<String>,
}

/// Structured summary of one chat window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub id: Uuid,
    pub chat_id: i64,
    /// Inclusive window start.
    pub window_start: DateTime<Utc>,
    /// Exclusive window end.
    pub window_end: DateTime<Utc>,
    /// Themes in chronological order of their first representative message.
    pub themes: Vec<Theme>,
    /// Number of labeled messages the summarizer saw in the window.
    pub message_count: i64,
    pub generated_at: DateTime<Utc>,
}

// =============================================================================
// RUN LEASE TYPES
// =============================================================================

/// Time-bounded exclusivity token for one job run.
///
/// A run holds its lease for the duration of the batch and renews it via
/// heartbeat; an expired lease is takeable by the next scheduled run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLease {
    pub partition: String,
    /// Identifies this acquisition; heartbeat and release are holder-guarded.
    pub holder: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of one classifier batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed_count: usize,
    /// Messages that failed this run; left unprocessed, so the next
    /// scheduled run re-fetches them automatically.
    pub failed_ids: Vec<i64>,
}

impl BatchOutcome {
    /// True when no message in the batch failed.
    pub fn is_clean(&self) -> bool {
        self.failed_ids.is_empty()
    }
}
