//! Centralized default constants for the recap pipeline.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates and the scheduler-facing binaries should reference
//! these constants instead of defining their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// CLASSIFIER JOB
// =============================================================================

/// Maximum messages fetched per batch run. Bounds a single run's wall-clock
/// time so it stays under the scheduling interval.
pub const CLASSIFY_BATCH_LIMIT: i64 = 100;

/// Bounded timeout for classifying one batch request (seconds).
pub const CLASSIFY_TIMEOUT_SECS: u64 = 30;

/// Default partition key for the run lock when no chat is targeted.
pub const RUN_PARTITION: &str = "classifier";

/// Valid sentiment score range (inclusive).
pub const SENTIMENT_MIN: f32 = -1.0;
pub const SENTIMENT_MAX: f32 = 1.0;

// =============================================================================
// RUN LEASE
// =============================================================================

/// Lease time-to-live in seconds. A crashed run blocks its successor for
/// at most this long.
pub const LEASE_TTL_SECS: u64 = 300;

/// Interval between heartbeat renewals (seconds). Well under the TTL so a
/// healthy run never loses its lease.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

// =============================================================================
// SUMMARIZATION
// =============================================================================

/// Minimum labeled messages a window needs before it is summarized.
pub const MIN_WINDOW_MESSAGES: usize = 5;

/// Minimum messages a theme needs to survive clustering; also the floor
/// for the representative-id count.
pub const MIN_THEME_MESSAGES: usize = 3;

/// Silence longer than this starts a new theme even on the same topic
/// (seconds).
pub const IDLE_GAP_SECS: i64 = 1800;

/// Key-takeaway count bounds for one theme.
pub const KEY_TAKEAWAYS_MIN: usize = 2;
pub const KEY_TAKEAWAYS_MAX: usize = 4;

/// Representative-id count bounds for one theme.
pub const REPRESENTATIVES_MIN: usize = 3;
pub const REPRESENTATIVES_MAX: usize = 4;

/// How many times a schema-invalid generation is retried before the theme
/// is dropped.
pub const SCHEMA_RETRY_LIMIT: usize = 1;

/// Default page size when listing digest history.
pub const DIGEST_LIST_LIMIT: i64 = 10;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default classifier service base URL.
pub const CLASSIFIER_URL: &str = "http://127.0.0.1:8501";

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "gpt-oss:20b";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;
