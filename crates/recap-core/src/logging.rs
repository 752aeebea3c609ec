//! Structured logging schema and field name constants for recap.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, per-item failure left for the next run |
//! | INFO  | Lifecycle events (run start/end), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (messages, clusters) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one job run. Format: UUIDv7 (time-ordered).
pub const RUN_ID: &str = "run_id";

/// Subsystem originating the log event.
/// Values: "db", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "classifier", "summarizer", "pool", "ollama", "run_lock"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "run", "summarize", "classify", "acquire", "upsert"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Message id being operated on.
pub const MESSAGE_ID: &str = "message_id";

/// Chat id being operated on.
pub const CHAT_ID: &str = "chat_id";

/// Digest UUID being written or read.
pub const DIGEST_ID: &str = "digest_id";

/// Topic id emitted by the classifier model.
pub const TOPIC_ID: &str = "topic_id";

/// Run-lock partition key.
pub const PARTITION: &str = "partition";

/// Summarization window bounds (RFC 3339).
pub const WINDOW_START: &str = "window_start";
pub const WINDOW_END: &str = "window_end";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of messages fetched for a batch.
pub const BATCH_SIZE: &str = "batch_size";

/// Messages successfully labeled and marked this run.
pub const PROCESSED_COUNT: &str = "processed_count";

/// Messages that failed this run (retried next run).
pub const FAILED_COUNT: &str = "failed_count";

/// Themes surviving validation in a digest.
pub const THEME_COUNT: &str = "theme_count";

/// Labeled messages seen in a summarization window.
pub const MESSAGE_COUNT: &str = "message_count";

/// Byte length of a prompt or response.
pub const PROMPT_LEN: &str = "prompt_len";
pub const RESPONSE_LEN: &str = "response_len";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
