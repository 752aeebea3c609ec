//! # recap-jobs
//!
//! Batch enrichment and digest jobs for recap.
//!
//! This crate provides:
//! - `ClassifierJob`: the scheduled, lease-guarded batch run that labels
//!   unprocessed messages with sentiment and topic
//! - `ThemeSummarizer`: windowed theme grouping and schema-constrained
//!   digest generation
//! - The theme generation contract (schema derivation and validation)
//! - The scheduler-facing binaries `recap-classify` and `recap-summarize`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use recap_jobs::{ClassifierConfig, ClassifierJob};
//! use recap_db::Database;
//! use recap_inference::HttpClassifierBackend;
//! use recap_core::TopicMap;
//!
//! let db = Database::connect("postgres://...").await?;
//! let db = Arc::new(db);
//! let job = ClassifierJob::new(
//!     Arc::new(recap_db::PgMessageRepository::new(db.pool.clone())),
//!     Arc::new(recap_db::PgLabelRepository::new(db.pool.clone())),
//!     Arc::new(recap_db::PgRunLockRepository::new(db.pool.clone())),
//!     Arc::new(HttpClassifierBackend::from_env()),
//!     Arc::new(TopicMap::from_file("id2topic.json")?),
//!     ClassifierConfig::from_env(),
//! );
//!
//! let outcome = job.run().await?;
//! println!("processed {}, failed {}", outcome.processed_count, outcome.failed_ids.len());
//! ```

pub mod classifier;
pub mod schema;
pub mod summarizer;

// Re-export core types
pub use recap_core::*;

pub use classifier::{ClassifierConfig, ClassifierJob};
pub use schema::{theme_schema, validate_draft, ThemeGeneration};
pub use summarizer::{SummarizerConfig, ThemeSummarizer};
