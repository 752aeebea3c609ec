//! # recap-inference
//!
//! Inference backend abstraction for recap.
//!
//! This crate provides:
//! - An HTTP classifier service client (sentiment + topic, batched, with
//!   explicit model load/release around a batch run)
//! - An Ollama generation backend with JSON-Schema-constrained output
//! - Mock backends for deterministic testing (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Enable mock backends for dependent crates' tests
//! - `integration`: Enable tests that require live inference services
//!
//! # Example
//!
//! ```rust,no_run
//! use recap_inference::HttpClassifierBackend;
//! use recap_core::ClassifierBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = HttpClassifierBackend::from_env();
//!     let texts = vec!["Hello".to_string()];
//!     let labels = backend.classify(&texts).await.unwrap();
//!     println!("{:?}", labels);
//! }
//! ```

pub mod classifier;
pub mod ollama;

// Mock inference backends for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use recap_core::*;

pub use classifier::HttpClassifierBackend;
pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockClassifierBackend, MockGenerationBackend};
