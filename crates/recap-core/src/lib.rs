//! # recap-core
//!
//! Core types, traits, and abstractions for the recap pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other recap crates depend on: the message/label/digest
//! data model, the repository and inference backend interfaces, the
//! read-only topic map, the error taxonomy, and the shared default
//! constants and logging field schema.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod topics;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use topics::TopicMap;
pub use traits::*;
