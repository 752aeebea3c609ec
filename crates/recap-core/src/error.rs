//! Error types for recap.

use thiserror::Error;

/// Result type alias using recap's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for recap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Message not found
    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    /// Topic id missing from the topic map. A model/topic-table version
    /// mismatch — fatal to that message's classification, never defaulted.
    #[error("Unknown topic id: {0}")]
    UnknownTopic(i32),

    /// Inference exceeded its bounded timeout for one message.
    #[error("Inference timed out for message {0}")]
    InferenceTimeout(i64),

    /// Window holds too few labeled messages to summarize.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Generation response failed theme schema validation.
    #[error("Generation schema violation: {0}")]
    GenerationSchema(String),

    /// A live run lease already exists for the partition.
    #[error("Run lock contention on partition: {0}")]
    RunLockContention(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_message_not_found() {
        let err = Error::MessageNotFound(42);
        assert_eq!(err.to_string(), "Message not found: 42");
    }

    #[test]
    fn test_error_display_unknown_topic() {
        let err = Error::UnknownTopic(17);
        assert_eq!(err.to_string(), "Unknown topic id: 17");
    }

    #[test]
    fn test_error_display_inference_timeout() {
        let err = Error::InferenceTimeout(99);
        assert_eq!(err.to_string(), "Inference timed out for message 99");
    }

    #[test]
    fn test_error_display_insufficient_data() {
        let err = Error::InsufficientData("2 labeled messages in window".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data: 2 labeled messages in window"
        );
    }

    #[test]
    fn test_error_display_generation_schema() {
        let err = Error::GenerationSchema("missing emoji".to_string());
        assert_eq!(err.to_string(), "Generation schema violation: missing emoji");
    }

    #[test]
    fn test_error_display_run_lock_contention() {
        let err = Error::RunLockContention("classifier".to_string());
        assert_eq!(
            err.to_string(),
            "Run lock contention on partition: classifier"
        );
    }

    #[test]
    fn test_error_display_inference() {
        let err = Error::Inference("model timeout".to_string());
        assert_eq!(err.to_string(), "Inference error: model timeout");
    }

    #[test]
    fn test_error_display_serialization() {
        let err = Error::Serialization("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Serialization error: invalid JSON");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing DATABASE_URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing DATABASE_URL");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("negative batch limit".to_string());
        assert_eq!(err.to_string(), "Invalid input: negative batch limit");
    }

    #[test]
    fn test_error_display_request() {
        let err = Error::Request("network unreachable".to_string());
        assert_eq!(err.to_string(), "Request error: network unreachable");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        let result = get_result();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::UnknownTopic(3);
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("UnknownTopic"));
    }
}
