//! Mock inference backends for deterministic testing.
//!
//! Provides mock implementations of the classifier and generation backends
//! that return configured, deterministic results and record every call for
//! assertion. Enabled for in-crate tests and, via the `mock` feature, for
//! dependent crates' test suites.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use recap_core::{Classification, ClassifierBackend, Error, GenerationBackend, Result};

// =============================================================================
// MOCK CLASSIFIER
// =============================================================================

/// Mock classifier backend for testing.
#[derive(Clone, Default)]
pub struct MockClassifierBackend {
    inner: Arc<MockClassifierInner>,
}

#[derive(Default)]
struct MockClassifierInner {
    mappings: Mutex<HashMap<String, Classification>>,
    failing_texts: Mutex<HashSet<String>>,
    default_classification: Mutex<Classification>,
    latency_ms: AtomicUsize,
    failure_rate: Mutex<f64>,
    classify_calls: AtomicUsize,
    load_calls: AtomicUsize,
    release_calls: AtomicUsize,
}

impl MockClassifierBackend {
    /// Create a new mock classifier with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classification returned for unmapped texts.
    pub fn with_default(self, classification: Classification) -> Self {
        *self.inner.default_classification.lock().unwrap() = classification;
        self
    }

    /// Map a specific text to a specific classification.
    pub fn with_mapping(self, text: impl Into<String>, classification: Classification) -> Self {
        self.inner
            .mappings
            .lock()
            .unwrap()
            .insert(text.into(), classification);
        self
    }

    /// Make classification fail whenever the batch contains this text.
    pub fn with_failing_text(self, text: impl Into<String>) -> Self {
        self.inner.failing_texts.lock().unwrap().insert(text.into());
        self
    }

    /// Set simulated latency for classify calls.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.inner
            .latency_ms
            .store(latency_ms as usize, Ordering::SeqCst);
        self
    }

    /// Set random failure rate (0.0 - 1.0) for error-handling tests.
    pub fn with_failure_rate(self, rate: f64) -> Self {
        *self.inner.failure_rate.lock().unwrap() = rate.clamp(0.0, 1.0);
        self
    }

    /// Number of classify calls made.
    pub fn classify_call_count(&self) -> usize {
        self.inner.classify_calls.load(Ordering::SeqCst)
    }

    /// Number of model load calls made.
    pub fn load_call_count(&self) -> usize {
        self.inner.load_calls.load(Ordering::SeqCst)
    }

    /// Number of model release calls made.
    pub fn release_call_count(&self) -> usize {
        self.inner.release_calls.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        let rate = *self.inner.failure_rate.lock().unwrap();
        if rate > 0.0 {
            use rand::Rng;
            rand::thread_rng().gen::<f64>() < rate
        } else {
            false
        }
    }
}

#[async_trait]
impl ClassifierBackend for MockClassifierBackend {
    async fn classify(&self, texts: &[String]) -> Result<Vec<Classification>> {
        self.inner.classify_calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.inner.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency as u64)).await;
        }

        if self.should_fail() {
            return Err(Error::Inference("Injected mock failure".to_string()));
        }

        let failing = self.inner.failing_texts.lock().unwrap();
        if let Some(text) = texts.iter().find(|t| failing.contains(*t)) {
            return Err(Error::Inference(format!("Mock failure for text: {text}")));
        }
        drop(failing);

        let mappings = self.inner.mappings.lock().unwrap();
        let default = *self.inner.default_classification.lock().unwrap();
        Ok(texts
            .iter()
            .map(|t| mappings.get(t).copied().unwrap_or(default))
            .collect())
    }

    async fn load(&self) -> Result<()> {
        self.inner.load_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.inner.release_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "mock-classifier"
    }
}

// =============================================================================
// MOCK GENERATOR
// =============================================================================

/// Mock generation backend for testing.
///
/// Queued responses are consumed in order; once the queue is empty the
/// configured default response is returned.
#[derive(Clone, Default)]
pub struct MockGenerationBackend {
    inner: Arc<MockGenerationInner>,
}

#[derive(Default)]
struct MockGenerationInner {
    queued: Mutex<VecDeque<String>>,
    default_response: Mutex<String>,
    fail_times: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerationBackend {
    /// Create a new mock generator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response returned when the queue is empty.
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.inner.default_response.lock().unwrap() = response.into();
        self
    }

    /// Queue responses to be returned in order.
    pub fn with_queued_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queued = self.inner.queued.lock().unwrap();
        queued.extend(responses.into_iter().map(Into::into));
        drop(queued);
        self
    }

    /// Fail the next `n` generation calls before serving responses.
    pub fn with_failures(self, n: usize) -> Self {
        self.inner.fail_times.store(n, Ordering::SeqCst);
        self
    }

    /// All prompts this backend has seen.
    pub fn prompts(&self) -> Vec<String> {
        self.inner.prompts.lock().unwrap().clone()
    }

    /// Number of generation calls made.
    pub fn call_count(&self) -> usize {
        self.inner.prompts.lock().unwrap().len()
    }

    fn next_response(&self, prompt: &str) -> Result<String> {
        self.inner.prompts.lock().unwrap().push(prompt.to_string());

        let remaining = self.inner.fail_times.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner.fail_times.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Inference("Injected mock failure".to_string()));
        }

        if let Some(response) = self.inner.queued.lock().unwrap().pop_front() {
            return Ok(response);
        }
        Ok(self.inner.default_response.lock().unwrap().clone())
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.next_response(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.next_response(prompt)
    }

    async fn generate_structured(
        &self,
        _system: &str,
        prompt: &str,
        _schema: &JsonValue,
    ) -> Result<String> {
        self.next_response(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_classifier_mapping_and_default() {
        let backend = MockClassifierBackend::new()
            .with_default(Classification {
                sentiment_score: 0.1,
                topic_id: 7,
            })
            .with_mapping(
                "angry text",
                Classification {
                    sentiment_score: -0.9,
                    topic_id: 1,
                },
            );

        let results = backend
            .classify(&["angry text".to_string(), "anything".to_string()])
            .await
            .unwrap();
        assert_eq!(results[0].topic_id, 1);
        assert_eq!(results[1].topic_id, 7);
        assert_eq!(backend.classify_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_classifier_failing_text() {
        let backend = MockClassifierBackend::new().with_failing_text("poison");
        let err = backend.classify(&["poison".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_mock_classifier_tracks_load_release() {
        let backend = MockClassifierBackend::new();
        backend.load().await.unwrap();
        backend.release().await.unwrap();
        backend.release().await.unwrap();
        assert_eq!(backend.load_call_count(), 1);
        assert_eq!(backend.release_call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_generator_queue_then_default() {
        let backend = MockGenerationBackend::new()
            .with_default_response("fallback")
            .with_queued_responses(["first", "second"]);

        assert_eq!(backend.generate("a").await.unwrap(), "first");
        assert_eq!(backend.generate("b").await.unwrap(), "second");
        assert_eq!(backend.generate("c").await.unwrap(), "fallback");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_generator_failure_injection() {
        let backend = MockGenerationBackend::new()
            .with_default_response("ok")
            .with_failures(1);

        assert!(backend.generate("x").await.is_err());
        assert_eq!(backend.generate("y").await.unwrap(), "ok");
    }
}
