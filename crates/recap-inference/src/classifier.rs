//! HTTP classifier service backend.
//!
//! The sentiment/topic model runs in a dedicated service that owns the
//! accelerator; this client speaks its small HTTP contract:
//!
//! - `POST /classify` with `{"model": ..., "texts": [...]}` returns one
//!   `{sentiment_score, topic_id}` per input, same order.
//! - `POST /model/load` and `POST /model/release` bracket a batch run so
//!   the model occupies the device only while a run holds its reservation.
//! - `GET /health` for liveness.
//!
//! Every request carries a bounded timeout; the service never gets to
//! stall a whole batch.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use recap_core::{defaults, Classification, ClassifierBackend, Error, Result};

/// Default classifier service endpoint.
pub const DEFAULT_CLASSIFIER_URL: &str = defaults::CLASSIFIER_URL;

/// Default classifier model name.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "rubert-tiny2-sentiment";

/// Timeout for classification requests (seconds).
pub const CLASSIFY_TIMEOUT_SECS: u64 = defaults::CLASSIFY_TIMEOUT_SECS;

/// HTTP classifier backend.
pub struct HttpClassifierBackend {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    texts: &'a [String],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    results: Vec<ClassifyResult>,
}

#[derive(Deserialize)]
struct ClassifyResult {
    sentiment_score: f32,
    topic_id: i32,
}

#[derive(Serialize)]
struct ModelRequest<'a> {
    model: &'a str,
}

impl HttpClassifierBackend {
    /// Create a new classifier backend with default settings.
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_CLASSIFIER_URL.to_string(),
            DEFAULT_CLASSIFIER_MODEL.to_string(),
        )
    }

    /// Create a new classifier backend with custom configuration.
    pub fn with_config(base_url: String, model: String) -> Self {
        let timeout_secs = std::env::var("RECAP_CLASSIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(CLASSIFY_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            "Initializing classifier backend: url={}, model={}",
            base_url, model
        );

        Self {
            client,
            base_url,
            model,
            timeout_secs,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("RECAP_CLASSIFIER_URL")
            .unwrap_or_else(|_| DEFAULT_CLASSIFIER_URL.to_string());
        let model = std::env::var("RECAP_CLASSIFIER_MODEL")
            .unwrap_or_else(|_| DEFAULT_CLASSIFIER_MODEL.to_string());

        Self::with_config(base_url, model)
    }

    /// Configured per-request timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

impl Default for HttpClassifierBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassifierBackend for HttpClassifierBackend {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "classifier", op = "classify", model = %self.model, batch_size = texts.len()))]
    async fn classify(&self, texts: &[String]) -> Result<Vec<Classification>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();

        let request = ClassifyRequest {
            model: &self.model,
            texts,
        };

        let response = self
            .client
            .post(format!("{}/classify", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Classify request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Classifier returned {}: {}",
                status, body
            )));
        }

        let result: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        if result.results.len() != texts.len() {
            return Err(Error::Inference(format!(
                "Classifier returned {} results for {} texts",
                result.results.len(),
                texts.len()
            )));
        }

        let mut classifications = Vec::with_capacity(result.results.len());
        for r in result.results {
            if !(defaults::SENTIMENT_MIN..=defaults::SENTIMENT_MAX).contains(&r.sentiment_score) {
                return Err(Error::Inference(format!(
                    "Sentiment score {} outside [{}, {}]",
                    r.sentiment_score,
                    defaults::SENTIMENT_MIN,
                    defaults::SENTIMENT_MAX
                )));
            }
            classifications.push(Classification {
                sentiment_score: r.sentiment_score,
                topic_id: r.topic_id,
            });
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            batch_size = texts.len(),
            duration_ms = elapsed,
            "Classification complete"
        );
        if elapsed > 10_000 {
            warn!(
                duration_ms = elapsed,
                batch_size = texts.len(),
                slow = true,
                "Slow classification operation"
            );
        }
        Ok(classifications)
    }

    #[instrument(skip(self), fields(subsystem = "inference", component = "classifier", op = "load", model = %self.model))]
    async fn load(&self) -> Result<()> {
        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/model/load", self.base_url))
            .json(&ModelRequest { model: &self.model })
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Model load request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "Model load returned {}",
                response.status()
            )));
        }

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Classifier model loaded"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "inference", component = "classifier", op = "release", model = %self.model))]
    async fn release(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/model/release", self.base_url))
            .json(&ModelRequest { model: &self.model })
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Model release request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "Model release returned {}",
                response.status()
            )));
        }

        info!("Classifier model released");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    info!("Classifier health check passed");
                    Ok(true)
                } else {
                    warn!("Classifier health check failed: {}", resp.status());
                    Ok(false)
                }
            }
            Err(e) => {
                warn!("Classifier health check error: {}", e);
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
