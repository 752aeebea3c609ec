//! Classifier job: scheduled batch enrichment of unprocessed messages.
//!
//! One invocation per scheduling interval, exclusive-at-most-once per
//! partition via a run lease with heartbeat renewal. The batch is bounded so
//! a run's wall-clock time stays under the interval, and each message is
//! handled independently: a failure on one message never blocks the next.
//!
//! The two-step commit — write the label, then flip the processed flag —
//! makes crash recovery idempotent: anything that failed or crashed before
//! the flag flip is re-fetched by the next run's unprocessed query.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use recap_core::{
    defaults, BatchOutcome, ClassifierBackend, Error, Label, LabelRepository, Message,
    MessageRepository, Result, RunLease, RunLockRepository, TopicMap,
};

/// Configuration for the classifier job.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Maximum messages fetched per run.
    pub batch_limit: i64,
    /// Run-lock partition key.
    pub partition: String,
    /// Lease time-to-live.
    pub lease_ttl: Duration,
    /// Interval between lease renewals.
    pub heartbeat_interval: Duration,
    /// Bounded timeout for classifying one message.
    pub classify_timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            batch_limit: defaults::CLASSIFY_BATCH_LIMIT,
            partition: defaults::RUN_PARTITION.to_string(),
            lease_ttl: Duration::from_secs(defaults::LEASE_TTL_SECS),
            heartbeat_interval: Duration::from_secs(defaults::HEARTBEAT_INTERVAL_SECS),
            classify_timeout: Duration::from_secs(defaults::CLASSIFY_TIMEOUT_SECS),
        }
    }
}

impl ClassifierConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `RECAP_BATCH_LIMIT` | `100` | Max messages per run |
    /// | `RECAP_RUN_PARTITION` | `classifier` | Run-lock partition key |
    /// | `RECAP_LEASE_TTL_SECS` | `300` | Lease time-to-live |
    /// | `RECAP_HEARTBEAT_INTERVAL_SECS` | `30` | Lease renewal interval |
    /// | `RECAP_CLASSIFY_TIMEOUT_SECS` | `30` | Per-message inference timeout |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let batch_limit = std::env::var("RECAP_BATCH_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults.batch_limit)
            .max(1);

        let partition =
            std::env::var("RECAP_RUN_PARTITION").unwrap_or_else(|_| defaults.partition.clone());

        let lease_ttl = std::env::var("RECAP_LEASE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.lease_ttl);

        let heartbeat_interval = std::env::var("RECAP_HEARTBEAT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.heartbeat_interval);

        let classify_timeout = std::env::var("RECAP_CLASSIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.classify_timeout);

        Self {
            batch_limit,
            partition,
            lease_ttl,
            heartbeat_interval,
            classify_timeout,
        }
    }

    /// Set the batch limit.
    pub fn with_batch_limit(mut self, limit: i64) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Set the run-lock partition.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Set the per-message classify timeout.
    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    /// Set the lease TTL.
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }
}

/// The scheduled batch classifier.
pub struct ClassifierJob {
    messages: Arc<dyn MessageRepository>,
    labels: Arc<dyn LabelRepository>,
    run_locks: Arc<dyn RunLockRepository>,
    classifier: Arc<dyn ClassifierBackend>,
    topics: Arc<TopicMap>,
    config: ClassifierConfig,
}

impl ClassifierJob {
    /// Create a new classifier job over the given stores and backend.
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        labels: Arc<dyn LabelRepository>,
        run_locks: Arc<dyn RunLockRepository>,
        classifier: Arc<dyn ClassifierBackend>,
        topics: Arc<TopicMap>,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            messages,
            labels,
            run_locks,
            classifier,
            topics,
            config,
        }
    }

    /// Run one batch.
    ///
    /// Fails fast with `RunLockContention` if another run holds the
    /// partition — the caller treats that as a no-op, not an error. The
    /// lease and the loaded model are released on every exit path.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "classifier", op = "run", partition = %self.config.partition))]
    pub async fn run(&self) -> Result<BatchOutcome> {
        let start = Instant::now();

        let lease = self
            .run_locks
            .acquire(&self.config.partition, self.config.lease_ttl)
            .await?;
        info!(
            run_id = %lease.holder,
            batch_limit = self.config.batch_limit,
            "Classifier run started"
        );

        let heartbeat = self.spawn_heartbeat(lease.clone());
        let result = self.run_locked().await;
        heartbeat.abort();

        if let Err(e) = self.run_locks.release(&lease).await {
            warn!(run_id = %lease.holder, error = %e, "Failed to release run lease");
        }

        match &result {
            Ok(outcome) => info!(
                run_id = %lease.holder,
                processed_count = outcome.processed_count,
                failed_count = outcome.failed_ids.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Classifier run finished"
            ),
            Err(e) => warn!(
                run_id = %lease.holder,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Classifier run aborted"
            ),
        }
        result
    }

    /// Body of the run while the lease is held.
    async fn run_locked(&self) -> Result<BatchOutcome> {
        // Model occupies the accelerator only between load and release.
        self.classifier.load().await?;
        let outcome = self.process_batch().await;
        if let Err(e) = self.classifier.release().await {
            warn!(error = %e, "Failed to release classifier model");
        }
        outcome
    }

    async fn process_batch(&self) -> Result<BatchOutcome> {
        let batch = self
            .messages
            .fetch_unprocessed(self.config.batch_limit)
            .await?;
        debug!(batch_size = batch.len(), "Fetched unprocessed messages");

        let mut outcome = BatchOutcome::default();
        for message in batch {
            match self.classify_one(&message).await {
                Ok(()) => outcome.processed_count += 1,
                // A store error means the backlog itself is unreachable;
                // nothing further can land, so the invocation aborts.
                Err(e @ Error::Database(_)) => return Err(e),
                Err(e) => {
                    // Left unprocessed, so the next run's fetch retries it.
                    warn!(
                        message_id = message.id,
                        chat_id = message.chat_id,
                        error = %e,
                        "Message classification failed; left for next run"
                    );
                    outcome.failed_ids.push(message.id);
                }
            }
        }
        Ok(outcome)
    }

    /// Classify one message and commit its label.
    ///
    /// Ordering matters: the label write precedes the flag flip, so a crash
    /// between the two leaves the message re-fetchable and the retried
    /// label write is an idempotent overwrite.
    async fn classify_one(&self, message: &Message) -> Result<()> {
        let texts = [message.text.clone()];
        let classifications = tokio::time::timeout(
            self.config.classify_timeout,
            self.classifier.classify(&texts),
        )
        .await
        .map_err(|_| Error::InferenceTimeout(message.id))??;

        let classification = classifications.first().copied().ok_or_else(|| {
            Error::Inference(format!(
                "Empty classification result for message {}",
                message.id
            ))
        })?;

        if !(defaults::SENTIMENT_MIN..=defaults::SENTIMENT_MAX)
            .contains(&classification.sentiment_score)
        {
            return Err(Error::Inference(format!(
                "Sentiment score {} outside [{}, {}] for message {}",
                classification.sentiment_score,
                defaults::SENTIMENT_MIN,
                defaults::SENTIMENT_MAX,
                message.id
            )));
        }

        let topic_name = self.topics.resolve(classification.topic_id)?.to_string();

        let label = Label {
            message_id: message.id,
            sentiment_score: classification.sentiment_score,
            topic_id: classification.topic_id,
            topic_name,
            labeled_at: Utc::now(),
        };
        self.labels.upsert(&label).await?;
        self.messages.mark_processed(message.id).await?;

        trace!(
            message_id = message.id,
            topic_id = label.topic_id,
            "Message labeled"
        );
        Ok(())
    }

    fn spawn_heartbeat(&self, lease: RunLease) -> JoinHandle<()> {
        let run_locks = self.run_locks.clone();
        let interval = self.config.heartbeat_interval;
        let ttl = self.config.lease_ttl;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = run_locks.heartbeat(&lease, ttl).await {
                    warn!(
                        partition = %lease.partition,
                        run_id = %lease.holder,
                        error = %e,
                        "Lease heartbeat failed"
                    );
                    break;
                }
            }
        })
    }
}
