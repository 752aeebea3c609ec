//! Theme summarizer: windowed digest generation over labeled messages.
//!
//! The summarizer reads a chat's labeled messages for one window, groups
//! them into candidate themes, asks the generation backend for a
//! schema-constrained summary of each, and upserts the assembled digest.
//!
//! Clustering is a deterministic single pass over the time-ordered window:
//! messages group by topic id, and a silence longer than the idle gap
//! starts a new theme even on the same topic. It is not an optimization
//! search — the same input always yields the same grouping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use recap_core::{
    defaults, Digest, DigestRepository, Error, GenerationBackend, LabelRepository, LabeledMessage,
    Message, Result,
};

use crate::schema::{theme_schema, validate_draft, ThemeGeneration};

/// System context for theme generation requests.
const SYSTEM_PROMPT: &str = "You summarize one discussion from a group chat transcript. \
    Respond with JSON matching the requested schema: the theme name as a short sentence, \
    a single emoji, 2-4 key takeaways covering the main points and the participants' \
    opinions, and the ids of the messages you were shown.";

/// Configuration for the theme summarizer.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Minimum labeled messages a window needs before it is summarized.
    pub min_window_messages: usize,
    /// Minimum messages a cluster needs to become a theme.
    pub min_theme_messages: usize,
    /// Silence longer than this starts a new theme on the same topic.
    pub idle_gap: chrono::Duration,
    /// Bounded timeout for one generation request.
    pub generation_timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            min_window_messages: defaults::MIN_WINDOW_MESSAGES,
            min_theme_messages: defaults::MIN_THEME_MESSAGES,
            idle_gap: chrono::Duration::seconds(defaults::IDLE_GAP_SECS),
            generation_timeout: Duration::from_secs(defaults::GEN_TIMEOUT_SECS),
        }
    }
}

impl SummarizerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `RECAP_MIN_WINDOW_MESSAGES` | `5` | Minimum labeled messages per window |
    /// | `RECAP_MIN_THEME_MESSAGES` | `3` | Minimum messages per theme |
    /// | `RECAP_IDLE_GAP_SECS` | `1800` | Silence that splits a theme |
    /// | `RECAP_GEN_TIMEOUT_SECS` | `120` | Per-theme generation timeout |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let min_window_messages = std::env::var("RECAP_MIN_WINDOW_MESSAGES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.min_window_messages)
            .max(1);

        let min_theme_messages = std::env::var("RECAP_MIN_THEME_MESSAGES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.min_theme_messages)
            .max(recap_core::defaults::REPRESENTATIVES_MIN);

        let idle_gap = std::env::var("RECAP_IDLE_GAP_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(chrono::Duration::seconds)
            .unwrap_or(defaults.idle_gap);

        let generation_timeout = std::env::var("RECAP_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.generation_timeout);

        Self {
            min_window_messages,
            min_theme_messages,
            idle_gap,
            generation_timeout,
        }
    }

    /// Set the minimum window size.
    pub fn with_min_window_messages(mut self, n: usize) -> Self {
        self.min_window_messages = n;
        self
    }

    /// Set the idle gap.
    pub fn with_idle_gap(mut self, gap: chrono::Duration) -> Self {
        self.idle_gap = gap;
        self
    }

    /// Set the per-theme generation timeout.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }
}

/// One candidate theme before generation: a topic-coherent, gap-free run
/// of messages.
#[derive(Debug, Clone)]
pub(crate) struct Cluster {
    pub topic_id: i32,
    pub messages: Vec<LabeledMessage>,
}

/// The windowed digest generator.
pub struct ThemeSummarizer {
    labels: Arc<dyn LabelRepository>,
    digests: Arc<dyn DigestRepository>,
    generator: Arc<dyn GenerationBackend>,
    config: SummarizerConfig,
}

impl ThemeSummarizer {
    /// Create a new summarizer over the given stores and backend.
    pub fn new(
        labels: Arc<dyn LabelRepository>,
        digests: Arc<dyn DigestRepository>,
        generator: Arc<dyn GenerationBackend>,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            labels,
            digests,
            generator,
            config,
        }
    }

    /// Produce and store the digest for one chat window.
    ///
    /// The label store is read once at call time; messages whose labels are
    /// still in flight simply shrink the candidate set. Fails with
    /// `InsufficientData` when the window is too thin or no theme survives
    /// generation — a digest is whole or absent, never half-built.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "summarizer", op = "summarize", chat_id = chat_id, window_start = %window_start, window_end = %window_end))]
    pub async fn summarize(
        &self,
        chat_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Digest> {
        if window_start >= window_end {
            return Err(Error::InvalidInput(format!(
                "Summarization window is empty or inverted: {window_start} .. {window_end}"
            )));
        }

        let start = Instant::now();
        let labeled = self
            .labels
            .list_labeled_window(chat_id, window_start, window_end)
            .await?;

        if labeled.len() < self.config.min_window_messages {
            return Err(Error::InsufficientData(format!(
                "{} labeled messages in window, need {}",
                labeled.len(),
                self.config.min_window_messages
            )));
        }

        let clusters = cluster_messages(&labeled, self.config.idle_gap);
        debug!(
            message_count = labeled.len(),
            cluster_count = clusters.len(),
            "Window clustered"
        );

        let schema = theme_schema();
        let mut themes = Vec::new();
        for cluster in &clusters {
            if cluster.messages.len() < self.config.min_theme_messages {
                trace!(
                    topic_id = cluster.topic_id,
                    size = cluster.messages.len(),
                    "Cluster too thin to summarize"
                );
                continue;
            }
            let representatives = select_representatives(&cluster.messages);
            if let ThemeGeneration::Validated(theme) =
                self.generate_theme(&representatives, &schema).await
            {
                themes.push(theme);
            }
        }

        if themes.is_empty() {
            return Err(Error::InsufficientData(
                "no themes survived generation".to_string(),
            ));
        }

        // Digest order mirrors the transcript: themes sort by the send time
        // of their first representative.
        let sent_index: HashMap<i64, DateTime<Utc>> = labeled
            .iter()
            .map(|lm| (lm.message.id, lm.message.sent_at))
            .collect();
        themes.sort_by_key(|theme| {
            theme
                .message_ids
                .first()
                .and_then(|id| sent_index.get(id).copied())
        });

        let digest = Digest {
            id: Uuid::now_v7(),
            chat_id,
            window_start,
            window_end,
            themes,
            message_count: labeled.len() as i64,
            generated_at: Utc::now(),
        };
        self.digests.upsert(&digest).await?;

        info!(
            digest_id = %digest.id,
            theme_count = digest.themes.len(),
            message_count = digest.message_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Digest generated"
        );
        Ok(digest)
    }

    /// Drive one theme through pending → validated | dropped.
    ///
    /// A non-conforming (or failed) generation is retried once with the
    /// same input; the second miss drops the theme. Dropping never aborts
    /// the digest — the caller just skips it.
    async fn generate_theme(
        &self,
        representatives: &[&LabeledMessage],
        schema: &JsonValue,
    ) -> ThemeGeneration {
        let allowed: Vec<i64> = representatives.iter().map(|lm| lm.message.id).collect();
        let prompt = build_prompt(representatives);

        let mut state = ThemeGeneration::Pending;
        for attempt in 0..=defaults::SCHEMA_RETRY_LIMIT {
            let response = tokio::time::timeout(
                self.config.generation_timeout,
                self.generator.generate_structured(SYSTEM_PROMPT, &prompt, schema),
            )
            .await;

            let validated = match response {
                Err(_) => Err(Error::Inference("Generation timed out".to_string())),
                Ok(Err(e)) => Err(e),
                Ok(Ok(raw)) => validate_draft(&raw, &allowed),
            };

            match validated {
                Ok(theme) => return ThemeGeneration::Validated(theme),
                Err(e) if attempt < defaults::SCHEMA_RETRY_LIMIT => {
                    warn!(error = %e, "Theme generation attempt failed; retrying");
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        message_id = allowed.first().copied().unwrap_or_default(),
                        "Theme dropped after retry"
                    );
                    state = ThemeGeneration::Dropped {
                        reason: e.to_string(),
                    };
                }
            }
        }
        state
    }
}

/// Group a time-ordered window into candidate themes.
///
/// Single deterministic pass: each message joins the open cluster for its
/// topic unless the silence since that cluster's last message exceeds
/// `idle_gap`, in which case a new cluster opens. Clusters are returned in
/// order of their first message.
pub(crate) fn cluster_messages(
    messages: &[LabeledMessage],
    idle_gap: chrono::Duration,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut open: HashMap<i32, usize> = HashMap::new();

    for lm in messages {
        let topic_id = lm.label.topic_id;
        let joined = open.get(&topic_id).copied().filter(|&idx| {
            clusters[idx]
                .messages
                .last()
                .map(|prev| lm.message.sent_at - prev.message.sent_at <= idle_gap)
                .unwrap_or(false)
        });

        match joined {
            Some(idx) => clusters[idx].messages.push(lm.clone()),
            None => {
                clusters.push(Cluster {
                    topic_id,
                    messages: vec![lm.clone()],
                });
                open.insert(topic_id, clusters.len() - 1);
            }
        }
    }
    clusters
}

/// Pick the representative messages for a cluster of at least 3.
///
/// First and last bound the discussion; the middle pick is the message in
/// the middle third whose send time is closest to the cluster's temporal
/// midpoint (earlier wins ties, keeping selection deterministic).
pub(crate) fn select_representatives(messages: &[LabeledMessage]) -> Vec<&LabeledMessage> {
    let len = messages.len();
    debug_assert!(len >= 3);
    let first = &messages[0];
    let last = &messages[len - 1];

    let mut lo = (len / 3).max(1);
    let mut hi = (len - len / 3).min(len - 1);
    if lo >= hi {
        lo = 1;
        hi = len - 1;
    }

    let midpoint = first.message.sent_at + (last.message.sent_at - first.message.sent_at) / 2;
    let mut best = lo;
    for i in lo..hi {
        let distance = (messages[i].message.sent_at - midpoint).abs();
        if distance < (messages[best].message.sent_at - midpoint).abs() {
            best = i;
        }
    }

    vec![first, &messages[best], last]
}

/// Format one message as a transcript line for the generation prompt.
///
/// Newlines collapse to `\n` so each message stays one line, the way the
/// transcript is shown to the model.
fn format_transcript_line(m: &Message) -> String {
    let text = m.text.replace('\n', "\\n");
    format!(
        "[{}] (id {}) {}: {}",
        m.sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        m.id,
        m.author_ref,
        text
    )
}

fn build_prompt(representatives: &[&LabeledMessage]) -> String {
    let lines: Vec<String> = representatives
        .iter()
        .map(|lm| format_transcript_line(&lm.message))
        .collect();
    format!(
        "Representative messages from the start, middle, and end of one discussion:\n\n{}\n\nSummarize this discussion.",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use recap_core::Label;

    fn labeled(id: i64, topic_id: i32, minute: i64) -> LabeledMessage {
        let sent_at = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
            + chrono::Duration::minutes(minute);
        LabeledMessage {
            message: Message {
                id,
                chat_id: -1001,
                author_ref: format!("user-{}", id % 2),
                text: format!("message {id}"),
                sent_at,
                processed: true,
            },
            label: Label {
                message_id: id,
                sentiment_score: 0.0,
                topic_id,
                topic_name: "topic".to_string(),
                labeled_at: sent_at,
            },
        }
    }

    #[test]
    fn test_cluster_groups_by_topic_across_interleaving() {
        let messages = vec![
            labeled(1, 0, 0),
            labeled(2, 1, 1),
            labeled(3, 0, 2),
            labeled(4, 1, 3),
            labeled(5, 0, 4),
        ];
        let clusters = cluster_messages(&messages, chrono::Duration::minutes(30));

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].topic_id, 0);
        let ids: Vec<i64> = clusters[0].messages.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        let ids: Vec<i64> = clusters[1].messages.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_cluster_splits_on_idle_gap() {
        let messages = vec![
            labeled(1, 0, 0),
            labeled(2, 0, 5),
            // two hours of silence
            labeled(3, 0, 125),
            labeled(4, 0, 130),
        ];
        let clusters = cluster_messages(&messages, chrono::Duration::minutes(30));

        assert_eq!(clusters.len(), 2);
        let ids: Vec<i64> = clusters[0].messages.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![1, 2]);
        let ids: Vec<i64> = clusters[1].messages.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_cluster_is_deterministic() {
        let messages: Vec<LabeledMessage> = (0..20)
            .map(|i| labeled(i, (i % 3) as i32, i * 7))
            .collect();

        let a = cluster_messages(&messages, chrono::Duration::minutes(30));
        let b = cluster_messages(&messages, chrono::Duration::minutes(30));

        assert_eq!(a.len(), b.len());
        for (ca, cb) in a.iter().zip(&b) {
            let ids_a: Vec<i64> = ca.messages.iter().map(|m| m.message.id).collect();
            let ids_b: Vec<i64> = cb.messages.iter().map(|m| m.message.id).collect();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn test_representatives_for_three_messages() {
        let messages = vec![labeled(1, 0, 0), labeled(2, 0, 1), labeled(3, 0, 2)];
        let reps = select_representatives(&messages);
        let ids: Vec<i64> = reps.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_representatives_pick_middle_closest_to_midpoint() {
        // Midpoint of [0, 60] is minute 30; of the middle third, minute 28
        // is closest.
        let messages = vec![
            labeled(1, 0, 0),
            labeled(2, 0, 10),
            labeled(3, 0, 28),
            labeled(4, 0, 45),
            labeled(5, 0, 55),
            labeled(6, 0, 60),
        ];
        let reps = select_representatives(&messages);
        let ids: Vec<i64> = reps.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![1, 3, 6]);
    }

    #[test]
    fn test_representatives_tie_keeps_earlier() {
        // Minutes 1 and 2 are equidistant from the 1.5 midpoint of [0, 3].
        let messages = vec![
            labeled(1, 0, 0),
            labeled(2, 0, 1),
            labeled(3, 0, 2),
            labeled(4, 0, 3),
        ];
        let reps = select_representatives(&messages);
        let ids: Vec<i64> = reps.iter().map(|m| m.message.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_transcript_line_escapes_newlines() {
        let mut lm = labeled(7, 0, 0);
        lm.message.text = "line one\nline two".to_string();
        let line = format_transcript_line(&lm.message);
        assert!(line.contains("line one\\nline two"));
        assert!(line.contains("(id 7)"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_config_defaults() {
        let config = SummarizerConfig::default();
        assert_eq!(config.min_window_messages, 5);
        assert_eq!(config.min_theme_messages, 3);
        assert_eq!(config.idle_gap, chrono::Duration::seconds(1800));
    }
}
