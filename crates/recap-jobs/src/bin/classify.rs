//! recap-classify — one scheduled classifier batch run.
//!
//! Invoked by an external scheduler on a fixed cadence with no payload.
//! Exit status communicates the outcome:
//!
//! - `0` — run completed cleanly, or another run holds the partition (no-op)
//! - `1` — run completed but some messages failed (they stay unprocessed
//!   and are retried on the next run)
//! - `2` — configuration or store failure; nothing was processed
//!
//! Usage:
//!   recap-classify [--batch-limit N] [--partition NAME] [--topics PATH]

use std::env;
use std::sync::Arc;

use tracing::{error, info, warn};

use recap_core::{BatchOutcome, Error, Result, TopicMap};
use recap_db::Database;
use recap_inference::HttpClassifierBackend;
use recap_jobs::{ClassifierConfig, ClassifierJob};

#[derive(Debug, Default)]
struct Args {
    batch_limit: Option<i64>,
    partition: Option<String>,
    topics_path: Option<String>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = env::args().collect();
    let mut args = Args::default();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--batch-limit" | "-b" => {
                i += 1;
                if i < argv.len() {
                    args.batch_limit = argv[i].parse().ok();
                }
            }
            "--partition" | "-p" => {
                i += 1;
                if i < argv.len() {
                    args.partition = Some(argv[i].clone());
                }
            }
            "--topics" | "-t" => {
                i += 1;
                if i < argv.len() {
                    args.topics_path = Some(argv[i].clone());
                }
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: recap-classify [--batch-limit N] [--partition NAME] [--topics PATH]"
                );
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }
    args
}

/// Initialize tracing; with `RECAP_LOG_FILE` set, logs also go to a daily
/// rolling file. The returned guard must stay alive for the process.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recap=info".into());

    match env::var("RECAP_LOG_FILE").ok() {
        Some(path) => {
            let file_dir = std::path::Path::new(&path)
                .parent()
                .unwrap_or(std::path::Path::new("."));
            let file_name = std::path::Path::new(&path)
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("recap-classify.log");
            let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            None
        }
    }
}

async fn run(args: Args) -> Result<BatchOutcome> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;

    let topics_path = args
        .topics_path
        .or_else(|| env::var("RECAP_TOPIC_MAP_PATH").ok())
        .ok_or_else(|| {
            Error::Config("Topic map path missing: pass --topics or set RECAP_TOPIC_MAP_PATH".to_string())
        })?;
    let topics = TopicMap::from_file(&topics_path)?;
    info!(topic_count = topics.len(), path = %topics_path, "Topic map loaded");

    let db = Database::connect(&database_url).await?;

    let mut config = ClassifierConfig::from_env();
    if let Some(limit) = args.batch_limit {
        config = config.with_batch_limit(limit.max(1));
    }
    if let Some(partition) = args.partition {
        config = config.with_partition(partition);
    }

    let job = ClassifierJob::new(
        Arc::new(recap_db::PgMessageRepository::new(db.pool.clone())),
        Arc::new(recap_db::PgLabelRepository::new(db.pool.clone())),
        Arc::new(recap_db::PgRunLockRepository::new(db.pool.clone())),
        Arc::new(HttpClassifierBackend::from_env()),
        Arc::new(topics),
        config,
    );

    job.run().await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let args = parse_args();
    let code = match run(args).await {
        Ok(outcome) if outcome.is_clean() => {
            info!(
                processed_count = outcome.processed_count,
                "Batch completed cleanly"
            );
            0
        }
        Ok(outcome) => {
            warn!(
                processed_count = outcome.processed_count,
                failed_count = outcome.failed_ids.len(),
                "Batch completed with failures; failed messages retry next run"
            );
            1
        }
        Err(Error::RunLockContention(partition)) => {
            info!(partition = %partition, "Another run holds the partition; nothing to do");
            0
        }
        Err(e) => {
            error!(error = %e, "Classifier run failed");
            2
        }
    };
    std::process::exit(code);
}
