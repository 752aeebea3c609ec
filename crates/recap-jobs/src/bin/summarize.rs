//! recap-summarize — produce the digest for one chat window.
//!
//! With no explicit window, summarizes yesterday's full UTC day (the
//! scheduled daily cadence). Exit status:
//!
//! - `0` — digest stored, or the window held too little labeled data
//!   (logged; caller may retry later or with a wider window)
//! - `1` — any other failure
//!
//! Usage:
//!   recap-summarize --chat-id ID [--start RFC3339 --end RFC3339]

use std::env;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use recap_core::{Digest, Error, Result};
use recap_db::Database;
use recap_inference::OllamaBackend;
use recap_jobs::{SummarizerConfig, ThemeSummarizer};

#[derive(Debug, Default)]
struct Args {
    chat_id: Option<i64>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_args() -> Args {
    let argv: Vec<String> = env::args().collect();
    let mut args = Args::default();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--chat-id" | "-c" => {
                i += 1;
                if i < argv.len() {
                    args.chat_id = argv[i].parse().ok();
                }
            }
            "--start" | "-s" => {
                i += 1;
                if i < argv.len() {
                    args.start = parse_timestamp(&argv[i]);
                    if args.start.is_none() {
                        eprintln!("Invalid --start timestamp: {}", argv[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--end" | "-e" => {
                i += 1;
                if i < argv.len() {
                    args.end = parse_timestamp(&argv[i]);
                    if args.end.is_none() {
                        eprintln!("Invalid --end timestamp: {}", argv[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: recap-summarize --chat-id ID [--start RFC3339 --end RFC3339]"
                );
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
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
                .unwrap_or("recap-summarize.log");
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

/// Yesterday's full UTC day, the default daily window.
fn default_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let today = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    (today - Duration::days(1), today)
}

async fn run(args: Args) -> Result<Digest> {
    let chat_id = args
        .chat_id
        .ok_or_else(|| Error::Config("--chat-id is required".to_string()))?;
    let (default_start, default_end) = default_window();
    let window_start = args.start.unwrap_or(default_start);
    let window_end = args.end.unwrap_or(default_end);

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
    let db = Database::connect(&database_url).await?;

    let summarizer = ThemeSummarizer::new(
        Arc::new(recap_db::PgLabelRepository::new(db.pool.clone())),
        Arc::new(recap_db::PgDigestRepository::new(db.pool.clone())),
        Arc::new(OllamaBackend::from_env()),
        SummarizerConfig::from_env(),
    );

    summarizer.summarize(chat_id, window_start, window_end).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let args = parse_args();
    let code = match run(args).await {
        Ok(digest) => {
            info!(
                digest_id = %digest.id,
                chat_id = digest.chat_id,
                theme_count = digest.themes.len(),
                "Digest stored"
            );
            0
        }
        Err(Error::InsufficientData(reason)) => {
            warn!(reason = %reason, "Window not summarized");
            0
        }
        Err(e) => {
            error!(error = %e, "Summarization failed");
            1
        }
    };
    std::process::exit(code);
}
