use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;

use crate::config::LogLevel;
use tracing::{info, subscriber::set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

static WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize structured logging to stderr, for the short-lived `append`
/// and `follow` CLI binaries where there is no long-running process to
/// collect a log file from.
pub fn init_stderr(level: LogLevel) {
  let filter = EnvFilter::new(level_filter_str(level));
  let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
  let subscriber = Registry::default().with(filter).with(layer);
  let _ = set_global_default(subscriber);
}

fn level_filter_str(level: LogLevel) -> &'static str {
  match level {
    LogLevel::Off => "off",
    LogLevel::Warn => "warn",
    LogLevel::Info => "info",
    LogLevel::Debug => "debug",
    LogLevel::Trace => "trace",
  }
}

/// Initialize structured JSON logging to the given `logs.jsonl` path,
/// for the long-running `server` binary. This function is idempotent in
/// practice (subsequent calls will return an error from
/// `set_global_default` which we ignore). It ensures the parent
/// directory exists.
pub fn init(logs_path: &Path, level: LogLevel) {
  if let Some(parent) = logs_path.parent() {
    let _ = fs::create_dir_all(parent);
  }

  // Open file in append mode, create if missing
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(logs_path)
    .expect("open logs.jsonl for append");

  // Non-blocking writer to avoid stalling on disk IO. Keep guard alive globally.
  let (nb_writer, guard) = tracing_appender::non_blocking(file);
  let _ = WORKER_GUARD.set(guard);

  // Map config level to tracing filter
  let filter = EnvFilter::new(match level {
    LogLevel::Off => "off",
    LogLevel::Warn => "warn",
    LogLevel::Info => "info",
    LogLevel::Debug => "debug",
    LogLevel::Trace => "trace",
  });

  let json_layer = fmt::layer()
    .with_timer(ChronoUtc::rfc_3339())
    .json()
    .with_current_span(true)
    .with_span_list(true)
    .with_level(true)
    .with_target(false)
    .with_thread_ids(false)
    .with_thread_names(false)
    .with_writer(move || nb_writer.clone());

  let subscriber = Registry::default().with(filter).with(json_layer);

  // Ignore error if already set
  let _ = set_global_default(subscriber);

  info!(
    event = "logging_initialized",
    logs_path = %logs_path.display(),
    level = ?level,
    "logging initialized"
  );
}
