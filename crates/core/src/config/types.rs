use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log level for the server and CLI binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Off,
  Warn,
  #[default]
  Info,
  Debug,
  Trace,
}

/// Effective configuration after merging defaults, an optional config
/// file, and CLI overrides (10.3 of the expanded spec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  pub log_level: LogLevel,
  /// Address the `server` binary binds to.
  pub http_addr: String,
  /// Storage root the Store Adapter is rooted at.
  pub storage_root: PathBuf,
  /// Append read deadline in seconds (resets on every frame or
  /// ping/pong); design notes 9.
  pub read_wait_secs: u64,
  /// Transport write deadline in seconds.
  pub write_wait_secs: u64,
  /// Interval between keepalive pings a Follow Session sends its
  /// client, in seconds.
  pub follow_keepalive_interval_secs: u64,
  /// Tick interval the Follow Session's tail loop runs at, in
  /// milliseconds.
  pub follow_tick_interval_ms: u64,
  /// Bounded channel capacity per follower sink.
  pub sink_capacity: usize,
  /// Timeout before a slow follower is evicted, in milliseconds.
  pub sink_send_timeout_ms: u64,
  /// When set, the `server` binary logs JSON lines to this file via
  /// `logging::init` instead of to stderr, for long-running
  /// deployments where stderr is not collected.
  pub log_file: Option<PathBuf>,
}

impl Config {
  pub fn read_wait(&self) -> Duration {
    Duration::from_secs(self.read_wait_secs)
  }
  pub fn write_wait(&self) -> Duration {
    Duration::from_secs(self.write_wait_secs)
  }
  pub fn follow_keepalive_interval(&self) -> Duration {
    Duration::from_secs(self.follow_keepalive_interval_secs)
  }
  pub fn follow_tick_interval(&self) -> Duration {
    Duration::from_millis(self.follow_tick_interval_ms)
  }
  pub fn sink_send_timeout(&self) -> Duration {
    Duration::from_millis(self.sink_send_timeout_ms)
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      log_level: LogLevel::Info,
      http_addr: "0.0.0.0:8080".to_string(),
      storage_root: PathBuf::from("/tmp/httpfstream"),
      read_wait_secs: 25,
      write_wait_secs: 5,
      follow_keepalive_interval_secs: 3,
      follow_tick_interval_ms: 50,
      sink_capacity: 64,
      sink_send_timeout_ms: 250,
      log_file: None,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
