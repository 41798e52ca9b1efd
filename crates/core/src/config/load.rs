use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::paths::config_path;
use super::types::{Config, LogLevel, Result};

/// Load configuration by merging the built-in defaults with an
/// optional config file and explicit overrides, in that precedence
/// order (lowest to highest).
pub fn load(config_file: Option<&Path>) -> Result<Config> {
  let mut cfg = Config::default();

  let file_path = config_file.map(Path::to_path_buf).or_else(config_path);
  if let Some(path) = file_path
    && let Ok(s) = fs::read_to_string(&path)
  {
    let partial: PartialConfig = toml::from_str(&s)?;
    cfg = partial.merge_over(cfg);
  }

  Ok(cfg)
}

#[cfg(test)]
pub(crate) fn load_from_path(path: &Path) -> Result<Config> {
  let mut cfg = Config::default();
  if let Ok(s) = fs::read_to_string(path) {
    let partial: PartialConfig = toml::from_str(&s)?;
    cfg = partial.merge_over(cfg);
  }
  Ok(cfg)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartialConfig {
  pub log_level: Option<LogLevel>,
  pub http_addr: Option<String>,
  pub storage_root: Option<std::path::PathBuf>,
  pub read_wait_secs: Option<u64>,
  pub write_wait_secs: Option<u64>,
  pub follow_keepalive_interval_secs: Option<u64>,
  pub follow_tick_interval_ms: Option<u64>,
  pub sink_capacity: Option<usize>,
  pub sink_send_timeout_ms: Option<u64>,
  pub log_file: Option<std::path::PathBuf>,
}

impl PartialConfig {
  fn merge_over(self, base: Config) -> Config {
    Config {
      log_level: self.log_level.unwrap_or(base.log_level),
      http_addr: self.http_addr.unwrap_or(base.http_addr),
      storage_root: self.storage_root.unwrap_or(base.storage_root),
      read_wait_secs: self.read_wait_secs.unwrap_or(base.read_wait_secs),
      write_wait_secs: self.write_wait_secs.unwrap_or(base.write_wait_secs),
      follow_keepalive_interval_secs: self
        .follow_keepalive_interval_secs
        .unwrap_or(base.follow_keepalive_interval_secs),
      follow_tick_interval_ms: self.follow_tick_interval_ms.unwrap_or(base.follow_tick_interval_ms),
      sink_capacity: self.sink_capacity.unwrap_or(base.sink_capacity),
      sink_send_timeout_ms: self.sink_send_timeout_ms.unwrap_or(base.sink_send_timeout_ms),
      log_file: self.log_file.or(base.log_file),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_correct() {
    let cfg = Config::default();
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.read_wait_secs, 25);
    assert_eq!(cfg.sink_send_timeout_ms, 250);
  }

  #[test]
  fn file_overrides_defaults() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("config.toml");
    fs::write(
      &path,
      r#"
log_level = "debug"
http_addr = "127.0.0.1:9000"
read_wait_secs = 10
"#,
    )
    .unwrap();

    let cfg = load_from_path(&path).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.http_addr, "127.0.0.1:9000");
    assert_eq!(cfg.read_wait_secs, 10);
    // untouched fields keep their default
    assert_eq!(cfg.write_wait_secs, Config::default().write_wait_secs);
  }

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = load_from_path(Path::new("/does/not/exist.toml")).unwrap();
    assert_eq!(cfg, Config::default());
  }
}
