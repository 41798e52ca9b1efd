use std::env;
use std::path::PathBuf;

/// Location of the config file: `HTTPFSTREAM_CONFIG` if set, otherwise
/// `~/.config/httpfstream/config.toml` via `dirs::config_dir`.
pub fn config_path() -> Option<PathBuf> {
  if let Ok(p) = env::var("HTTPFSTREAM_CONFIG") {
    return Some(PathBuf::from(p));
  }
  dirs::config_dir().map(|p| p.join("httpfstream").join("config.toml"))
}
