use std::path::PathBuf;

use clap::Parser;

/// `server`: binds the HTTP(S) streaming fan-out engine (6.2).
#[derive(Debug, Parser)]
#[command(version, about = "httpfstream server", long_about = None, bin_name = "server")]
pub struct ServerArgs {
  /// Address to bind to.
  #[arg(long = "http")]
  pub http: Option<String>,
  /// Storage root directory.
  #[arg(long = "root")]
  pub root: Option<PathBuf>,
  /// Optional layered TOML config file (10.3).
  #[arg(long = "config")]
  pub config: Option<PathBuf>,
  /// Append/follow read deadline override, in seconds.
  #[arg(long = "read-wait-secs")]
  pub read_wait_secs: Option<u64>,
  /// Transport write deadline override, in seconds.
  #[arg(long = "write-wait-secs")]
  pub write_wait_secs: Option<u64>,
  /// Follow keepalive ping interval override, in seconds.
  #[arg(long = "follow-keepalive-interval-secs")]
  pub follow_keepalive_interval_secs: Option<u64>,
  /// Log as JSON to this file instead of stderr (10.1); for
  /// long-running deployments where stderr is not collected.
  #[arg(long = "log-file")]
  pub log_file: Option<PathBuf>,
  /// Verbose (debug-level) logging.
  #[arg(short = 'v', long = "verbose")]
  pub verbose: bool,
}

/// `append`: reads bytes from standard input and streams them as
/// appends to the given URL.
#[derive(Debug, Parser)]
#[command(version, about = "httpfstream append", long_about = None, bin_name = "append")]
pub struct AppendArgs {
  /// Target URL, e.g. `http://127.0.0.1:8080/path/to/file`.
  pub url: String,
  /// Verbose (debug-level) logging.
  #[arg(short = 'v', long = "verbose")]
  pub verbose: bool,
}

/// `follow`: writes received bytes to standard output until
/// end-of-stream.
#[derive(Debug, Parser)]
#[command(version, about = "httpfstream follow", long_about = None, bin_name = "follow")]
pub struct FollowArgs {
  /// Target URL, e.g. `http://127.0.0.1:8080/path/to/file`.
  pub url: String,
  /// Verbose (debug-level) logging.
  #[arg(short = 'v', long = "verbose")]
  pub verbose: bool,
}
