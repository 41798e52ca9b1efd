use std::path::PathBuf;
use std::time::Duration;

/// Temporary storage root for integration tests: a directory that
/// outlives the test and a path to hand to `FsStore`/`Config::storage_root`.
pub struct TempStore {
  pub root: tempfile::TempDir,
}

impl Default for TempStore {
  fn default() -> Self {
    Self::new()
  }
}

impl TempStore {
  pub fn new() -> Self {
    let root = tempfile::tempdir().expect("tempdir");
    Self { root }
  }

  pub fn path(&self) -> PathBuf {
    self.root.path().to_path_buf()
  }
}

/// Poll a condition repeatedly until it returns true or times out.
/// Returns true if condition met, false on timeout.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
  F: FnMut() -> Fut,
  Fut: std::future::Future<Output = bool>,
{
  use tokio::time::{Instant, sleep};
  let start = Instant::now();
  loop {
    if check().await {
      return true;
    }
    if start.elapsed() >= timeout {
      return false;
    }
    sleep(interval).await;
  }
}
