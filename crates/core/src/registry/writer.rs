//! Writer Registry (component design 4.3): at most one active
//! appender per path, O(1) mutex-guarded set.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a writer is already active for this path")]
pub struct Conflict;

#[derive(Debug, Default)]
pub struct WriterRegistry {
  active: Mutex<HashSet<PathBuf>>,
}

/// RAII guard releasing the writer slot on drop (covers both normal
/// and abnormal Append Session termination, per 4.3's lifecycle note).
/// Holds an owned `Arc` rather than a borrow so it can be moved into a
/// spawned session task without tying that task's future to a
/// borrowed lifetime.
pub struct WriterGuard {
  registry: Arc<WriterRegistry>,
  path: PathBuf,
}

impl Drop for WriterGuard {
  fn drop(&mut self) {
    self.registry.release(&self.path);
  }
}

impl WriterRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Attempt to acquire the writer slot for `path`. On success, the
  /// returned guard releases it when dropped.
  pub fn acquire(self: &Arc<Self>, path: PathBuf) -> Result<WriterGuard, Conflict> {
    let mut active = self.active.lock().expect("writer registry poisoned");
    if !active.insert(path.clone()) {
      return Err(Conflict);
    }
    drop(active);
    Ok(WriterGuard {
      registry: Arc::clone(self),
      path,
    })
  }

  fn release(&self, path: &PathBuf) {
    self.active.lock().expect("writer registry poisoned").remove(path);
  }

  pub fn is_active(&self, path: &PathBuf) -> bool {
    self.active.lock().expect("writer registry poisoned").contains(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_acquire_conflicts() {
    let reg = Arc::new(WriterRegistry::new());
    let p = PathBuf::from("/a");
    let guard = reg.acquire(p.clone()).unwrap();
    assert!(reg.is_active(&p));
    assert!(reg.acquire(p.clone()).is_err());
    drop(guard);
    assert!(!reg.is_active(&p));
  }

  #[test]
  fn release_allows_reacquire() {
    let reg = Arc::new(WriterRegistry::new());
    let p = PathBuf::from("/a");
    let g1 = reg.acquire(p.clone()).unwrap();
    drop(g1);
    assert!(reg.acquire(p.clone()).is_ok());
  }

  #[test]
  fn independent_paths_do_not_conflict() {
    let reg = Arc::new(WriterRegistry::new());
    let _g1 = reg.acquire(PathBuf::from("/a")).unwrap();
    assert!(reg.acquire(PathBuf::from("/b")).is_ok());
  }
}
