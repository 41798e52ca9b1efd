//! Follower Registry (component design 4.4): per-path sets of bounded
//! follower sinks, plus the snapshot-under-lock / send-outside-lock
//! broadcast discipline required by the concurrency model (5).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

/// One chunk broadcast to followers, tagged with the cumulative file
/// offset immediately after the append that produced it. The tag is
/// what lets a Follow Session dedupe the catch-up/tail boundary (4.6).
#[derive(Debug, Clone)]
pub struct Chunk {
  pub bytes: Bytes,
  pub offset_after: u64,
}

type SinkId = u64;

struct Sink {
  id: SinkId,
  tx: mpsc::Sender<Chunk>,
}

#[derive(Default)]
struct PathFollowers {
  sinks: Vec<Sink>,
}

#[derive(Default)]
pub struct FollowerRegistry {
  by_path: Mutex<HashMap<PathBuf, PathFollowers>>,
  next_id: AtomicU64,
}

/// Handle returned to a newly registered follower; removes itself from
/// the registry on drop so a panicking or short-circuited Follow
/// Session can never leave a stale sink behind. Holds an owned `Arc`
/// for the same reason `WriterGuard` does: it must be movable into a
/// spawned session task without a borrowed lifetime.
pub struct FollowerHandle {
  registry: Arc<FollowerRegistry>,
  path: PathBuf,
  id: SinkId,
  pub rx: mpsc::Receiver<Chunk>,
}

impl Drop for FollowerHandle {
  fn drop(&mut self) {
    self.registry.remove(&self.path, self.id);
  }
}

impl FollowerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a new follower sink for `path` with the given bounded
  /// channel capacity. Returns the handle the Follow Session owns.
  pub fn add(self: &Arc<Self>, path: PathBuf, capacity: usize) -> FollowerHandle {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let mut by_path = self.by_path.lock().expect("follower registry poisoned");
    by_path.entry(path.clone()).or_default().sinks.push(Sink { id, tx });
    drop(by_path);
    FollowerHandle {
      registry: Arc::clone(self),
      path,
      id,
      rx,
    }
  }

  fn remove(&self, path: &PathBuf, id: SinkId) {
    let mut by_path = self.by_path.lock().expect("follower registry poisoned");
    if let Some(entry) = by_path.get_mut(path) {
      entry.sinks.retain(|s| s.id != id);
      if entry.sinks.is_empty() {
        by_path.remove(path);
      }
    }
  }

  /// A shallow snapshot of the current sinks for `path`, taken under
  /// the lock and sent to outside of it (5's "no I/O under the lock").
  fn snapshot(&self, path: &PathBuf) -> Vec<(SinkId, mpsc::Sender<Chunk>)> {
    let by_path = self.by_path.lock().expect("follower registry poisoned");
    by_path
      .get(path)
      .map(|entry| entry.sinks.iter().map(|s| (s.id, s.tx.clone())).collect())
      .unwrap_or_default()
  }

  /// Broadcast one chunk to every follower currently registered for
  /// `path`. Sinks that fail to accept the chunk within `send_timeout`
  /// are evicted (the slow-follower policy chosen in 5/9): the sender
  /// is dropped, which the Follow Session observes as channel closure.
  pub async fn broadcast(&self, path: &PathBuf, chunk: Chunk, send_timeout: std::time::Duration) {
    for (id, tx) in self.snapshot(path) {
      match tokio::time::timeout(send_timeout, tx.send(chunk.clone())).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => {
          // receiver already gone; handle's Drop will clean up the entry
        }
        Err(_timed_out) => {
          tracing::warn!(event = "follower_evicted", sink_id = id, "follower too slow, evicting");
          self.remove(path, id);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn broadcast_delivers_to_registered_followers() {
    let reg = Arc::new(FollowerRegistry::new());
    let path = PathBuf::from("/s");
    let mut handle = reg.add(path.clone(), 8);

    reg
      .broadcast(
        &path,
        Chunk {
          bytes: Bytes::from_static(b"abc"),
          offset_after: 3,
        },
        Duration::from_millis(100),
      )
      .await;

    let chunk = handle.rx.recv().await.unwrap();
    assert_eq!(&chunk.bytes[..], b"abc");
    assert_eq!(chunk.offset_after, 3);
  }

  #[tokio::test]
  async fn drop_removes_the_sink() {
    let reg = Arc::new(FollowerRegistry::new());
    let path = PathBuf::from("/s");
    let handle = reg.add(path.clone(), 8);
    assert_eq!(reg.snapshot(&path).len(), 1);
    drop(handle);
    assert_eq!(reg.snapshot(&path).len(), 0);
  }

  #[tokio::test]
  async fn slow_follower_is_evicted_not_blocking() {
    let reg = Arc::new(FollowerRegistry::new());
    let path = PathBuf::from("/s");
    let handle = reg.add(path.clone(), 1);
    // fill the one slot without draining it
    reg
      .broadcast(
        &path,
        Chunk {
          bytes: Bytes::from_static(b"a"),
          offset_after: 1,
        },
        Duration::from_millis(20),
      )
      .await;
    // second send times out and evicts
    reg
      .broadcast(
        &path,
        Chunk {
          bytes: Bytes::from_static(b"b"),
          offset_after: 2,
        },
        Duration::from_millis(20),
      )
      .await;
    assert_eq!(reg.snapshot(&path).len(), 0);
    drop(handle);
  }
}
