//! Store Adapter (component design 4.2): a narrow, swappable interface
//! over a hierarchical byte store. The shipped implementation wraps
//! `std::fs`, running every blocking call through `spawn_blocking` so
//! it never stalls the async runtime.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("not found")]
  NotFound,
  #[error("io: {0}")]
  Io(#[from] io::Error),
}

/// Current length and existence of a stored path.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
  pub len: u64,
}

/// A handle for appending bytes to a path; flushes on every write so a
/// concurrent reader observes the new length promptly.
pub struct AppendHandle {
  file: File,
  offset: u64,
}

impl AppendHandle {
  pub fn offset(&self) -> u64 {
    self.offset
  }

  pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
    self.file.write_all(bytes)?;
    self.file.flush()?;
    self.offset += bytes.len() as u64;
    Ok(())
  }

  /// Append `bytes` and hand the handle back, off the async runtime's
  /// worker threads (5's "File I/O is synchronous" run through a
  /// blocking pool). Consumes and returns `self` so callers can keep
  /// looping without holding a handle across an `.await` that isn't
  /// this one.
  pub async fn write_all_blocking(mut self, bytes: bytes::Bytes) -> Result<Self, StoreError> {
    tokio::task::spawn_blocking(move || {
      self.write_all(&bytes)?;
      Ok(self)
    })
    .await
    .expect("append blocking task panicked")
  }
}

/// A handle for reading bytes from a path starting at an arbitrary
/// offset, used by both the catch-up phase and the static fallback.
pub struct ReadHandle {
  file: File,
}

impl ReadHandle {
  pub fn read_at_most(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
    Ok(self.file.read(buf)?)
  }

  pub fn seek_to(&mut self, offset: u64) -> Result<(), StoreError> {
    self.file.seek(SeekFrom::Start(offset))?;
    Ok(())
  }

  /// Read up to `buf_len` bytes, off the blocking pool. Returns the
  /// handle back alongside the bytes actually read so the caller can
  /// keep looping (catch-up phase, static fallback).
  pub async fn read_at_most_blocking(mut self, buf_len: usize) -> Result<(Self, Vec<u8>, usize), StoreError> {
    tokio::task::spawn_blocking(move || {
      let mut buf = vec![0u8; buf_len];
      let n = self.read_at_most(&mut buf)?;
      Ok((self, buf, n))
    })
    .await
    .expect("read blocking task panicked")
  }
}

/// Narrow interface the engine needs from a byte store (component
/// design 4.2). Kept as a trait so tests can substitute an in-memory
/// adapter instead of touching the filesystem.
pub trait Store: Send + Sync + 'static {
  fn open_read(&self, path: &Path) -> Result<ReadHandle, StoreError>;
  fn open_append(&self, path: &Path) -> Result<AppendHandle, StoreError>;
  fn stat(&self, path: &Path) -> Result<Stat, StoreError>;
}

/// Filesystem-backed store rooted at a configured directory.
#[derive(Debug, Clone)]
pub struct FsStore {
  root: PathBuf,
}

impl FsStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl Store for FsStore {
  fn open_read(&self, path: &Path) -> Result<ReadHandle, StoreError> {
    match File::open(path) {
      Ok(file) => Ok(ReadHandle { file }),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
      Err(e) => Err(StoreError::Io(e)),
    }
  }

  fn open_append(&self, path: &Path) -> Result<AppendHandle, StoreError> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let offset = file.metadata()?.len();
    Ok(AppendHandle { file, offset })
  }

  fn stat(&self, path: &Path) -> Result<Stat, StoreError> {
    match fs::metadata(path) {
      Ok(meta) => Ok(Stat { len: meta.len() }),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
      Err(e) => Err(StoreError::Io(e)),
    }
  }
}

/// Open `path` for reading off the blocking pool, given only a shared
/// `dyn Store` (the common case once a session has resolved a path but
/// holds no handle yet).
pub async fn open_read_blocking(store: Arc<dyn Store>, path: PathBuf) -> Result<ReadHandle, StoreError> {
  tokio::task::spawn_blocking(move || store.open_read(&path))
    .await
    .expect("open_read blocking task panicked")
}

/// Open `path` for append off the blocking pool.
pub async fn open_append_blocking(store: Arc<dyn Store>, path: PathBuf) -> Result<AppendHandle, StoreError> {
  tokio::task::spawn_blocking(move || store.open_append(&path))
    .await
    .expect("open_append blocking task panicked")
}

/// Stat `path` off the blocking pool; used by the Follow Session to
/// capture the catch-up/tail watermark (4.4/4.6).
pub async fn stat_blocking(store: Arc<dyn Store>, path: PathBuf) -> Result<Stat, StoreError> {
  tokio::task::spawn_blocking(move || store.stat(&path))
    .await
    .expect("stat blocking task panicked")
}
