//! Maps a request path to a safe storage key rooted under a configured
//! base directory (component design 4.1).

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
  #[error("path escapes storage root")]
  Escapes,
  #[error("write path must not end with '/'")]
  TrailingSlash,
}

/// Whether the resolved key is about to be used for a write (append)
/// or a read (follow / static serve). Write paths reject a trailing
/// slash; read paths do not need to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
  Read,
  Write,
}

/// Canonicalize `request_path` against `root` and return the resulting
/// storage key. Collapses `.`/`..` segments purely lexically (no
/// filesystem access, no symlink following) and rejects any path that
/// would land outside `root`.
pub fn resolve(root: &Path, request_path: &str, intent: Intent) -> Result<PathBuf, ResolveError> {
  if intent == Intent::Write && request_path.ends_with('/') {
    return Err(ResolveError::TrailingSlash);
  }

  let mut stack: Vec<&str> = Vec::new();
  for component in Path::new(request_path).components() {
    match component {
      Component::Normal(part) => stack.push(part.to_str().unwrap_or_default()),
      Component::ParentDir => {
        if stack.pop().is_none() {
          return Err(ResolveError::Escapes);
        }
      }
      Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
    }
  }

  let mut resolved = root.to_path_buf();
  for part in stack {
    resolved.push(part);
  }
  Ok(resolved)
}
