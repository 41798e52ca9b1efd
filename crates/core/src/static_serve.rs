//! Plain one-shot download fallback (component design 4.6's dispatch
//! rule, wire protocol 6.1): serves a path's complete current
//! contents as a normal `200` response body when no writer is active.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::store::{self, Store, StoreError};

const READ_CHUNK: usize = 64 * 1024;

/// Read the whole file at `path` and return it as a response body.
/// A missing file surfaces as [`StoreError::NotFound`] so the caller
/// can map it to 404 per the error table in 7.
pub async fn serve(store: Arc<dyn Store>, path: PathBuf) -> Result<Response<Full<Bytes>>, StoreError> {
  let mut handle = store::open_read_blocking(store, path).await?;
  let mut body = Vec::new();
  loop {
    let (next, buf, n) = handle.read_at_most_blocking(READ_CHUNK).await?;
    handle = next;
    if n == 0 {
      break;
    }
    body.extend_from_slice(&buf[..n]);
  }
  Ok(
    Response::builder()
      .status(StatusCode::OK)
      .header(hyper::header::CONTENT_LENGTH, body.len())
      .body(Full::new(Bytes::from(body)))
      .expect("static response is well-formed"),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::FsStore;
  use http_body_util::BodyExt;

  #[tokio::test]
  async fn serves_full_file_contents() {
    let td = tempfile::tempdir().unwrap();
    let file = td.path().join("foo1");
    std::fs::write(&file, b"bar").unwrap();
    let store: Arc<dyn Store> = Arc::new(FsStore::new(td.path()));

    let resp = serve(store, file).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"bar");
  }

  #[tokio::test]
  async fn missing_file_is_not_found() {
    let td = tempfile::tempdir().unwrap();
    let store: Arc<dyn Store> = Arc::new(FsStore::new(td.path()));
    let err = serve(store, td.path().join("nope")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
  }
}
