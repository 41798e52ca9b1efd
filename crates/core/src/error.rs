//! Typed error boundaries for each component, composed into a single
//! type the dispatcher can map to an HTTP status deterministically.

use thiserror::Error;

use crate::path::ResolveError;
use crate::registry::writer::Conflict;
use crate::store::StoreError;
use crate::transport::HandshakeError;

/// Errors the request dispatcher can turn into a pre-upgrade HTTP response.
#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("path rejected: {0}")]
  Path(#[from] ResolveError),

  #[error("writer conflict")]
  WriterConflict(#[from] Conflict),

  #[error("not found")]
  NotFound,

  #[error("store error: {0}")]
  Store(std::io::Error),

  #[error("unsupported method")]
  UnsupportedMethod,

  #[error("handshake failed: {0}")]
  Handshake(#[from] HandshakeError),
}

impl From<StoreError> for DispatchError {
  /// `StoreError::NotFound` surfaces as 404 (e.g. `FOLLOW` of a
  /// missing, non-active path); every other store failure is an
  /// internal 500, per the error table in 7.
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound => DispatchError::NotFound,
      StoreError::Io(e) => DispatchError::Store(e),
    }
  }
}

impl DispatchError {
  /// The HTTP status this error should be reported as, per the
  /// error table in the design notes.
  pub fn status(&self) -> hyper::StatusCode {
    use hyper::StatusCode;
    match self {
      DispatchError::Path(_) => StatusCode::BAD_REQUEST,
      DispatchError::WriterConflict(_) => StatusCode::FORBIDDEN,
      DispatchError::NotFound => StatusCode::NOT_FOUND,
      DispatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      DispatchError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
      DispatchError::Handshake(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}
