//! Client library (system overview 10): the `follow()`/`append()`
//! entry points used by the `follow`/`append` CLI binaries (6.2), and
//! usable as a library by any other Rust program. Dials, then branches
//! on response status before reading frames, per the upgrade-then-
//! fallback policy in design notes 9.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::warn;

use crate::transport::{self, HandshakeError, Transport, TransportError};

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("connect failed: {0}")]
  Connect(#[from] std::io::Error),
  #[error("http error: {0}")]
  Http(#[from] hyper::Error),
  #[error("request build failed: {0}")]
  Build(#[from] hyper::http::Error),
  #[error("handshake failed: {0}")]
  Handshake(#[from] HandshakeError),
  #[error("transport error: {0}")]
  Transport(#[from] TransportError),
  #[error("path not found")]
  NotFound,
  #[error("a writer is already active for this path")]
  WriterConflict,
  #[error("unexpected response status {0}")]
  UnexpectedStatus(StatusCode),
  #[error("invalid address or path")]
  InvalidUri,
}

fn typed_status_error(status: StatusCode) -> ClientError {
  match status {
    StatusCode::NOT_FOUND => ClientError::NotFound,
    StatusCode::FORBIDDEN => ClientError::WriterConflict,
    other => ClientError::UnexpectedStatus(other),
  }
}

type SendRequest = hyper::client::conn::http1::SendRequest<Empty<Bytes>>;

/// Dial `addr`, send a `GET` for `path` carrying the given verb and
/// upgrade headers, and return the response. The connection-driving
/// future is spawned with `.with_upgrades()` so a later
/// `hyper::upgrade::on` on the response can still complete — hyper's
/// documented pattern for a client that may get a `101`.
async fn dial(addr: &str, path: &str, verb: &str) -> Result<hyper::Response<hyper::body::Incoming>, ClientError> {
  let stream = TcpStream::connect(addr).await?;
  let io = TokioIo::new(stream);
  let (mut sender, conn): (SendRequest, _) = hyper::client::conn::http1::handshake(io).await?;
  tokio::spawn(async move {
    if let Err(e) = conn.with_upgrades().await {
      warn!(event = "client_connection_error", error = %e, "client connection ended with error");
    }
  });

  let uri: Uri = format!("http://{addr}{path}")
    .parse()
    .map_err(|_| ClientError::InvalidUri)?;
  let mut builder = Request::builder().method("GET").uri(uri).header("Host", addr).header("X-Verb", verb);
  for (name, value) in transport::client_upgrade_headers() {
    builder = builder.header(name, value);
  }
  let req = builder.body(Empty::new())?;
  Ok(sender.send_request(req).await?)
}

/// Handle returned by [`append`]: one payload frame per [`write`](AppendWriter::write) call.
pub struct AppendWriter {
  transport: Transport,
  write_wait: Duration,
}

impl AppendWriter {
  pub async fn write(&mut self, bytes: Bytes) -> Result<(), ClientError> {
    Ok(self.transport.send_payload(bytes, self.write_wait).await?)
  }

  pub async fn close(mut self) -> Result<(), ClientError> {
    Ok(self.transport.close().await?)
  }
}

/// Start appending to `path`. The caller drives `write()` for each
/// chunk it wants persisted and broadcast; the server only sees a
/// conflict (409/403) or not-found-class error before the upgrade,
/// matching 7's "client-visible failure" rule.
pub async fn append(addr: &str, path: &str, write_wait: Duration) -> Result<AppendWriter, ClientError> {
  let response = dial(addr, path, "APPEND").await?;
  if response.status() != StatusCode::SWITCHING_PROTOCOLS {
    return Err(typed_status_error(response.status()));
  }
  let on_upgrade = hyper::upgrade::on(response);
  let transport = transport::complete_client_upgrade(on_upgrade).await?;
  Ok(AppendWriter { transport, write_wait })
}

/// The two response shapes a `FOLLOW` request can come back as (9's
/// "two response shapes for one endpoint" note): a live upgraded
/// transport to read frames from, or the complete body of a one-shot
/// download when no writer was active at attach time.
pub enum FollowBody {
  Live(Transport),
  Static(Bytes),
}

/// Follow `path`. The caller must branch on the returned variant
/// before attempting to read frames — never assume the upgrade
/// succeeded, per 9's resolved open question.
pub async fn follow(addr: &str, path: &str) -> Result<FollowBody, ClientError> {
  let response = dial(addr, path, "FOLLOW").await?;
  match response.status() {
    StatusCode::SWITCHING_PROTOCOLS => {
      let on_upgrade = hyper::upgrade::on(response);
      let transport = transport::complete_client_upgrade(on_upgrade).await?;
      Ok(FollowBody::Live(transport))
    }
    StatusCode::OK => {
      let body = response.into_body().collect().await?.to_bytes();
      Ok(FollowBody::Static(body))
    }
    other => Err(typed_status_error(other)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_errors_are_distinguished() {
    assert!(matches!(typed_status_error(StatusCode::NOT_FOUND), ClientError::NotFound));
    assert!(matches!(typed_status_error(StatusCode::FORBIDDEN), ClientError::WriterConflict));
    assert!(matches!(
      typed_status_error(StatusCode::INTERNAL_SERVER_ERROR),
      ClientError::UnexpectedStatus(_)
    ));
  }
}
