//! Frame Transport (component design 4; wire protocol 6.1): a
//! message-framed, full-duplex channel carried over a WebSocket
//! upgrade negotiated on top of the same HTTP/1.1 request/response the
//! dispatcher already handles. Both accept and dial sides build the
//! handshake directly on `hyper::upgrade` (rather than a ready-made
//! WebSocket server crate) precisely so the dispatcher can inspect the
//! response status before committing to the upgrade — required for
//! `FOLLOW`'s upgrade-then-fallback behavior (design notes, 9).
//! `tokio-tungstenite` provides the post-upgrade frame codec (binary
//! payload frames, ping/pong as liveness).

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use hyper::body::Incoming;
use hyper::header::{CONNECTION, UPGRADE};
use hyper::upgrade::Upgraded;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::{Role, WebSocketConfig};

#[derive(Debug, Error)]
pub enum HandshakeError {
  #[error("request did not ask for a websocket upgrade")]
  NotAnUpgradeRequest,
  #[error("missing or malformed Sec-WebSocket-Key")]
  MissingKey,
  #[error("upgrade future failed: {0}")]
  Upgrade(#[from] hyper::Error),
  #[error("unexpected response status {0}")]
  UnexpectedStatus(StatusCode),
  #[error("http error: {0}")]
  Http(#[from] hyper::http::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("websocket error: {0}")]
  WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
  #[error("deadline exceeded")]
  Timeout,
  #[error("connection closed")]
  Closed,
}

/// One message on the transport. Text frames are not part of this
/// protocol and are ignored by `recv`.
#[derive(Debug)]
pub enum Frame {
  Payload(Bytes),
  Ping,
  Pong,
  Close,
}

/// A framed bidirectional channel, used identically by both the
/// append and follow sessions regardless of which side dialed.
pub struct Transport {
  ws: WebSocketStream<TokioIo<Upgraded>>,
}

impl Transport {
  fn new(ws: WebSocketStream<TokioIo<Upgraded>>) -> Self {
    Self { ws }
  }

  /// Read the next frame, or `None` on a clean end of stream. Bounded
  /// by `deadline`, matching the per-frame read deadlines in 5.
  pub async fn recv(&mut self, deadline: Duration) -> Result<Option<Frame>, TransportError> {
    let next = tokio::time::timeout(deadline, self.ws.next())
      .await
      .map_err(|_| TransportError::Timeout)?;
    match next {
      None => Ok(None),
      Some(Ok(Message::Binary(bytes))) => Ok(Some(Frame::Payload(Bytes::from(bytes)))),
      Some(Ok(Message::Ping(_))) => Ok(Some(Frame::Ping)),
      Some(Ok(Message::Pong(_))) => Ok(Some(Frame::Pong)),
      Some(Ok(Message::Close(_))) => Ok(Some(Frame::Close)),
      Some(Ok(Message::Text(_) | Message::Frame(_))) => Ok(None),
      Some(Err(e)) => Err(e.into()),
    }
  }

  pub async fn send_payload(&mut self, bytes: Bytes, deadline: Duration) -> Result<(), TransportError> {
    tokio::time::timeout(deadline, self.ws.send(Message::Binary(bytes.to_vec())))
      .await
      .map_err(|_| TransportError::Timeout)??;
    Ok(())
  }

  pub async fn send_ping(&mut self, deadline: Duration) -> Result<(), TransportError> {
    tokio::time::timeout(deadline, self.ws.send(Message::Ping(Vec::new())))
      .await
      .map_err(|_| TransportError::Timeout)??;
    Ok(())
  }

  pub async fn close(&mut self) -> Result<(), TransportError> {
    let _ = self.ws.close(None).await;
    Ok(())
  }
}

/// True if the request carries the headers needed for a WebSocket
/// upgrade (`Upgrade: websocket`, `Connection: Upgrade`).
pub fn wants_upgrade(req: &Request<Incoming>) -> bool {
  let upgrade_hdr = req
    .headers()
    .get(UPGRADE)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.eq_ignore_ascii_case("websocket"))
    .unwrap_or(false);
  let connection_hdr = req
    .headers()
    .get(CONNECTION)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.to_ascii_lowercase().contains("upgrade"))
    .unwrap_or(false);
  upgrade_hdr && connection_hdr
}

/// Build the `101 Switching Protocols` response for an upgrade
/// request, without yet awaiting the upgrade itself. Callers must
/// call [`hyper::upgrade::on`] on the original request *before*
/// returning this response to the connection driver.
pub fn accept_response<B>(req: &Request<B>) -> Result<Response<http_body_util::Full<Bytes>>, HandshakeError> {
  let key = req
    .headers()
    .get("sec-websocket-key")
    .ok_or(HandshakeError::MissingKey)?;
  if !wants_upgrade_generic(req) {
    return Err(HandshakeError::NotAnUpgradeRequest);
  }
  let accept = derive_accept_key(key.as_bytes());
  Ok(
    Response::builder()
      .status(StatusCode::SWITCHING_PROTOCOLS)
      .header(CONNECTION, "Upgrade")
      .header(UPGRADE, "websocket")
      .header("Sec-WebSocket-Accept", accept)
      .body(http_body_util::Full::new(Bytes::new()))?,
  )
}

fn wants_upgrade_generic<B>(req: &Request<B>) -> bool {
  let upgrade_hdr = req
    .headers()
    .get(UPGRADE)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.eq_ignore_ascii_case("websocket"))
    .unwrap_or(false);
  let connection_hdr = req
    .headers()
    .get(CONNECTION)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.to_ascii_lowercase().contains("upgrade"))
    .unwrap_or(false);
  upgrade_hdr && connection_hdr
}

/// Complete the server side of the handshake once the 101 response
/// has been handed to the connection driver: await the upgrade and
/// wrap the resulting IO in the frame codec.
pub async fn complete_server_upgrade(on_upgrade: hyper::upgrade::OnUpgrade) -> Result<Transport, HandshakeError> {
  let upgraded = on_upgrade.await?;
  let io = TokioIo::new(upgraded);
  let ws = WebSocketStream::from_raw_socket(io, Role::Server, Some(ws_config())).await;
  Ok(Transport::new(ws))
}

/// Complete the client side of the handshake after receiving a 101
/// response to an upgrade request.
pub async fn complete_client_upgrade(on_upgrade: hyper::upgrade::OnUpgrade) -> Result<Transport, HandshakeError> {
  let upgraded = on_upgrade.await?;
  let io = TokioIo::new(upgraded);
  let ws = WebSocketStream::from_raw_socket(io, Role::Client, Some(ws_config())).await;
  Ok(Transport::new(ws))
}

fn ws_config() -> WebSocketConfig {
  WebSocketConfig::default()
}

/// Headers a client dials with to request the upgrade (used by both
/// `APPEND` and `FOLLOW`; distinguished by the `X-Verb` header).
pub fn client_upgrade_headers() -> Vec<(&'static str, String)> {
  vec![
    (CONNECTION.as_str(), "Upgrade".to_string()),
    (UPGRADE.as_str(), "websocket".to_string()),
    ("Sec-WebSocket-Version", "13".to_string()),
    (
      "Sec-WebSocket-Key",
      tokio_tungstenite::tungstenite::handshake::client::generate_key(),
    ),
  ]
}
