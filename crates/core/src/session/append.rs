//! Append Session (component design 4.5): drives one active writer
//! through the upgrade -> read loop -> cleanup state machine,
//! `tracing`-instrumented and `thiserror`-propagating throughout.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::{error, info, warn};

use crate::dispatch::Engine;
use crate::error::DispatchError;
use crate::path::{self, Intent};
use crate::registry::follower::Chunk;
use crate::registry::writer::WriterGuard;
use crate::store::{self, AppendHandle};
use crate::transport::{self, Frame, Transport};

/// Handle one `APPEND` request (4.5 steps 1-4): resolve, acquire the
/// writer slot, and open the file *before* ever upgrading, so a
/// rejected request never starts a session. The actual session loop
/// runs in a spawned task once the upgrade completes, since hyper
/// requires the `101` response to reach the connection driver first.
pub async fn handle(engine: Arc<Engine>, mut req: Request<Incoming>) -> Result<Response<Full<Bytes>>, DispatchError> {
  let resolved = path::resolve(&engine.config.storage_root, req.uri().path(), Intent::Write)?;
  let guard = engine.writer_registry.acquire(resolved.clone())?;
  let file = store::open_append_blocking(engine.store.clone(), resolved.clone()).await?;

  let response = transport::accept_response(&req)?;
  let on_upgrade = hyper::upgrade::on(&mut req);

  tokio::spawn(async move {
    match transport::complete_server_upgrade(on_upgrade).await {
      Ok(transport) => run(engine, resolved, guard, file, transport).await,
      Err(e) => warn!(event = "append_handshake_failed", error = %e, "append upgrade did not complete"),
    }
  });

  Ok(response)
}

async fn run(engine: Arc<Engine>, path: PathBuf, _guard: WriterGuard, mut file: AppendHandle, mut transport: Transport) {
  info!(event = "append_session_started", path = %path.display());
  let read_wait = engine.config.read_wait();

  loop {
    match transport.recv(read_wait).await {
      Ok(Some(Frame::Payload(payload))) => {
        if payload.is_empty() {
          // Appending the empty byte string is a no-op observable to
          // followers as no frame at all (9's resolved idempotence
          // policy): skip both the persist and the broadcast.
          continue;
        }
        file = match file.write_all_blocking(payload.clone()).await {
          Ok(file) => file,
          Err(e) => {
            error!(event = "append_persist_failed", path = %path.display(), error = %e, "failed to persist append");
            break;
          }
        };
        engine
          .follower_registry
          .broadcast(
            &path,
            Chunk {
              bytes: payload,
              offset_after: file.offset(),
            },
            engine.config.sink_send_timeout(),
          )
          .await;
      }
      Ok(Some(Frame::Ping | Frame::Pong)) => {
        // Either control frame from the appender resets the read
        // deadline; see DESIGN.md for why both are treated the same.
      }
      Ok(Some(Frame::Close)) | Ok(None) => break,
      Err(e) => {
        warn!(event = "append_transport_error", path = %path.display(), error = %e, "append session ending");
        break;
      }
    }
  }

  let _ = transport.close().await;
  info!(event = "append_session_ended", path = %path.display());
}
