//! Follow Session (component design 4.6): decides between a one-shot
//! static download and a live catch-up-then-tail stream at attach
//! time, and resolves the catch-up/tail boundary race (design notes,
//! 9) with a file-length watermark captured at sink-registration time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::{info, warn};

use crate::dispatch::Engine;
use crate::error::DispatchError;
use crate::path::{self, Intent};
use crate::registry::follower::FollowerHandle;
use crate::{static_serve, store};
use crate::transport::{self, Transport};

const CATCHUP_CHUNK: usize = 64 * 1024;

/// Handle one `FOLLOW` request. Dispatch rule (4.6): if no writer is
/// active, serve the current contents as a plain response and return
/// — no upgrade attempted at all.
pub async fn handle(engine: Arc<Engine>, mut req: Request<Incoming>) -> Result<Response<Full<Bytes>>, DispatchError> {
  let resolved = path::resolve(&engine.config.storage_root, req.uri().path(), Intent::Read)?;

  if !engine.writer_registry.is_active(&resolved) {
    return static_serve::serve(engine.store.clone(), resolved).await.map_err(DispatchError::from);
  }

  // A sink is registered, then the file is stat'd for the watermark —
  // in that order, so any append broadcast between the two calls is
  // already reflected in the stat (4.4/9: no I/O under the registry
  // lock, the stat happens right after it is released).
  let follower = engine.follower_registry.add(resolved.clone(), engine.config.sink_capacity);
  let watermark = match store::stat_blocking(engine.store.clone(), resolved.clone()).await {
    Ok(stat) => stat.len,
    Err(e) => return Err(e.into()),
  };

  let response = match transport::accept_response(&req) {
    Ok(response) => response,
    Err(_) => {
      // Protocol handshake mismatch: fall back to static serving
      // rather than surfacing an error (7's error table). `follower`
      // drops here, removing the sink we just registered.
      return static_serve::serve(engine.store.clone(), resolved).await.map_err(DispatchError::from);
    }
  };
  let on_upgrade = hyper::upgrade::on(&mut req);

  tokio::spawn(async move {
    match transport::complete_server_upgrade(on_upgrade).await {
      Ok(transport) => run(engine, resolved, follower, watermark, transport).await,
      Err(e) => warn!(event = "follow_handshake_failed", error = %e, "follow upgrade did not complete"),
    }
  });

  Ok(response)
}

async fn run(engine: Arc<Engine>, path: PathBuf, mut follower: FollowerHandle, watermark: u64, mut transport: Transport) {
  info!(event = "follow_session_started", path = %path.display(), watermark);
  let write_wait = engine.config.write_wait();

  if !catch_up(&engine, &path, watermark, &mut transport, write_wait).await {
    let _ = transport.close().await;
    return;
  }

  let mut ticker = tokio::time::interval(engine.config.follow_tick_interval());
  let mut last_ping = Instant::now();

  'tail: loop {
    tokio::select! {
      _ = ticker.tick() => {
        if !engine.writer_registry.is_active(&path) {
          // The writer is gone, but a final broadcast may already be
          // sitting in our channel from the instant before it
          // released its `WriterGuard` — drain it before exiting so
          // the session is torn down only once the sink is empty too
          // (data model, §3: "no writer remains *and* sink is drained").
          drain_remaining(&mut follower, watermark, &mut transport, write_wait).await;
          break 'tail;
        }
        if last_ping.elapsed() >= engine.config.follow_keepalive_interval()
          && transport.send_ping(write_wait).await.is_err()
        {
          break 'tail;
        }
        last_ping = Instant::now();
      }
      chunk = follower.rx.recv() => {
        match chunk {
          Some(chunk) if chunk.offset_after <= watermark => {
            // Already covered by the catch-up read; discard.
          }
          Some(chunk) => {
            if transport.send_payload(chunk.bytes, write_wait).await.is_err() {
              break 'tail;
            }
          }
          None => break 'tail,
        }
      }
    }
  }

  let _ = transport.close().await;
  drop(follower);
  info!(event = "follow_session_ended", path = %path.display());
}

/// Forward every chunk currently buffered in the sink, applying the
/// same watermark-dedup rule as the tail loop's `recv` arm. Used once
/// the writer is observed gone, so a chunk broadcast just before the
/// writer released its slot is never silently dropped.
async fn drain_remaining(follower: &mut FollowerHandle, watermark: u64, transport: &mut Transport, write_wait: std::time::Duration) {
  while let Ok(chunk) = follower.rx.try_recv() {
    if chunk.offset_after <= watermark {
      continue;
    }
    if transport.send_payload(chunk.bytes, write_wait).await.is_err() {
      return;
    }
  }
}

/// Copy exactly `watermark` bytes of the file's on-disk contents into
/// the transport, chunked to a bounded read-buffer size. Returns
/// `false` on a transport write failure (caller should stop).
async fn catch_up(engine: &Arc<Engine>, path: &PathBuf, watermark: u64, transport: &mut Transport, write_wait: std::time::Duration) -> bool {
  let mut handle = match store::open_read_blocking(engine.store.clone(), path.clone()).await {
    Ok(h) => h,
    Err(e) => {
      warn!(event = "follow_catchup_open_failed", path = %path.display(), error = %e, "catch-up read failed");
      return false;
    }
  };

  let mut remaining = watermark;
  while remaining > 0 {
    let want = remaining.min(CATCHUP_CHUNK as u64) as usize;
    let (next, buf, n) = match handle.read_at_most_blocking(want).await {
      Ok(triple) => triple,
      Err(e) => {
        warn!(event = "follow_catchup_read_failed", path = %path.display(), error = %e, "catch-up read failed");
        return false;
      }
    };
    handle = next;
    if n == 0 {
      break;
    }
    if transport
      .send_payload(Bytes::copy_from_slice(&buf[..n]), write_wait)
      .await
      .is_err()
    {
      return false;
    }
    remaining -= n as u64;
  }
  true
}
