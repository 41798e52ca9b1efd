//! Server (system overview, component 9): binds a TCP listener and
//! drives each accepted connection through `hyper`'s HTTP/1
//! connection handling with the dispatcher as its `Service`. Owns the
//! shared [`Engine`] and coordinates graceful shutdown via a
//! `tokio::select!` between a `watch` receiver and `listener.accept()`.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::dispatch::{self, Engine};

/// Create a shutdown channel for coordinating server termination.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
  watch::channel(false)
}

/// A running accept loop plus the address it bound to (useful when
/// binding to `:0` in tests).
pub struct Server {
  pub local_addr: SocketAddr,
  task: JoinHandle<()>,
}

impl Server {
  /// Bind `addr` and start accepting connections, serving each one
  /// with `engine` as the shared dispatcher state. Each connection
  /// (and the append/follow session running on it) is its own
  /// `tokio::spawn`ed task, per 5's "parallel request handlers"
  /// scheduling model.
  pub async fn bind(addr: &str, engine: Arc<Engine>, mut shutdown_rx: watch::Receiver<bool>) -> io::Result<Self> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(event = "server_started", addr = %local_addr, "server listening");

    let task = tokio::spawn(async move {
      loop {
        tokio::select! {
          _ = shutdown_rx.changed() => {
            info!(event = "server_shutdown", "shutdown signal received; stopping accept loop");
            break;
          }
          res = listener.accept() => {
            match res {
              Ok((stream, peer)) => {
                let engine = engine.clone();
                tokio::spawn(async move {
                  let io = TokioIo::new(stream);
                  let service = service_fn(move |req| {
                    let engine = engine.clone();
                    async move { Ok::<_, std::convert::Infallible>(dispatch::route(engine, req).await) }
                  });
                  // `.with_upgrades()` is required so a `101` response
                  // handed back by the dispatcher can still complete
                  // its upgrade after this call returns control to hyper.
                  if let Err(e) = http1::Builder::new().serve_connection(io, service).with_upgrades().await {
                    error!(event = "connection_error", peer = %peer, error = %e, "connection ended with error");
                  }
                });
              }
              Err(e) => {
                error!(event = "accept_error", error = %e, "accept error");
                break;
              }
            }
          }
        }
      }
      info!(event = "server_stopped", addr = %local_addr, "server stopped");
    });

    Ok(Self { local_addr, task })
  }

  /// Wait for the accept loop to finish (normally, after shutdown is
  /// signaled).
  pub async fn join(self) {
    let _ = self.task.await;
  }

  /// Abort the accept loop immediately, without a graceful shutdown
  /// signal; used by tests tearing down an ephemeral server.
  pub fn abort(&self) {
    self.task.abort();
  }
}
