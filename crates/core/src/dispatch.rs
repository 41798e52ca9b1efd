//! Request Dispatcher (component design 4.7): the single entry point
//! for HTTP requests, routing `GET` by a verb header/query parameter
//! to the Append or Follow session and mapping any pre-upgrade error
//! to the HTTP status table in the error design (7).

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use tracing::warn;

use crate::config::Config;
use crate::error::DispatchError;
use crate::registry::follower::FollowerRegistry;
use crate::registry::writer::WriterRegistry;
use crate::session;
use crate::store::Store;

/// Every shared, per-process dependency the dispatcher and the
/// sessions it spawns need. Held as an explicit value owned by
/// [`crate::server::Server`] and passed around by `Arc` clone — never
/// a `static`, per the REDESIGN FLAGS note on process-global state.
pub struct Engine {
  pub writer_registry: Arc<WriterRegistry>,
  pub follower_registry: Arc<FollowerRegistry>,
  pub store: Arc<dyn Store>,
  pub config: Arc<Config>,
}

impl Engine {
  pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Arc<Self> {
    Arc::new(Self {
      writer_registry: Arc::new(WriterRegistry::new()),
      follower_registry: Arc::new(FollowerRegistry::new()),
      store,
      config,
    })
  }
}

/// The verb a `GET` request carries, per 6.1: `X-Verb` header first,
/// then `?verb=` query parameter for compatibility, defaulting to
/// `FOLLOW` when neither is present or recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
  Append,
  Follow,
}

fn parse_verb(raw: &str) -> Option<Verb> {
  match raw.to_ascii_uppercase().as_str() {
    "APPEND" => Some(Verb::Append),
    "FOLLOW" => Some(Verb::Follow),
    _ => None,
  }
}

fn verb_of(req: &Request<Incoming>) -> Verb {
  if let Some(header) = req.headers().get("X-Verb").and_then(|v| v.to_str().ok())
    && let Some(verb) = parse_verb(header)
  {
    return verb;
  }
  if let Some(query) = req.uri().query() {
    for pair in query.split('&') {
      if let Some(value) = pair.strip_prefix("verb=")
        && let Some(verb) = parse_verb(value)
      {
        return verb;
      }
    }
  }
  Verb::Follow
}

/// Route one request to the right session handler, converting any
/// pre-upgrade error into the HTTP response the client sees (this
/// function itself is infallible, matching the `hyper` `Service`
/// contract the server wires it up as).
pub async fn route(engine: Arc<Engine>, req: Request<Incoming>) -> Response<Full<Bytes>> {
  if req.method() != Method::GET {
    return error_response(DispatchError::UnsupportedMethod);
  }

  let verb = verb_of(&req);
  let result = match verb {
    Verb::Append => session::append::handle(engine, req).await,
    Verb::Follow => session::follow::handle(engine, req).await,
  };

  match result {
    Ok(response) => response,
    Err(e) => error_response(e),
  }
}

fn error_response(err: DispatchError) -> Response<Full<Bytes>> {
  let status = err.status();
  if status == StatusCode::INTERNAL_SERVER_ERROR {
    warn!(event = "dispatch_internal_error", error = %err, "internal error");
  }
  Response::builder()
    .status(status)
    .header(hyper::header::CONTENT_TYPE, "text/plain")
    .body(Full::new(Bytes::from(err.to_string())))
    .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
