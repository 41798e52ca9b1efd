use std::sync::Arc;

use anyhow::Context;
use httpfstream_core::config::{self, Config, LogLevel};
use httpfstream_core::dispatch::Engine;
use httpfstream_core::logging;
use httpfstream_core::server::{self, Server};
use httpfstream_core::store::{FsStore, Store};

use crate::args::ServerArgs;

/// Run the `server` binary: load layered config (10.3), bind the
/// listener, and block until the process is killed. Builds a
/// multi-thread runtime by hand and `block_on`s the whole lifetime of
/// the server rather than using `#[tokio::main]`.
pub fn run(args: ServerArgs) -> anyhow::Result<()> {
  let mut cfg = config::load(args.config.as_deref()).context("failed to load config")?;
  apply_overrides(&mut cfg, &args);

  match &cfg.log_file {
    Some(path) => logging::init(path, cfg.log_level),
    None => logging::init_stderr(cfg.log_level),
  }

  let rt = tokio::runtime::Builder::new_multi_thread()
    .enable_io()
    .enable_time()
    .build()
    .context("failed to build tokio runtime")?;

  rt.block_on(async move {
    let store: Arc<dyn Store> = Arc::new(FsStore::new(cfg.storage_root.clone()));
    let http_addr = cfg.http_addr.clone();
    let engine = Engine::new(store, Arc::new(cfg));
    let (_shutdown_tx, shutdown_rx) = server::shutdown_channel();

    let bound = Server::bind(&http_addr, engine, shutdown_rx)
      .await
      .with_context(|| format!("failed to bind {http_addr}"))?;
    bound.join().await;
    Ok(())
  })
}

fn apply_overrides(cfg: &mut Config, args: &ServerArgs) {
  if let Some(addr) = &args.http {
    cfg.http_addr = addr.clone();
  }
  if let Some(root) = &args.root {
    cfg.storage_root = root.clone();
  }
  if let Some(v) = args.read_wait_secs {
    cfg.read_wait_secs = v;
  }
  if let Some(v) = args.write_wait_secs {
    cfg.write_wait_secs = v;
  }
  if let Some(v) = args.follow_keepalive_interval_secs {
    cfg.follow_keepalive_interval_secs = v;
  }
  if let Some(path) = &args.log_file {
    cfg.log_file = Some(path.clone());
  }
  if args.verbose {
    cfg.log_level = LogLevel::Debug;
  }
}
