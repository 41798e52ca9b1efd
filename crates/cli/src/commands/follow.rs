use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use httpfstream_core::client::{self, FollowBody};
use httpfstream_core::config::LogLevel;
use httpfstream_core::logging;
use httpfstream_core::transport::Frame;

use crate::args::FollowArgs;
use crate::util::target_url;

/// Run the `follow` binary (6.2): write received bytes to standard
/// output until end-of-stream, whether the server answered with a
/// live upgrade or a plain one-shot body (9's upgrade-then-fallback).
pub fn run(args: FollowArgs) -> anyhow::Result<()> {
  logging::init_stderr(if args.verbose { LogLevel::Debug } else { LogLevel::Info });
  let (addr, path) = target_url::split(&args.url)?;

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_io()
    .enable_time()
    .build()
    .context("failed to build tokio runtime")?;

  rt.block_on(async move {
    let body = client::follow(&addr, &path).await.context("follow handshake failed")?;
    let mut stdout = std::io::stdout().lock();

    match body {
      FollowBody::Static(bytes) => {
        stdout.write_all(&bytes).context("failed to write stdout")?;
      }
      FollowBody::Live(mut transport) => {
        // No client-side read deadline (5: "Follow: no server-side
        // timeout"); this window is generous enough to just mean
        // "give up if the connection is truly dead".
        let read_wait = Duration::from_secs(3600);
        loop {
          match transport.recv(read_wait).await {
            Ok(Some(Frame::Payload(bytes))) => {
              stdout.write_all(&bytes).context("failed to write stdout")?;
            }
            Ok(Some(Frame::Ping | Frame::Pong)) => {}
            Ok(Some(Frame::Close)) | Ok(None) => break,
            Err(e) => anyhow::bail!("follow transport error: {e}"),
          }
        }
      }
    }

    stdout.flush().context("failed to flush stdout")?;
    Ok(())
  })
}
