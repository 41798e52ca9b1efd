use std::io::Read;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use httpfstream_core::client;
use httpfstream_core::config::LogLevel;
use httpfstream_core::logging;

use crate::args::AppendArgs;
use crate::util::target_url;

const CHUNK: usize = 64 * 1024;

/// Run the `append` binary (6.2): read standard input in chunks and
/// stream each chunk as one append frame, until EOF.
pub fn run(args: AppendArgs) -> anyhow::Result<()> {
  logging::init_stderr(if args.verbose { LogLevel::Debug } else { LogLevel::Info });
  let (addr, path) = target_url::split(&args.url)?;

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_io()
    .enable_time()
    .build()
    .context("failed to build tokio runtime")?;

  rt.block_on(async move {
    let mut writer = client::append(&addr, &path, Duration::from_secs(5))
      .await
      .context("append handshake failed")?;

    let mut stdin = std::io::stdin().lock();
    let mut buf = vec![0u8; CHUNK];
    loop {
      let n = stdin.read(&mut buf).context("failed to read stdin")?;
      if n == 0 {
        break;
      }
      writer
        .write(Bytes::copy_from_slice(&buf[..n]))
        .await
        .context("append write failed")?;
    }
    writer.close().await.context("failed to close append session")?;
    Ok(())
  })
}
