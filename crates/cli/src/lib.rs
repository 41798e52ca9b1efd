//! CLI front-ends over the `httpfstream` streaming engine: three thin
//! binaries (`server`, `append`, `follow`), each parsing its own
//! top-level argument struct and delegating straight into the engine
//! / client library. Split into one `run_*` per binary since there is
//! no shared subcommand surface across the three.

pub mod args;
pub mod commands;
pub mod util;

use clap::Parser;

/// Entry point for the `server` binary.
pub fn run_server() -> anyhow::Result<()> {
  commands::server::run(args::ServerArgs::parse())
}

/// Entry point for the `append` binary.
pub fn run_append() -> anyhow::Result<()> {
  commands::append::run(args::AppendArgs::parse())
}

/// Entry point for the `follow` binary.
pub fn run_follow() -> anyhow::Result<()> {
  commands::follow::run(args::FollowArgs::parse())
}
