fn main() -> anyhow::Result<()> {
  cli::run_server()
}
