use assert_cmd::prelude::*;
use std::process::Command;

#[test]
fn help_exits_successfully() {
  let mut cmd = Command::cargo_bin("server").expect("compile bin");
  cmd.arg("--help").assert().success();
}
