use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn routine_help_works() {
    Command::cargo_bin("routine")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage: routine"))
        .stdout(contains("streak"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = ["today", "streak", "drill", "plan", "trip", "schedule", "owner"];

    for cmd in subcommands {
        Command::cargo_bin("routine")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn unknown_subcommand_is_usage_error() {
    Command::cargo_bin("routine")
        .expect("binary")
        .arg("frobnicate")
        .assert()
        .code(2);
}
