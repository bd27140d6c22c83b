use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("mdbi").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("mdbi"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn cli_lists_presets() {
    let mut cmd = Command::cargo_bin("mdbi").unwrap();
    cmd.arg("presets");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("moodys-ratios [grid]: moodys_01"))
        .stdout(predicate::str::contains("wabr-wasr"));
}

#[test]
fn render_rejects_unknown_preset() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("mdbi").unwrap();
    cmd.args(["render", "--preset", "nope", "--out"])
        .arg(dir.path().join("x.svg"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown preset 'nope'"));
}

#[test]
fn fetch_reports_unreachable_api() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let mut cmd = Command::cargo_bin("mdbi").unwrap();
    cmd.args(["--api", &format!("http://127.0.0.1:{port}/api")])
        .args(["fetch", "--metrics", "sp_01"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("fetching sp_01"));
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn render_online_chart() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ratios.svg");
    let mut cmd = Command::cargo_bin("mdbi").unwrap();
    cmd.args(["render", "--preset", "moodys-ratios", "--yoy", "--out"])
        .arg(&out);
    cmd.assert().success();
    assert!(out.exists());
}
