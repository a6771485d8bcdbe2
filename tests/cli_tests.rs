//! E2E tests for the draw-sync CLI

#![allow(deprecated)] // cargo_bin deprecation - will update when assert_cmd stabilizes replacement

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const ATP_URL: &str = "https://www.atptour.com/en/scores/current/wimbledon/540/draws";
const WTA_URL: &str = "https://www.wtatennis.com/tournaments/320/wimbledon/2025/draws";

fn draw_sync() -> Command {
    let mut cmd = Command::cargo_bin("draw-sync").unwrap();
    for var in [
        "BASE_URL",
        "SCRIPT_USER_USERNAME",
        "SCRIPT_USER_PASSWORD",
        "PROXY_URL",
        "FETCH_MODE",
        "FIXTURE_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const ATP_FINAL: &str = r#"<html><body>
<div class="draw-content">
  <div class="stats-item">
    <div class="player-info">
      <div class="name"><a href="/p/f">Roger Federer</a> <span>(1)</span></div>
      <div class="winner"></div>
    </div>
    <div class="scores">
      <div class="score-item"><span>7</span><span>5</span></div>
      <div class="score-item"><span>6</span></div>
    </div>
  </div>
  <div class="stats-item">
    <div class="player-info">
      <div class="name"><a href="/p/n">Rafael Nadal</a> <span>(2)</span></div>
    </div>
    <div class="scores">
      <div class="score-item"><span>6</span><span>7</span></div>
      <div class="score-item"><span>3</span></div>
    </div>
  </div>
</div>
</body></html>"#;

const WTA_FINAL: &str = r#"<html><body>
<div class="tournament-draw__tab" data-ui-tab="Singles">
  <div class="tournament-draw__round-container">
    <div class="tournament-draw__match-table"><table><tbody>
      <tr class="match-table__row is-winner">
        <td><span class="match-table__player-fname">I.</span>
            <span class="match-table__player-lname">Swiatek</span>
            <span class="match-table__player-seed">(8)</span></td>
        <td class="match-table__score-cell">6</td>
        <td class="match-table__score-cell">6</td>
      </tr>
      <tr class="match-table__row">
        <td><span class="match-table__player-fname">A.</span>
            <span class="match-table__player-lname">Anisimova</span>
            <span class="match-table__player-seed">(13)</span></td>
        <td class="match-table__score-cell">0</td>
        <td class="match-table__score-cell">0</td>
      </tr>
    </tbody></table></div>
  </div>
</div>
</body></html>"#;

#[test]
fn test_help() {
    draw_sync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("scrape"));
}

#[test]
fn test_version() {
    draw_sync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("draw-sync"));
}

#[test]
fn test_sync_help() {
    draw_sync()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--fetch-mode"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_sync_without_config() {
    draw_sync()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--base-url"));
}

#[test]
fn test_sync_auth_failure_is_fatal() {
    let dir = tempdir().unwrap();

    draw_sync()
        .args(["sync", "--fetch-mode", "fixture", "--fixture-dir"])
        .arg(dir.path())
        .args(["--base-url", "http://127.0.0.1:1"])
        .env("SCRIPT_USER_USERNAME", "script")
        .env("SCRIPT_USER_PASSWORD", "secret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to authenticate"));
}

#[test]
fn test_scrape_no_args() {
    draw_sync()
        .arg("scrape")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_scrape_unknown_site() {
    draw_sync()
        .args(["scrape", "https://example.com/draws", "--size", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No extractor"));
}

#[test]
fn test_scrape_saved_atp_page() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("atp.html");
    fs::write(&page, ATP_FINAL).unwrap();

    draw_sync()
        .args(["scrape", ATP_URL, "--size", "2", "--file"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""site":"atp""#))
        .stdout(predicate::str::contains(r#""complete":true"#))
        .stdout(predicate::str::contains(r#""Rafael Nadal":"(2)""#))
        .stdout(predicate::str::contains(
            r#"{"round":2,"position":1,"name":"Roger Federer","seed":"(1)"}"#,
        ));
}

#[test]
fn test_scrape_saved_wta_page_yaml() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("wta.html");
    fs::write(&page, WTA_FINAL).unwrap();

    draw_sync()
        .args(["scrape", WTA_URL, "--size", "2", "--format", "yaml", "--file"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("site: wta"))
        .stdout(predicate::str::contains("complete: true"))
        .stdout(predicate::str::contains("name: I Swiatek"));
}

#[test]
fn test_scrape_incomplete_page() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("atp.html");
    fs::write(&page, ATP_FINAL).unwrap();

    draw_sync()
        .args(["scrape", ATP_URL, "--size", "8", "--file"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""expected":15"#))
        .stdout(predicate::str::contains(r#""complete":false"#));
}

#[test]
fn test_scrape_missing_file() {
    draw_sync()
        .args(["scrape", ATP_URL, "--size", "2", "--file", "/nonexistent/atp.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
