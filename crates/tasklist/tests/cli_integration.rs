//! CLI integration tests for the tasklist command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Config validation failures are reported before anything binds
//! - The `token` and `tasks` commands behave without a running server
//!
//! Each test points the config directory and working directory at a fresh
//! temp dir so no user or project config leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "TASKLIST_JWT_SECRET",
    "TASKLIST_BACKEND_URL",
    "TASKLIST_IDP_URL",
    "TASKLIST_IDP_KEY",
    "TASKLIST_STORE_URL",
    "TASKLIST_STORE_KEY",
    "TASKLIST_ALLOWED_ORIGINS",
    "TASKLIST_SERVER_URL",
    "TASKLIST_TOKEN",
    "TASKLIST_SESSION",
];

/// Get a command for the tasklist binary with an isolated environment.
fn tasklist(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tasklist").unwrap();
    cmd.current_dir(dir.path())
        .env("TASKLIST_CONFIG_DIR", dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("todo list"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tasklist"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("bridge"))
        .stdout(predicate::str::contains("tasks"))
        .stdout(predicate::str::contains("token"));
}

#[test]
fn test_tasks_help_lists_actions() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .args(["tasks", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("done"))
        .stdout(predicate::str::contains("undo"))
        .stdout(predicate::str::contains("rm"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir).arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_serve_requires_secret() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("jwt_secret"));
}

#[test]
fn test_bridge_requires_backend_url() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .arg("bridge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("backend_url"));
}

#[test]
fn test_bridge_rejects_insecure_cross_site_cookie() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bridge.toml");
    std::fs::write(
        &config,
        r#"
        [bridge]
        backend_url = "http://localhost:8080"

        [bridge.identity]
        url = "https://id.example.com"
        anon_key = "anon"

        [bridge.cookie]
        same_site = "none"
        "#,
    )
    .unwrap();

    tasklist(&dir)
        .arg("--config")
        .arg(&config)
        .arg("bridge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("secure"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Token Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_token_from_flag() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .args(["token", "--subject", "user-1", "--jwt-secret", "dev-secret"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[\w-]+\.[\w-]+\.[\w-]+\n$").unwrap());
}

#[test]
fn test_token_from_env_as_json() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .env("TASKLIST_JWT_SECRET", "dev-secret")
        .args(["--json", "token", "--subject", "user-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"subject\":\"user-1\""))
        .stdout(predicate::str::contains("\"token\""));
}

#[test]
fn test_token_from_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("tasklist.toml"),
        "[auth]\njwt_secret = \"file-secret\"\n",
    )
    .unwrap();

    tasklist(&dir)
        .args(["token", "-s", "user-2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("plaintext"));
}

#[test]
fn test_token_with_out_of_range_ttl_fails() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .args(["token", "--subject", "user-1", "--jwt-secret", "dev-secret"])
        .args(["--ttl", &u64::MAX.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_token_without_secret_fails() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .args(["token", "--subject", "user-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No signing secret"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_tasks_reports_unreachable_server() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir)
        .args(["--server", "http://127.0.0.1:1", "tasks", "--token", "t", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Could not load your tasks"));
}

#[test]
fn test_tasks_add_requires_text() {
    let dir = TempDir::new().unwrap();
    tasklist(&dir).args(["tasks", "add"]).assert().failure();
}
