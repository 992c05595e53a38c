//! Integration tests for the CLI binary.
//!
//! Verifies that the `passafari` binary responds to basic flags and runs
//! searches, config edits and failing reveals against a scratch store.
//! None of these need a working gpg.
//!
//! This test is registered as a [[test]] in the passafari-cli crate
//! so that CARGO_BIN_EXE_passafari is available.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Get a Command pointing to the `passafari` binary.
fn passafari_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_passafari"))
}

/// Scratch store, GnuPG home and config path.
struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new(entries: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for entry in entries {
            let path = dir.path().join("store").join(entry);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"not really pgp").unwrap();
        }
        std::fs::create_dir_all(dir.path().join("store")).unwrap();
        Self { dir }
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    fn run(&self, args: &[&str]) -> Output {
        passafari_binary()
            .arg("--config")
            .arg(self.config())
            .arg("--store")
            .arg(self.store())
            .arg("--gnupg-home")
            .arg(self.dir.path().join("gnupg"))
            .args(args)
            .env_remove("PASSWORD_STORE_DIR")
            .env_remove("PASSAFARI_GNUPGHOME")
            .env_remove("PASSAFARI_PASSPHRASE")
            .output()
            .expect("failed to execute passafari")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = passafari_binary()
        .arg("--help")
        .output()
        .expect("failed to execute passafari --help");

    assert!(
        output.status.success(),
        "passafari --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = stdout(&output);
    assert!(
        stdout.contains("passafari") || stdout.contains("Usage"),
        "passafari --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = passafari_binary()
        .arg("--version")
        .output()
        .expect("failed to execute passafari --version");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(
        stdout.contains("0.1") || stdout.contains("passafari"),
        "passafari --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = passafari_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute passafari");

    assert!(!output.status.success());
}

#[test]
fn cli_search_lists_matches() {
    let sandbox = Sandbox::new(&["work/aws.gpg", "personal/email.gpg", ".git/secret.gpg"]);

    let output = sandbox.run(&["search", "aws"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output).trim(), "work/aws.gpg");
}

#[test]
fn cli_search_without_match_prints_sentinel() {
    let sandbox = Sandbox::new(&["work/aws.gpg"]);

    let output = sandbox.run(&["search", "git"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "No matching password found.");
}

#[test]
fn cli_search_json() {
    let sandbox = Sandbox::new(&["work/aws.gpg", "work/gcp.gpg"]);

    let output = sandbox.run(&["search", "WORK", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "found");
    assert_eq!(
        json["entries"],
        serde_json::json!(["work/aws.gpg", "work/gcp.gpg"])
    );
}

#[test]
fn cli_search_missing_store_fails() {
    let sandbox = Sandbox::new(&[]);
    let output = passafari_binary()
        .arg("--config")
        .arg(sandbox.config())
        .arg("--store")
        .arg(sandbox.dir.path().join("does-not-exist"))
        .arg("--gnupg-home")
        .arg(sandbox.dir.path().join("gnupg"))
        .args(["search", "aws"])
        .env_remove("PASSWORD_STORE_DIR")
        .output()
        .expect("failed to execute passafari");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("access_denied"));
}

#[test]
fn cli_show_missing_entry_fails() {
    let sandbox = Sandbox::new(&["work/aws.gpg"]);

    let output = sandbox.run(&["show", "work/gcp.gpg", "--json"]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "not_found");
    assert_eq!(json["password"], "");
}

#[test]
fn cli_config_edits_persist() {
    let sandbox = Sandbox::new(&[]);
    let key = sandbox.dir.path().join("key.asc");

    let output = sandbox.run(&["config", "set-root", sandbox.store().to_str().unwrap()]);
    assert!(output.status.success());
    let output = sandbox.run(&["config", "add-key", key.to_str().unwrap()]);
    assert!(output.status.success());

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(sandbox.config()).unwrap()).unwrap();
    assert_eq!(saved["store_root"], sandbox.store().to_str().unwrap());
    assert_eq!(saved["key_files"][0], key.to_str().unwrap());
    assert!(Path::new(&sandbox.config()).exists());
}

#[test]
fn cli_import_missing_key_file_fails() {
    let sandbox = Sandbox::new(&[]);
    let output = sandbox.run(&["import", "/definitely/not/here.asc"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to import keys"));
}

#[test]
fn cli_search_survives_moved_key_file() {
    let sandbox = Sandbox::new(&["work/aws.gpg"]);
    let gone = sandbox.dir.path().join("gone.asc");

    let output = sandbox.run(&["config", "add-key", gone.to_str().unwrap()]);
    assert!(output.status.success());

    let output = sandbox.run(&["search", "aws"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output).trim(), "work/aws.gpg");
}

#[test]
fn cli_show_clip_conflicts_with_json() {
    let sandbox = Sandbox::new(&["work/aws.gpg"]);
    let output = sandbox.run(&["show", "work/aws.gpg", "--clip", "--json"]);
    assert!(!output.status.success());
}

#[test]
fn cli_show_clip_missing_entry_fails_before_copying() {
    let sandbox = Sandbox::new(&["work/aws.gpg"]);
    let output = sandbox.run(&["show", "work/gcp.gpg", "--clip"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No matching password found."));
    assert!(stdout(&output).is_empty());
}
