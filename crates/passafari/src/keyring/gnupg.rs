//! GnuPG-backed key ring.
//!
//! Every invocation runs `gpg --homedir <home> --batch --no-tty`, so the
//! ring is isolated from the user's default keyring unless the home is
//! pointed at it. Ciphertext is handed over through a private temporary
//! file and passphrases through stdin; they never appear on a command line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::{debug, info, warn};
use zeroize::Zeroizing;

use super::{ImportSummary, KeyInfo, KeyRing};
use crate::error::{PassError, Result};
use crate::passphrase::Passphrase;

const GPG_PROGRAM: &str = "gpg";

/// Prefix of machine-readable lines written to `--status-fd`.
const STATUS_PREFIX: &str = "[GNUPG:] ";

/// Key ring stored in a GnuPG home directory.
#[derive(Debug, Clone)]
pub struct GnupgKeyRing {
    program: Option<PathBuf>,
    home: PathBuf,
}

impl GnupgKeyRing {
    /// Open the ring in `home`, locating `gpg` on `PATH`.
    ///
    /// A missing binary is not an error here; decrypt and import report it
    /// when they are attempted.
    ///
    /// # Errors
    ///
    /// Returns `PassError::Io` if `home` cannot be created.
    pub fn open(home: impl Into<PathBuf>) -> Result<Self> {
        let program = match which::which(GPG_PROGRAM) {
            Ok(path) => Some(path),
            Err(_) => {
                warn!("gpg binary not found - decryption and key import will fail");
                None
            }
        };
        Self::build(program, home.into())
    }

    /// Open the ring in `home` using an explicit `gpg` binary.
    pub fn with_program(program: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Result<Self> {
        Self::build(Some(program.into()), home.into())
    }

    fn build(program: Option<PathBuf>, home: PathBuf) -> Result<Self> {
        ensure_home(&home)?;
        debug!("using GnuPG home {}", home.display());
        Ok(Self { program, home })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    fn command(&self) -> Result<Command> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| PassError::Backend("gpg binary not found".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.arg("--homedir")
            .arg(&self.home)
            .args(["--batch", "--no-tty", "--yes", "--quiet"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(cmd)
    }

    fn list(&self, listing: &str) -> Result<Vec<KeyInfo>> {
        let output = self
            .command()?
            .args(["--with-colons", "--fixed-list-mode", listing])
            .output()
            .map_err(|e| PassError::Backend(format!("failed to run gpg {listing}: {e}")))?;
        if !output.status.success() {
            return Err(PassError::Backend(failure_detail(&output)));
        }
        Ok(parse_key_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl KeyRing for GnupgKeyRing {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: Option<&Passphrase>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut cmd = self.command()?;

        let mut input = tempfile::NamedTempFile::new()
            .map_err(|e| PassError::Backend(format!("failed to stage ciphertext: {e}")))?;
        input
            .write_all(ciphertext)
            .and_then(|()| input.flush())
            .map_err(|e| PassError::Backend(format!("failed to stage ciphertext: {e}")))?;

        match passphrase {
            Some(_) => {
                cmd.args(["--pinentry-mode", "loopback", "--passphrase-fd", "0"])
                    .stdin(Stdio::piped());
            }
            // Never spawn a pinentry; only keys the agent can already use.
            None => {
                cmd.args(["--pinentry-mode", "error"]);
            }
        }
        cmd.arg("--decrypt").arg(input.path());

        let mut child = cmd
            .spawn()
            .map_err(|e| PassError::Backend(format!("failed to spawn gpg: {e}")))?;

        if let (Some(passphrase), Some(mut stdin)) = (passphrase, child.stdin.take()) {
            let mut line = Zeroizing::new(String::with_capacity(passphrase.expose().len() + 1));
            line.push_str(passphrase.expose());
            line.push('\n');
            stdin
                .write_all(line.as_bytes())
                .map_err(|e| PassError::DecryptFailed(format!("failed to send passphrase: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| PassError::Backend(format!("failed to wait for gpg: {e}")))?;

        if output.status.success() {
            Ok(Zeroizing::new(output.stdout))
        } else {
            Err(PassError::DecryptFailed(failure_detail(&output)))
        }
    }

    fn import_keys(&mut self, path: &Path) -> Result<ImportSummary> {
        std::fs::File::open(path).map_err(|e| {
            PassError::KeyImportFailed(format!("cannot read {}: {e}", path.display()))
        })?;

        let output = self
            .command()
            .map_err(|e| PassError::KeyImportFailed(e.to_string()))?
            .args(["--pinentry-mode", "loopback", "--status-fd", "1", "--import"])
            .arg(path)
            .output()
            .map_err(|e| PassError::KeyImportFailed(format!("failed to run gpg --import: {e}")))?;

        let summary = parse_import_status(&String::from_utf8_lossy(&output.stdout));

        if summary.processed == 0 {
            return Err(PassError::KeyImportFailed(format!(
                "no keys found in {}: {}",
                path.display(),
                failure_detail(&output)
            )));
        }
        if !output.status.success() {
            if summary.fingerprints.is_empty() {
                return Err(PassError::KeyImportFailed(failure_detail(&output)));
            }
            warn!(
                "gpg reported problems importing {}: {}",
                path.display(),
                failure_detail(&output)
            );
        }

        info!(
            "imported keys from {}: {} processed, {} new, {} secret",
            path.display(),
            summary.processed,
            summary.imported,
            summary.secret_imported
        );
        Ok(summary)
    }

    fn keys(&self) -> Result<Vec<KeyInfo>> {
        let secret: Vec<String> = self
            .list("--list-secret-keys")?
            .into_iter()
            .map(|key| key.fingerprint)
            .collect();

        let mut keys = self.list("--list-keys")?;
        for key in &mut keys {
            key.has_secret = secret.contains(&key.fingerprint);
        }
        Ok(keys)
    }
}

// ── Output parsing ────────────────────────────────────────────────────────────

/// Parse `--status-fd` output of `gpg --import`.
pub fn parse_import_status(status: &str) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for line in status.lines() {
        let Some(record) = line.strip_prefix(STATUS_PREFIX) else {
            continue;
        };
        let mut fields = record.split_whitespace();
        match fields.next() {
            Some("IMPORT_OK") => {
                // IMPORT_OK <reason-flags> <fingerprint>
                if let Some(fingerprint) = fields.nth(1) {
                    if !summary.fingerprints.iter().any(|f| f == fingerprint) {
                        summary.fingerprints.push(fingerprint.to_string());
                    }
                }
            }
            Some("IMPORT_RES") => {
                let counts: Vec<u32> = fields.map(|f| f.parse().unwrap_or(0)).collect();
                let at = |i: usize| counts.get(i).copied().unwrap_or(0);
                summary.processed = at(0);
                summary.imported = at(2);
                summary.unchanged = at(4);
                summary.secret_read = at(9);
                summary.secret_imported = at(10);
            }
            _ => {}
        }
    }

    summary
}

/// Parse `--with-colons` key listings into one [`KeyInfo`] per primary key.
///
/// Subkey fingerprints are skipped. `has_secret` is set for `sec` records.
pub fn parse_key_listing(listing: &str) -> Vec<KeyInfo> {
    let mut keys: Vec<KeyInfo> = Vec::new();
    let mut expect_primary_fpr = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some(record @ ("pub" | "sec")) => {
                keys.push(KeyInfo {
                    fingerprint: String::new(),
                    user_id: None,
                    has_secret: record == "sec",
                });
                expect_primary_fpr = true;
            }
            Some("sub" | "ssb") => expect_primary_fpr = false,
            Some("fpr") if expect_primary_fpr => {
                if let (Some(key), Some(fpr)) = (keys.last_mut(), fields.get(9)) {
                    key.fingerprint = (*fpr).to_string();
                }
                expect_primary_fpr = false;
            }
            Some("uid") => {
                if let (Some(key), Some(uid)) = (keys.last_mut(), fields.get(9)) {
                    if key.user_id.is_none() && !uid.is_empty() {
                        key.user_id = Some((*uid).to_string());
                    }
                }
            }
            _ => {}
        }
    }

    keys.retain(|key| !key.fingerprint.is_empty());
    keys
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("gpg exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

fn ensure_home(home: &Path) -> Result<()> {
    std::fs::create_dir_all(home)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(home, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}
