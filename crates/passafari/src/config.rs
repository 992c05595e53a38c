//! Persistent configuration.
//!
//! Stored as JSON at `~/.passafari/config.json`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "store_root": "/Users/alice/.password-store",
//!   "gnupg_home": "/Users/alice/.passafari/gnupg",
//!   "key_files": ["/Users/alice/keys/private.asc"]
//! }
//! ```
//!
//! Environment variables override the file: `PASSWORD_STORE_DIR`,
//! `PASSAFARI_GNUPGHOME` and `PASSAFARI_GPG`.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PassError, Result};

/// Current config file version.
pub const CONFIG_VERSION: u32 = 1;

const CONFIG_DIR: &str = ".passafari";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_STORE_DIR: &str = ".password-store";
const DEFAULT_GNUPG_DIR: &str = "gnupg";
const DEFAULT_KEYCHAIN_SERVICE: &str = "passafari";
const KEYCHAIN_ACCOUNT: &str = "passphrase";

/// Where the store lives and how to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    /// Root directory of the password store.
    pub store_root: PathBuf,
    /// GnuPG home directory holding the imported keys.
    pub gnupg_home: PathBuf,
    /// Explicit `gpg` binary; looked up on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg_program: Option<PathBuf>,
    /// Key files imported every time the store is opened.
    #[serde(default)]
    pub key_files: Vec<PathBuf>,
    /// Keychain service holding the cached passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keychain_service: Option<String>,
}

impl Config {
    /// Defaults relative to a home directory.
    pub fn from_home(home: &Path) -> Self {
        Self {
            version: CONFIG_VERSION,
            store_root: home.join(DEFAULT_STORE_DIR),
            gnupg_home: home.join(CONFIG_DIR).join(DEFAULT_GNUPG_DIR),
            gpg_program: None,
            key_files: Vec::new(),
            keychain_service: None,
        }
    }

    /// Defaults for the current user.
    pub fn with_defaults() -> Self {
        Self::from_home(&home_dir())
    }

    /// `~/.passafari`
    pub fn default_dir() -> PathBuf {
        home_dir().join(CONFIG_DIR)
    }

    /// `~/.passafari/config.json`
    pub fn default_path() -> PathBuf {
        Self::default_dir().join(CONFIG_FILE)
    }

    /// Load the config at `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `PassError::Config` for malformed or unsupported files and
    /// `PassError::Io` for other read failures.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                return Ok(Self::with_defaults());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Config = serde_json::from_slice(&bytes)
            .map_err(|e| PassError::Config(format!("{}: {e}", path.display())))?;
        if config.version != CONFIG_VERSION {
            return Err(PassError::Config(format!(
                "unsupported config version {} in {}",
                config.version,
                path.display()
            )));
        }
        Ok(config)
    }

    /// Write the config to `path` atomically.
    ///
    /// # Errors
    ///
    /// Returns `PassError::SerializationError` or `PassError::Io`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PassError::SerializationError(e.to_string()))?;
        write_atomic(path, json.as_bytes())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var_os(name));
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        let set = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(dir) = set("PASSWORD_STORE_DIR") {
            self.store_root = PathBuf::from(dir);
        }
        if let Some(dir) = set("PASSAFARI_GNUPGHOME") {
            self.gnupg_home = PathBuf::from(dir);
        }
        if let Some(program) = set("PASSAFARI_GPG") {
            self.gpg_program = Some(PathBuf::from(program));
        }
    }

    /// Add `path` to the startup key files unless already listed.
    pub fn add_key_file(&mut self, path: PathBuf) -> bool {
        if self.key_files.contains(&path) {
            return false;
        }
        self.key_files.push(path);
        true
    }

    pub fn keychain_service(&self) -> &str {
        self.keychain_service
            .as_deref()
            .unwrap_or(DEFAULT_KEYCHAIN_SERVICE)
    }

    pub fn keychain_account(&self) -> &str {
        KEYCHAIN_ACCOUNT
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write `data` to `path` through a sibling temp file and a rename.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
