//! The password store: a scoped root directory, a key ring and a
//! passphrase cache.
//!
//! # Directory layout
//!
//! Entries follow the `pass` convention, one encrypted file per secret:
//!
//! ```text
//! ~/.password-store/
//! ├── .git/                 — ignored
//! ├── .gpg-id               — ignored
//! ├── personal/
//! │   └── email.gpg
//! └── work/
//!     └── aws.gpg
//! ```
//!
//! # Modules
//!
//! - [`access`] — scoped acquire/release of the root.
//! - [`entry`] — validated store-relative entry paths.
//! - `search` — walk and query matching.
//!
//! Decryption lives in [`crate::reveal`].

pub mod access;
pub mod entry;
mod search;

use std::fmt;
use std::path::Path;

use log::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{PassError, Result};
use crate::keyring::{GnupgKeyRing, ImportSummary, KeyInfo, KeyRing};
use crate::outcome::SearchResult;
use crate::passphrase::{
    EnvPassphrase, KeychainPassphrase, NoPassphraseCache, Passphrase, PassphraseCache,
    PassphraseChain,
};

pub use access::{AccessGuard, DirectoryRoot, RootAccess};
pub use entry::{EntryPath, ENTRY_EXTENSION, VCS_MARKER};

/// One password store per host process.
///
/// The host constructs it at startup and hands it to whatever layer needs
/// it. `search` and `reveal` borrow it shared; key import borrows it
/// exclusively.
pub struct Store {
    root: Box<dyn RootAccess>,
    keyring: Box<dyn KeyRing>,
    passphrases: Box<dyn PassphraseCache>,
}

impl Store {
    /// Create a store without a passphrase cache.
    pub fn new(root: impl RootAccess + 'static, keyring: impl KeyRing + 'static) -> Self {
        Self {
            root: Box::new(root),
            keyring: Box::new(keyring),
            passphrases: Box::new(NoPassphraseCache),
        }
    }

    /// Replace the passphrase cache consulted before decrypting.
    pub fn with_passphrase_cache(mut self, cache: impl PassphraseCache + 'static) -> Self {
        self.passphrases = Box::new(cache);
        self
    }

    /// Open the store described by `config`.
    ///
    /// Uses a [`DirectoryRoot`] and a GnuPG key ring in `config.gnupg_home`,
    /// imports every configured key file, and looks passphrases up in the
    /// environment and then the OS keychain.
    ///
    /// # Errors
    ///
    /// Returns `PassError::Io` if the GnuPG home cannot be created. Key
    /// files that fail to import are logged and skipped.
    pub fn open(config: &Config) -> Result<Self> {
        let mut keyring = match &config.gpg_program {
            Some(program) => GnupgKeyRing::with_program(program, &config.gnupg_home)?,
            None => GnupgKeyRing::open(&config.gnupg_home)?,
        };
        for key_file in &config.key_files {
            match keyring.import_keys(key_file) {
                Ok(summary) => debug!(
                    "startup import of {}: {} processed",
                    key_file.display(),
                    summary.processed
                ),
                Err(e) => warn!("skipping configured key file {}: {e}", key_file.display()),
            }
        }

        let mut passphrases = PassphraseChain::new();
        passphrases.push(EnvPassphrase::default());
        passphrases.push(KeychainPassphrase::new(
            config.keychain_service(),
            config.keychain_account(),
        ));

        info!(
            "opened password store at {}",
            config.store_root.display()
        );
        Ok(Self::new(DirectoryRoot::new(&config.store_root), keyring)
            .with_passphrase_cache(passphrases))
    }

    /// Location of the store root.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn keyring(&self) -> &dyn KeyRing {
        self.keyring.as_ref()
    }

    /// Find entries whose relative path contains `query`, ignoring case.
    ///
    /// Never fails: an empty query yields `InvalidQuery`, an unreachable
    /// root `AccessDenied`, no matches `NotFound`.
    pub fn search(&self, query: &str) -> SearchResult {
        if query.is_empty() {
            return SearchResult::failure(&PassError::EmptyQuery);
        }

        let guard = match AccessGuard::acquire(self.root.as_ref()) {
            Ok(guard) => guard,
            Err(e) => {
                error!("search could not access store root: {e}");
                return SearchResult::failure(&e);
            }
        };

        let entries = search::find_entries(guard.path(), query);
        drop(guard);

        debug!("search matched {} entries", entries.len());
        SearchResult::from_entries(entries)
    }

    /// Every entry in the store, in walk order.
    ///
    /// # Errors
    ///
    /// Returns `PassError::AccessDenied` if the root cannot be acquired.
    pub fn list(&self) -> Result<Vec<EntryPath>> {
        let guard = AccessGuard::acquire(self.root.as_ref())?;
        Ok(search::entries(guard.path()).collect())
    }

    /// Merge the keys in `path` into the key ring.
    ///
    /// # Errors
    ///
    /// Returns `PassError::KeyImportFailed` for unreadable or malformed key
    /// files.
    pub fn import_keys(&mut self, path: &Path) -> Result<ImportSummary> {
        match self.keyring.import_keys(path) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("could not import keys from {}: {e}", path.display());
                Err(e)
            }
        }
    }

    /// Keys currently held by the key ring.
    pub fn keys(&self) -> Result<Vec<KeyInfo>> {
        self.keyring.keys()
    }

    /// Read the ciphertext of `entry` while holding root access.
    pub(crate) fn read_entry(&self, entry: &EntryPath) -> Result<Vec<u8>> {
        let guard = AccessGuard::acquire(self.root.as_ref())?;
        let path = entry.to_path(guard.path());
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PassError::NotFound(entry.to_string()),
            _ => PassError::AccessDenied(format!("could not read {entry}: {e}")),
        })
    }

    /// Cached passphrase, if any. Lookup failures count as absent.
    pub(crate) fn cached_passphrase(&self) -> Option<Passphrase> {
        match self.passphrases.lookup() {
            Ok(passphrase) => passphrase,
            Err(e) => {
                warn!("could not find cached passphrase: {e}");
                None
            }
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root.path())
            .finish_non_exhaustive()
    }
}
