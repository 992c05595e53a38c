//! Key ring abstraction.
//!
//! The store only needs three capabilities from an OpenPGP implementation:
//! decrypt bytes (optionally with a passphrase), import keys from a file,
//! and list the keys it holds. [`GnupgKeyRing`] provides them by driving
//! the `gpg` binary against a dedicated home directory.

pub mod gnupg;

use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::Result;
use crate::passphrase::Passphrase;

pub use gnupg::GnupgKeyRing;

/// The set of PGP keys available for decryption.
pub trait KeyRing: Send {
    /// Decrypt `ciphertext`.
    ///
    /// With `passphrase = None` only keys that are already unlocked (no
    /// passphrase, or unlocked by an agent) may be used.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: Option<&Passphrase>,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Merge the keys stored in the file at `path`.
    fn import_keys(&mut self, path: &Path) -> Result<ImportSummary>;

    /// Keys currently in the ring.
    fn keys(&self) -> Result<Vec<KeyInfo>>;
}

/// Counts reported by a key import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Keys found in the file.
    pub processed: u32,
    /// Keys newly added to the ring.
    pub imported: u32,
    /// Keys already present and unchanged.
    pub unchanged: u32,
    /// Secret keys found in the file.
    pub secret_read: u32,
    /// Secret keys newly added.
    pub secret_imported: u32,
    /// Fingerprints of every key touched by the import.
    pub fingerprints: Vec<String>,
}

/// One key in the ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub fingerprint: String,
    /// Primary user ID, if the key has one.
    pub user_id: Option<String>,
    /// Whether secret material is available for decryption.
    pub has_secret: bool,
}
