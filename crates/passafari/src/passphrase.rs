//! Passphrases: the zeroizing wrapper, where cached ones come from, and how
//! a host is asked for one.
//!
//! Lookup order used by [`Store::open`](crate::Store::open):
//! 1. `PASSAFARI_PASSPHRASE` environment variable
//! 2. OS keychain (macOS Keychain via Security.framework)
//!
//! On other platforms the keychain source always reports "no passphrase".

use std::fmt;
use std::sync::{Arc, Mutex};

use log::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{PassError, Result};
use crate::store::EntryPath;

/// Environment variable consulted by [`EnvPassphrase::default`].
pub const PASSPHRASE_ENV_VAR: &str = "PASSAFARI_PASSPHRASE";

/// A key passphrase. Wiped on drop; `Debug` prints `[REDACTED]`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the plaintext value. Use sparingly.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ── Cached passphrases ────────────────────────────────────────────────────────

/// A place a passphrase may already be stored.
pub trait PassphraseCache: Send {
    /// `Ok(None)` means nothing is stored; errors mean the source is broken.
    fn lookup(&self) -> Result<Option<Passphrase>>;
}

impl<T: PassphraseCache + Sync + ?Sized> PassphraseCache for Arc<T> {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        (**self).lookup()
    }
}

/// Never has a passphrase.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPassphraseCache;

impl PassphraseCache for NoPassphraseCache {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        Ok(None)
    }
}

/// Passphrase held in process memory, settable by the host.
///
/// Share it with the store through an `Arc` to update it later.
#[derive(Debug, Default)]
pub struct MemoryPassphraseCache {
    passphrase: Mutex<Option<Passphrase>>,
}

impl MemoryPassphraseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, passphrase: Passphrase) {
        *self.slot() = Some(passphrase);
    }

    pub fn clear(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Passphrase>> {
        self.passphrase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PassphraseCache for MemoryPassphraseCache {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        Ok(self.slot().clone())
    }
}

/// Passphrase read from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvPassphrase {
    var: String,
}

impl EnvPassphrase {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvPassphrase {
    fn default() -> Self {
        Self::new(PASSPHRASE_ENV_VAR)
    }
}

impl PassphraseCache for EnvPassphrase {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        match std::env::var(&self.var) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => {
                debug!("using passphrase from {}", self.var);
                Ok(Some(Passphrase::new(value)))
            }
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(PassError::PassphraseLookup(format!(
                "{} is not valid unicode",
                self.var
            ))),
        }
    }
}

/// Passphrase stored as a generic password in the OS keychain.
#[derive(Debug, Clone)]
pub struct KeychainPassphrase {
    service: String,
    account: String,
}

impl KeychainPassphrase {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

#[cfg(target_os = "macos")]
impl PassphraseCache for KeychainPassphrase {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        use security_framework::passwords::get_generic_password;

        match get_generic_password(&self.service, &self.account) {
            Ok(data) => {
                let value = String::from_utf8(data).map_err(|e| {
                    PassError::PassphraseLookup(format!("keychain data is not valid UTF-8: {e}"))
                })?;
                debug!("using passphrase from keychain service {}", self.service);
                Ok(Some(Passphrase::new(value)))
            }
            Err(e) => {
                // errSecItemNotFound is the expected "not stored yet" case.
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("-25300") {
                    Ok(None)
                } else {
                    Err(PassError::PassphraseLookup(format!(
                        "keychain read failed: {e}"
                    )))
                }
            }
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl PassphraseCache for KeychainPassphrase {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        debug!(
            "OS keychain not available on this platform (service {}, account {})",
            self.service, self.account
        );
        Ok(None)
    }
}

/// Sources tried in order; the first passphrase found wins.
///
/// A failing source is logged and skipped.
#[derive(Default)]
pub struct PassphraseChain {
    sources: Vec<Box<dyn PassphraseCache>>,
}

impl PassphraseChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl PassphraseCache + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl PassphraseCache for PassphraseChain {
    fn lookup(&self) -> Result<Option<Passphrase>> {
        for source in &self.sources {
            match source.lookup() {
                Ok(Some(passphrase)) => return Ok(Some(passphrase)),
                Ok(None) => {}
                Err(e) => log::warn!("skipping passphrase source: {e}"),
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for PassphraseChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassphraseChain")
            .field("sources", &self.sources.len())
            .finish()
    }
}

// ── Prompting ─────────────────────────────────────────────────────────────────

/// Asks the user for the passphrase needed to decrypt `entry`.
///
/// Returning `None` means the prompt was dismissed.
pub trait PassphrasePrompt {
    fn prompt(&mut self, entry: &EntryPath) -> Option<Passphrase>;
}

impl<F> PassphrasePrompt for F
where
    F: FnMut(&EntryPath) -> Option<Passphrase>,
{
    fn prompt(&mut self, entry: &EntryPath) -> Option<Passphrase> {
        self(entry)
    }
}
