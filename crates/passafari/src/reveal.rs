//! Decrypt pipeline.
//!
//! `reveal` runs to completion, asking a [`PassphrasePrompt`] when needed.
//! Hosts that cannot block use [`Store::begin_reveal`]: it either finishes
//! or hands back a [`PendingReveal`] that is resumed once with whatever the
//! user typed.

use std::fmt;

use log::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::credentials::Credentials;
use crate::error::{PassError, Result};
use crate::outcome::{RevealResult, Status};
use crate::passphrase::{Passphrase, PassphrasePrompt};
use crate::store::{EntryPath, Store};

/// Result of the first, non-interactive part of a reveal.
#[derive(Debug)]
pub enum RevealStep {
    /// Finished, successfully or not.
    Done(RevealResult),
    /// The unlocked attempt failed; a passphrase is needed to continue.
    NeedsPassphrase(PendingReveal),
}

impl RevealStep {
    /// Collapse into a result, reporting a pending reveal as
    /// `needs_passphrase` with empty credentials.
    pub fn into_result(self) -> RevealResult {
        match self {
            RevealStep::Done(result) => result,
            RevealStep::NeedsPassphrase(pending) => RevealResult::with_status(
                Status::NeedsPassphrase,
                format!("a passphrase is required to decrypt {}", pending.entry),
            ),
        }
    }
}

/// A reveal waiting for a passphrase. Resumable exactly once.
pub struct PendingReveal {
    entry: EntryPath,
    ciphertext: Vec<u8>,
}

impl PendingReveal {
    pub fn entry(&self) -> &EntryPath {
        &self.entry
    }

    /// Retry decryption with `passphrase`.
    ///
    /// `None` means the user dismissed the prompt and fails the reveal.
    pub fn resume(self, store: &Store, passphrase: Option<Passphrase>) -> RevealResult {
        let Some(passphrase) = passphrase else {
            warn!("passphrase prompt dismissed for {}", self.entry);
            return RevealResult::with_status(
                Status::DecryptFailed,
                "passphrase prompt was dismissed",
            );
        };
        debug!("retrying {} with supplied passphrase", self.entry);
        finish(
            &self.entry,
            store.keyring().decrypt(&self.ciphertext, Some(&passphrase)),
        )
    }
}

impl fmt::Debug for PendingReveal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReveal")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Decrypt `entry`, prompting for a passphrase at most once.
    ///
    /// Never fails: problems are reported through the result status.
    pub fn reveal<P>(&self, entry: &str, prompt: &mut P) -> RevealResult
    where
        P: PassphrasePrompt + ?Sized,
    {
        match self.begin_reveal(entry) {
            RevealStep::Done(result) => result,
            RevealStep::NeedsPassphrase(pending) => {
                let passphrase = prompt.prompt(pending.entry());
                pending.resume(self, passphrase)
            }
        }
    }

    /// Everything a reveal can do without asking the user.
    ///
    /// Reads the entry under root access (released before decrypting), then
    /// tries the cached passphrase if there is one, and unlocked keys if
    /// not.
    pub fn begin_reveal(&self, entry: &str) -> RevealStep {
        let entry = match EntryPath::parse(entry) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("refusing to reveal: {e}");
                return RevealStep::Done(RevealResult::failure(&e));
            }
        };

        let ciphertext = match self.read_entry(&entry) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                error!("could not read {entry}: {e}");
                return RevealStep::Done(RevealResult::failure(&e));
            }
        };

        if let Some(passphrase) = self.cached_passphrase() {
            debug!("decrypting {entry} with cached passphrase");
            let decrypted = self.keyring().decrypt(&ciphertext, Some(&passphrase));
            return RevealStep::Done(finish(&entry, decrypted));
        }

        match self.keyring().decrypt(&ciphertext, None) {
            Ok(plaintext) => RevealStep::Done(finish(&entry, Ok(plaintext))),
            Err(e @ PassError::Backend(_)) => RevealStep::Done(finish(&entry, Err(e))),
            Err(e) => {
                info!("{entry} needs a passphrase ({e})");
                RevealStep::NeedsPassphrase(PendingReveal { entry, ciphertext })
            }
        }
    }
}

/// Turn a final decryption attempt into a result.
fn finish(entry: &EntryPath, decrypted: Result<Zeroizing<Vec<u8>>>) -> RevealResult {
    let plaintext = match decrypted {
        Ok(plaintext) => plaintext,
        Err(e) => {
            error!("could not decrypt {entry}: {e}");
            return RevealResult::with_status(Status::DecryptFailed, e.to_string());
        }
    };

    match Credentials::from_bytes(&plaintext) {
        Ok(credentials) => {
            info!("revealed {entry}");
            RevealResult::from(&credentials)
        }
        Err(e) => {
            error!("{entry}: {e}");
            RevealResult::failure(&e)
        }
    }
}
