//! Passafari — search and decrypt entries of a GPG-encrypted password store.
//!
//! The crate is the engine behind the desktop popover and the Safari
//! extension: it enumerates `.gpg` entries under a store root, matches them
//! against a query, and decrypts a selected entry into a password and login.
//! UI hosts talk to it through two operations, [`Store::search`] and
//! [`Store::reveal`] (or the non-blocking [`Store::begin_reveal`] /
//! [`PendingReveal::resume`] pair).

pub mod config;
pub mod credentials;
pub mod error;
pub mod keyring;
pub mod outcome;
pub mod passphrase;
pub mod presenter;
pub mod reveal;
pub mod store;

// Re-export primary types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{PassError, Result};
pub use keyring::{GnupgKeyRing, ImportSummary, KeyInfo, KeyRing};
pub use outcome::{RevealResult, SearchResult, Status};
pub use passphrase::{
    EnvPassphrase, KeychainPassphrase, MemoryPassphraseCache, NoPassphraseCache, Passphrase,
    PassphraseCache, PassphraseChain, PassphrasePrompt,
};
pub use presenter::{ClipboardTarget, FillRequest, FillTarget, Presenter, Row};
pub use reveal::{PendingReveal, RevealStep};
pub use store::{AccessGuard, DirectoryRoot, EntryPath, RootAccess, Store};
