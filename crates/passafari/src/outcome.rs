//! Caller-facing results of [`Store::search`](crate::Store::search) and
//! [`Store::reveal`](crate::Store::reveal).
//!
//! Both serialize to JSON with snake_case statuses so the C ABI can hand
//! them to the desktop and extension hosts unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::PassError;
use crate::store::EntryPath;

/// Outcome status shared by search and reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// At least one entry matched, or the entry was decrypted.
    Found,
    /// No entry matched the query, or the entry does not exist.
    NotFound,
    /// The query was empty.
    InvalidQuery,
    /// The store root could not be accessed.
    AccessDenied,
    /// Decryption needs a passphrase from the user.
    NeedsPassphrase,
    /// Every passphrase attempt was exhausted.
    DecryptFailed,
    /// The decrypted payload is not UTF-8 text.
    MalformedEntry,
    /// The host application serving the extension is not running.
    HostUnavailable,
}

impl Status {
    pub fn is_found(self) -> bool {
        self == Status::Found
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Found => "found",
            Status::NotFound => "not_found",
            Status::InvalidQuery => "invalid_query",
            Status::AccessDenied => "access_denied",
            Status::NeedsPassphrase => "needs_passphrase",
            Status::DecryptFailed => "decrypt_failed",
            Status::MalformedEntry => "malformed_entry",
            Status::HostUnavailable => "host_unavailable",
        };
        f.write_str(s)
    }
}

// ── SearchResult ──────────────────────────────────────────────────────────────

/// Ordered matches for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub status: Status,
    /// Matching entries in enumeration order.
    pub entries: Vec<EntryPath>,
    /// Diagnostic detail for failed searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    /// Build a result from matches; empty matches are `NotFound`.
    pub fn from_entries(entries: Vec<EntryPath>) -> Self {
        let status = if entries.is_empty() {
            Status::NotFound
        } else {
            Status::Found
        };
        Self {
            status,
            entries,
            error: None,
        }
    }

    pub fn failure(error: &PassError) -> Self {
        Self {
            status: error.status(),
            entries: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Result reported when the host serving the extension is unreachable.
    pub fn host_unavailable() -> Self {
        Self {
            status: Status::HostUnavailable,
            entries: Vec::new(),
            error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── RevealResult ──────────────────────────────────────────────────────────────

/// Decrypted credentials of one entry, or the reason there are none.
///
/// `password` and `login` are wiped on drop and redacted in `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealResult {
    pub status: Status,
    pub password: String,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RevealResult {
    pub fn found(password: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            status: Status::Found,
            password: password.into(),
            login: login.into(),
            error_message: None,
        }
    }

    /// A result with empty credentials and the given status.
    pub fn with_status(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            password: String::new(),
            login: String::new(),
            error_message: Some(message.into()),
        }
    }

    pub fn failure(error: &PassError) -> Self {
        Self::with_status(error.status(), error.to_string())
    }

    pub fn is_found(&self) -> bool {
        self.status.is_found()
    }
}

impl fmt::Debug for RevealResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealResult")
            .field("status", &self.status)
            .field("password", &"[REDACTED]")
            .field("login", &self.login)
            .field("error_message", &self.error_message)
            .finish()
    }
}

impl Drop for RevealResult {
    fn drop(&mut self) {
        self.password.zeroize();
        self.login.zeroize();
    }
}
