//! Error types for Passafari.
//!
//! Search and reveal fold these into an [`Status`] on their outcome;
//! key import, configuration and store opening return them directly.
//! Passphrases and decrypted material never appear in error messages.

use crate::outcome::Status;

/// Errors covering store access, decryption, key import and configuration.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("Store root not accessible: {0}")]
    AccessDenied(String),

    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Invalid entry path: {0}")]
    InvalidEntry(String),

    #[error("Decryption failed: {0}")]
    DecryptFailed(String),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("Key import failed: {0}")]
    KeyImportFailed(String),

    #[error("Passphrase lookup failed: {0}")]
    PassphraseLookup(String),

    #[error("Key ring backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PassError {
    /// The caller-facing status this error degrades to.
    pub fn status(&self) -> Status {
        match self {
            PassError::AccessDenied(_) | PassError::Io(_) => Status::AccessDenied,
            PassError::EmptyQuery => Status::InvalidQuery,
            PassError::NotFound(_) | PassError::InvalidEntry(_) => Status::NotFound,
            PassError::MalformedEntry(_) => Status::MalformedEntry,
            PassError::DecryptFailed(_)
            | PassError::KeyImportFailed(_)
            | PassError::PassphraseLookup(_)
            | PassError::Backend(_)
            | PassError::Config(_)
            | PassError::SerializationError(_) => Status::DecryptFailed,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PassError>;
