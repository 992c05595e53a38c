//! Decrypted entry payload.
//!
//! The payload is newline separated text: line 0 is the password, and an
//! optional line 1 of the form `label: username` carries the login.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{PassError, Result};
use crate::outcome::RevealResult;

/// Password and login of one entry. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    password: String,
    login: String,
}

impl Credentials {
    /// Split decrypted text into password and login.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.split('\n');
        let password = lines.next().unwrap_or_default().to_string();
        let login = lines
            .next()
            .filter(|line| !line.is_empty())
            .and_then(|line| line.split_once(':'))
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default();
        Self { password, login }
    }

    /// Decode decrypted bytes as UTF-8 and parse them.
    ///
    /// # Errors
    ///
    /// Returns `PassError::MalformedEntry` if the bytes are not UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| PassError::MalformedEntry(format!("payload is not UTF-8: {e}")))?;
        Ok(Self::parse(text))
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Empty when the entry has no login line.
    pub fn login(&self) -> &str {
        &self.login
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"[REDACTED]")
            .field("login", &self.login)
            .finish()
    }
}

impl From<&Credentials> for RevealResult {
    fn from(credentials: &Credentials) -> Self {
        RevealResult::found(credentials.password(), credentials.login())
    }
}
