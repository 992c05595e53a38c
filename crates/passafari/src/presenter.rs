//! Presentation glue for the popover and the browser extension.
//!
//! Turns search and reveal outcomes into table rows and into the
//! `credentials` message the extension's page script consumes. Layout is
//! left to the host.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::Result;
use crate::outcome::{RevealResult, SearchResult, Status};
use crate::store::EntryPath;

/// Row text shown when a search matched nothing.
pub const NO_MATCH_MESSAGE: &str = "No matching password found.";

/// Row text shown when the desktop host application is unreachable.
pub const HOST_UNAVAILABLE_MESSAGE: &str = "Pass for macOS is not running.";

/// Name of the message carrying credentials to the page script.
pub const CREDENTIALS_MESSAGE: &str = "credentials";

/// One line of the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub label: String,
    /// `None` for sentinel rows, which cannot be selected.
    pub entry: Option<EntryPath>,
}

impl Row {
    fn for_entry(entry: &EntryPath) -> Self {
        Self {
            label: entry.as_str().to_string(),
            entry: Some(entry.clone()),
        }
    }

    fn sentinel(label: &str) -> Self {
        Self {
            label: label.to_string(),
            entry: None,
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.entry.is_some()
    }
}

/// Payload dispatched to the active page.
///
/// `shortcut` is set when the fill was triggered by the keyboard shortcut
/// rather than a table selection.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FillRequest {
    pub password: String,
    pub login: String,
    pub shortcut: bool,
    pub message: String,
}

impl FillRequest {
    /// A request carrying no credentials, only a message for the page.
    fn notice(message: &str, shortcut: bool) -> Self {
        Self {
            password: String::new(),
            login: String::new(),
            shortcut,
            message: message.to_string(),
        }
    }
}

impl fmt::Debug for FillRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillRequest")
            .field("password", &"[REDACTED]")
            .field("login", &self.login)
            .field("shortcut", &self.shortcut)
            .field("message", &self.message)
            .finish()
    }
}

impl Drop for FillRequest {
    fn drop(&mut self) {
        self.password.zeroize();
        self.login.zeroize();
    }
}

/// The active browser page, when there is one.
pub trait FillTarget {
    fn dispatch_message(&self, name: &str, request: &FillRequest);
}

/// System clipboard the desktop popover copies passwords to.
pub trait ClipboardTarget {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// Maps outcomes to what the UI shows and sends.
#[derive(Debug, Clone, Copy, Default)]
pub struct Presenter;

impl Presenter {
    pub fn new() -> Self {
        Self
    }

    /// User-facing text for a non-success status.
    pub fn message(&self, status: Status) -> Option<&'static str> {
        match status {
            Status::Found => None,
            Status::NotFound => Some(NO_MATCH_MESSAGE),
            Status::HostUnavailable => Some(HOST_UNAVAILABLE_MESSAGE),
            Status::InvalidQuery => Some("Type to search your passwords."),
            Status::AccessDenied => Some("The password store could not be opened."),
            Status::NeedsPassphrase => Some("A passphrase is required."),
            Status::DecryptFailed => Some("The password could not be decrypted."),
            Status::MalformedEntry => Some("The password entry could not be read."),
        }
    }

    /// Table rows for a search result.
    ///
    /// A result without entries becomes a single sentinel row.
    pub fn rows(&self, result: &SearchResult) -> Vec<Row> {
        if !result.entries.is_empty() {
            return result.entries.iter().map(Row::for_entry).collect();
        }
        let text = self.message(result.status).unwrap_or(NO_MATCH_MESSAGE);
        vec![Row::sentinel(text)]
    }

    /// Whether the first row should be selected and focused.
    ///
    /// Not when typing in the search field, and never for sentinel rows.
    pub fn should_focus_first(&self, rows: &[Row], from_search_field: bool) -> bool {
        !from_search_field && rows.first().is_some_and(Row::is_selectable)
    }

    /// Build the fill payload for a reveal outcome.
    pub fn fill_request(&self, result: &RevealResult, shortcut: bool) -> FillRequest {
        if result.is_found() {
            return FillRequest {
                password: result.password.clone(),
                login: result.login.clone(),
                shortcut,
                message: String::new(),
            };
        }
        let message = self.message(result.status).unwrap_or_default();
        FillRequest::notice(message, shortcut)
    }

    /// Fill payload for a sentinel row picked by the user.
    pub fn fill_request_for_row(&self, row: &Row, shortcut: bool) -> Option<FillRequest> {
        if row.is_selectable() {
            return None;
        }
        Some(FillRequest::notice(&row.label, shortcut))
    }

    /// Send `request` to the active page.
    ///
    /// Returns `false` when there is no active window, tab or page.
    pub fn dispatch(&self, target: Option<&dyn FillTarget>, request: &FillRequest) -> bool {
        match target {
            Some(target) => {
                target.dispatch_message(CREDENTIALS_MESSAGE, request);
                debug!("dispatched {CREDENTIALS_MESSAGE} message");
                true
            }
            None => {
                warn!("no active page to fill; dropping {CREDENTIALS_MESSAGE} message");
                false
            }
        }
    }

    /// Copy the password of a successful reveal to the clipboard.
    ///
    /// Failed reveals and a missing clipboard are logged no-ops. Returns
    /// whether the clipboard now holds the password.
    pub fn copy_password(
        &self,
        clipboard: Option<&mut dyn ClipboardTarget>,
        result: &RevealResult,
    ) -> bool {
        if !result.is_found() {
            warn!("nothing to copy: reveal ended with {}", result.status);
            return false;
        }
        let Some(clipboard) = clipboard else {
            warn!("no clipboard available; password not copied");
            return false;
        };
        match clipboard.set_text(&result.password) {
            Ok(()) => {
                debug!("copied password to clipboard");
                true
            }
            Err(e) => {
                warn!("could not copy password to clipboard: {e}");
                false
            }
        }
    }
}
