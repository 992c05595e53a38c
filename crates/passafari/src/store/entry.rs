//! Entry paths: store-relative, `/`-separated, ending in `.gpg`.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PassError, Result};

/// File extension every entry carries.
pub const ENTRY_EXTENSION: &str = ".gpg";

/// Directory-name fragment marking version-control metadata.
pub const VCS_MARKER: &str = ".git";

/// Identifier of one encrypted entry: its path relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryPath(String);

impl EntryPath {
    /// Validate a caller-supplied entry identifier.
    ///
    /// Rejects empty, absolute and non-`.gpg` paths as well as `.`, `..`
    /// and empty segments, so an entry can never point outside the root.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(PassError::InvalidEntry("entry path is empty".to_string()));
        }
        if raw.contains('\0') || raw.contains('\\') {
            return Err(PassError::InvalidEntry(format!(
                "entry path contains an invalid character: {raw}"
            )));
        }
        if raw.starts_with('/') || Path::new(raw).is_absolute() {
            return Err(PassError::InvalidEntry(format!(
                "entry path must be relative: {raw}"
            )));
        }
        if raw
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(PassError::InvalidEntry(format!(
                "entry path has an empty or relative segment: {raw}"
            )));
        }
        if !raw.ends_with(ENTRY_EXTENSION) {
            return Err(PassError::InvalidEntry(format!(
                "entry path must end with {ENTRY_EXTENSION}: {raw}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Build an entry from a path relative to the root, as found by a walk.
    ///
    /// Returns `None` for non-entry files and names that are not UTF-8.
    pub(crate) fn from_relative(relative: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_str()?),
                _ => return None,
            }
        }
        Self::parse(&segments.join("/")).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entry name without the `.gpg` extension, e.g. `work/aws`.
    pub fn name(&self) -> &str {
        self.0.strip_suffix(ENTRY_EXTENSION).unwrap_or(&self.0)
    }

    /// Absolute location of the entry under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }

    /// Whether any directory above the entry belongs to VCS metadata.
    ///
    /// Only directories are inspected; the leaf file name is dropped first
    /// so an entry such as `.github.gpg` is kept.
    pub fn is_vcs_metadata(&self) -> bool {
        match self.0.rsplit_once('/') {
            Some((dirs, _leaf)) => dirs.split('/').any(|dir| dir.contains(VCS_MARKER)),
            None => false,
        }
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntryPath {
    type Error = PassError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<EntryPath> for String {
    fn from(entry: EntryPath) -> Self {
        entry.0
    }
}
