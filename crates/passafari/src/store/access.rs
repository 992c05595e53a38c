//! Scoped access to the store root.
//!
//! Sandboxed hosts only get to read the user-selected directory between a
//! "begin access" and an "end access" call. [`AccessGuard`] pairs the two
//! so release happens on every exit path, and only after a successful
//! acquire.

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{PassError, Result};

/// A store root that must be explicitly acquired before it is read.
pub trait RootAccess: Send {
    /// Filesystem location of the root.
    fn path(&self) -> &Path;

    /// Acquire access. Every `Ok` is matched by exactly one [`end_access`].
    ///
    /// [`end_access`]: RootAccess::end_access
    fn begin_access(&self) -> Result<()>;

    /// Release access acquired by [`begin_access`](RootAccess::begin_access).
    fn end_access(&self);
}

/// A plain directory root. Acquiring succeeds when the directory is readable.
#[derive(Debug, Clone)]
pub struct DirectoryRoot {
    path: PathBuf,
}

impl DirectoryRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RootAccess for DirectoryRoot {
    fn path(&self) -> &Path {
        &self.path
    }

    fn begin_access(&self) -> Result<()> {
        std::fs::read_dir(&self.path)
            .map(|_| ())
            .map_err(|e| PassError::AccessDenied(format!("{}: {e}", self.path.display())))
    }

    fn end_access(&self) {}
}

/// Holds acquired root access and releases it on drop.
pub struct AccessGuard<'a> {
    root: &'a dyn RootAccess,
}

impl<'a> AccessGuard<'a> {
    /// Acquire access to `root`. No release happens if this fails.
    pub fn acquire(root: &'a dyn RootAccess) -> Result<Self> {
        root.begin_access()?;
        debug!("acquired store root {}", root.path().display());
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.root.end_access();
        debug!("released store root {}", self.root.path().display());
    }
}
