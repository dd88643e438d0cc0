//! File naming and age computation.
//!
//! A file's name *is* its creation timestamp in milliseconds, which gives a
//! total order across files with no separate index: listing a directory and
//! sorting filenames numerically yields creation order. Age is always
//! computed from the filename, never from filesystem mtime, so it survives
//! clock skew across process lifetimes (grounded on
//! `KodrAus-emit/emitter/file`'s filename-embedded timestamp parsing).

use std::path::{Path, PathBuf};
use std::time::Duration;

/// A file tracked by a [`crate::storage::orchestrator::FilesOrchestrator`],
/// identified by its creation-timestamp filename.
#[derive(Debug, Clone)]
pub struct StoredFile {
    path: PathBuf,
    created_at_ms: u64,
}

impl StoredFile {
    /// Builds a `StoredFile` from a path whose file name is expected to be a
    /// millisecond timestamp. Unparseable names are treated as age 0 (the
    /// oldest possible file), so they are swept up by the next purge pass.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Self {
        let created_at_ms = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        Self { path, created_at_ms }
    }

    /// Creates a brand-new file name from the current wall-clock time.
    #[must_use]
    pub fn new_name(dir: &Path, now_ms: u64) -> Self {
        Self {
            path: dir.join(now_ms.to_string()),
            created_at_ms: now_ms,
        }
    }

    /// Full path to this file on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creation timestamp encoded in the filename, milliseconds since epoch.
    #[must_use]
    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    /// Age of this file relative to `now_ms` (milliseconds since the Unix
    /// epoch), computed purely from the filename. Takes a raw timestamp
    /// rather than a [`std::time::SystemTime`] so callers can supply one
    /// obtained through a [`crate::conditions::DateProvider`] instead of
    /// reading the wall clock directly.
    #[must_use]
    pub fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.created_at_ms))
    }
}
