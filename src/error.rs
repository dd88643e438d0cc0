//! Error types for the persistence and upload pipeline.
//!
//! Uses context-carrying `thiserror` variants with helper constructors
//! instead of blanket `From` impls for external error types, since the
//! external errors (`std::io::Error`, `reqwest::Error`) don't carry the
//! path/size context these variants need.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the storage layer (`FilesOrchestrator`, `Writer`, `Reader`).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The caller attempted to write an object larger than `max_object_size`.
    #[error("object of {size} bytes exceeds max_object_size of {max}")]
    TooLarge {
        /// Size of the rejected object, in bytes.
        size: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// Filesystem failure while creating, appending to, reading, or deleting a file.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file or directory path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The feature directory could not be created at construction time.
    #[error("failed to create feature directory {path}: {source}")]
    DirectoryInit {
        /// The directory path that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Creates a too-large error.
    #[must_use]
    pub fn too_large(size: usize, max: usize) -> Self {
        Self::TooLarge { size, max }
    }

    /// Creates an IO error tagged with the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a directory-init error.
    pub fn directory_init(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryInit {
            path: path.into(),
            source,
        }
    }
}

/// Errors that invalidate a [`crate::config::FeatureConfig`] at construction time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `min_file_age_for_read` was not strictly greater than `max_file_age_for_write`,
    /// which would let the Reader and Writer race on the same file.
    #[error(
        "min_file_age_for_read ({min_read:?}) must be greater than max_file_age_for_write ({max_write:?})"
    )]
    ReadWriteAgeOverlap {
        /// Configured `min_file_age_for_read`.
        min_read: std::time::Duration,
        /// Configured `max_file_age_for_write`.
        max_write: std::time::Duration,
    },

    /// `max_file_age_for_read` was smaller than `min_file_age_for_read`, making the
    /// read window empty.
    #[error("max_file_age_for_read ({max_read:?}) must be >= min_file_age_for_read ({min_read:?})")]
    EmptyReadWindow {
        /// Configured `min_file_age_for_read`.
        min_read: std::time::Duration,
        /// Configured `max_file_age_for_read`.
        max_read: std::time::Duration,
    },

    /// A delay bound was nonsensical (`min > max`, or `initial` outside `[min, max]`).
    #[error("invalid delay bounds: initial={initial:?}, min={min:?}, max={max:?}")]
    InvalidDelayBounds {
        /// Configured initial delay.
        initial: std::time::Duration,
        /// Configured minimum delay.
        min: std::time::Duration,
        /// Configured maximum delay.
        max: std::time::Duration,
    },

    /// `max_object_size` was zero or exceeded `max_file_size`.
    #[error("max_object_size ({max_object_size}) must be > 0 and <= max_file_size ({max_file_size})")]
    InvalidObjectSize {
        /// Configured `max_object_size`.
        max_object_size: usize,
        /// Configured `max_file_size`.
        max_file_size: usize,
    },
}

/// Errors propagated from the `Uploader` request/transport boundary.
///
/// These are distinct from [`crate::upload::UploadStatus`]: a `TransportError`
/// means the uploader itself could not even produce a response (e.g. the
/// request builder failed), whereas `UploadStatus` covers the full space of
/// server responses including error statuses.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request builder failed to construct a request (bad header value, etc.)
    #[error("failed to build upload request: {0}")]
    Build(String),

    /// The underlying HTTP client failed before a response was obtained.
    #[error("transport failure sending upload request: {0}")]
    Send(#[source] reqwest::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn storage_too_large_message() {
        let err = StorageError::too_large(600, 512);
        assert!(err.to_string().contains("600"));
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn transport_build_error_message_is_descriptive() {
        let err = TransportError::Build("invalid header value".to_string());
        assert!(err.to_string().contains("invalid header value"));
    }

    #[test]
    fn config_error_messages_mention_both_fields() {
        let err = ConfigError::ReadWriteAgeOverlap {
            min_read: std::time::Duration::from_secs(1),
            max_write: std::time::Duration::from_secs(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("min_file_age_for_read"));
        assert!(msg.contains("max_file_age_for_write"));
    }
}
