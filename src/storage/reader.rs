//! Produces the next batch for upload and acknowledges it afterwards.
//!
//! Batch framing (`prefix`/`separator`/`suffix`) is applied only here, at
//! read time — never persisted to disk — so a partially written file still
//! decodes as a valid, if truncated, batch after a crash.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::config::FeatureConfig;
use crate::storage::orchestrator::FilesOrchestrator;
use crate::telemetry::{Telemetry, TelemetryEvent};

/// An in-memory batch ready for upload, carrying the identity of the file it
/// came from so it can later be acknowledged.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Framed payload: `prefix || events || suffix`.
    pub bytes: Vec<u8>,
    path: PathBuf,
}

impl Batch {
    /// Path of the on-disk file this batch was read from.
    #[must_use]
    pub fn source_path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Reads batches from the feature directory and acknowledges them once
/// uploaded.
pub struct Reader {
    orchestrator: Arc<FilesOrchestrator>,
    config: FeatureConfig,
    telemetry: Arc<dyn Telemetry>,
}

impl Reader {
    /// Creates a reader bound to `orchestrator`.
    #[must_use]
    pub fn new(
        orchestrator: Arc<FilesOrchestrator>,
        config: FeatureConfig,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            orchestrator,
            config,
            telemetry,
        }
    }

    /// Returns the next batch, or `None` if no file is currently readable.
    /// On a read failure (corrupt file, I/O), the offending file is deleted
    /// to avoid permanently blocking the queue, and `None` is returned.
    #[instrument(skip(self), fields(feature = %self.config.feature_name))]
    pub fn read_next_batch(&self) -> Option<Batch> {
        let path = self.orchestrator.get_readable_file(&[])?;
        match std::fs::read(&path) {
            Ok(contents) => {
                let mut bytes = Vec::with_capacity(
                    self.config.data_format.prefix.len()
                        + contents.len()
                        + self.config.data_format.suffix.len(),
                );
                bytes.extend_from_slice(&self.config.data_format.prefix);
                bytes.extend_from_slice(&contents);
                bytes.extend_from_slice(&self.config.data_format.suffix);
                Some(Batch { bytes, path })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file, dropping it");
                self.telemetry.error(TelemetryEvent {
                    feature_name: self.config.feature_name.clone(),
                    category: "storage.read",
                    message: format!("failed to read {}: {e}", path.display()),
                });
                self.orchestrator.delete(&path);
                None
            }
        }
    }

    /// Deletes the file backing `batch`. Idempotent if already removed.
    pub fn mark_batch_as_read(&self, batch: &Batch) {
        self.orchestrator.delete(&batch.path);
    }
}
