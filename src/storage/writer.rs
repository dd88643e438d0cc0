//! Appends one serialized event to the current writable file.
//!
//! Grounded on `KodrAus-emit/emitter/file`'s `ActiveFile::write_event`: the
//! separator and event bytes are combined into a single buffer and written
//! with one `write`/`flush` pair, minimizing the window in which a crash
//! could leave a half-written separator on disk.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::config::FeatureConfig;
use crate::error::StorageError;
use crate::storage::orchestrator::FilesOrchestrator;
use crate::telemetry::{Telemetry, TelemetryEvent};

/// Appends events to the feature's current writable file.
///
/// All calls for a single feature are expected to run on that feature's
/// serial ingest context; `Writer` itself does no internal locking beyond
/// what [`FilesOrchestrator`] already provides.
pub struct Writer {
    orchestrator: Arc<FilesOrchestrator>,
    config: FeatureConfig,
    telemetry: Arc<dyn Telemetry>,
}

impl Writer {
    /// Creates a writer bound to `orchestrator`.
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

    /// Appends `event` to the current writable file, framed with a leading
    /// separator if the file is non-empty. Never propagates an error to the
    /// caller: failures are reported to telemetry and the event is dropped.
    #[instrument(skip(self, event), fields(feature = %self.config.feature_name, len = event.len()))]
    pub async fn write(&self, event: &[u8]) {
        if let Err(e) = self.try_write(event).await {
            warn!(feature = %self.config.feature_name, error = %e, "dropping event after write failure");
            self.telemetry.error(TelemetryEvent {
                feature_name: self.config.feature_name.clone(),
                category: "storage.write",
                message: e.to_string(),
            });
        }
    }

    async fn try_write(&self, event: &[u8]) -> Result<(), StorageError> {
        let path = self.orchestrator.get_writable_file(event.len()).await?;
        let existing_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let mut buf = Vec::with_capacity(event.len() + self.config.data_format.separator.len());
        if existing_size > 0 {
            buf.extend_from_slice(&self.config.data_format.separator);
        }
        buf.extend_from_slice(event);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(path.clone(), e))?;
        file.write_all(&buf).map_err(|e| StorageError::io(path.clone(), e))?;
        file.flush().map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }
}
