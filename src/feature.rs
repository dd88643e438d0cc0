//! Top-level façade wiring the Writer, storage, and upload worker together
//! for a single feature (logs, traces, RUM, or internal telemetry).
//!
//! Plays the role of a single public façade over a feature's internal
//! storage and upload worker, the way an engine-style type fronts its
//! queue/client/rate-limiter internals.

use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::config::FeatureConfig;
use crate::conditions::UploadConditions;
use crate::delay::Delay;
use crate::storage::{FilesOrchestrator, Reader, Writer};
use crate::telemetry::{NullTelemetry, Telemetry};
use crate::upload::Uploader;
use crate::worker::UploadWorker;

/// One feature's full pipeline: ingest via [`Self::write`], background
/// upload via [`UploadWorker`], and lifecycle control via [`Self::flush`]/
/// [`Self::cancel`].
pub struct Feature {
    writer: Writer,
    worker: UploadWorker,
    orchestrator: Arc<FilesOrchestrator>,
}

impl Feature {
    /// Builds a feature pipeline rooted at `root/<feature_name>`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError`] if the feature directory
    /// cannot be created.
    pub fn new(
        root: &Path,
        config: FeatureConfig,
        conditions: UploadConditions,
        uploader: Arc<dyn Uploader>,
    ) -> Result<Self, crate::error::StorageError> {
        Self::with_telemetry(root, config, conditions, uploader, Arc::new(NullTelemetry))
    }

    /// Same as [`Self::new`] but with an explicit [`Telemetry`] sink instead
    /// of the no-op default.
    pub fn with_telemetry(
        root: &Path,
        config: FeatureConfig,
        conditions: UploadConditions,
        uploader: Arc<dyn Uploader>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Result<Self, crate::error::StorageError> {
        let directory = root.join(&config.feature_name);
        let orchestrator = Arc::new(FilesOrchestrator::new(
            directory,
            config.clone(),
            Arc::clone(&telemetry),
        )?);

        let writer = Writer::new(Arc::clone(&orchestrator), config.clone(), Arc::clone(&telemetry));
        let reader = Arc::new(Reader::new(
            Arc::clone(&orchestrator),
            config.clone(),
            Arc::clone(&telemetry),
        ));
        let delay = Delay::new(config.delay);
        let worker = UploadWorker::spawn(
            config,
            reader,
            Arc::new(conditions),
            uploader,
            delay,
            telemetry,
        );

        Ok(Self {
            writer,
            worker,
            orchestrator,
        })
    }

    /// Submits `event_bytes` for eventual upload. Non-blocking to the
    /// caller's intent and infallible: on failure, the event is dropped and
    /// reported through telemetry, never propagated here.
    #[instrument(skip(self, event_bytes), fields(len = event_bytes.len()))]
    pub async fn write(&self, event_bytes: &[u8]) {
        self.writer.write(event_bytes).await;
    }

    /// Blocks until every currently-staged batch has been uploaded
    /// (unconditionally) and the feature directory is empty.
    pub async fn flush(&self) {
        self.worker.flush_synchronously().await;
    }

    /// Stops the upload worker. After this returns, no further upload
    /// attempts occur; any data still on disk is left in place.
    pub async fn cancel(&self) {
        self.worker.cancel_synchronously().await;
    }

    /// Observability counters for this feature's upload worker.
    #[must_use]
    pub fn stats(&self) -> &crate::worker::UploadStats {
        self.worker.stats()
    }

    /// Deletes every file currently staged for this feature, uploaded or
    /// not. Intended for tests and explicit user-initiated data wipes.
    pub fn clear(&self) {
        self.orchestrator.delete_all_readable();
    }
}
