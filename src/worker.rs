//! The upload worker: a single cooperative loop bound to one feature's
//! serial upload execution context.
//!
//! Shaped like an async task runner with atomic-counter stats tracking,
//! adapted from semaphore-bounded concurrency down to a strictly single-threaded,
//! single-upload-in-flight model. The worker's own task is the sole owner
//! of its reschedule decision: `flush_synchronously`/`cancel_synchronously`
//! are implemented as commands processed on that same task via a
//! `tokio::sync::mpsc` channel, so cancellation can never race a tick that
//! is mid-reschedule — the one concurrency invariant the design notes
//! single out as most important.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::conditions::UploadConditions;
use crate::config::FeatureConfig;
use crate::delay::Delay;
use crate::storage::reader::Reader;
use crate::telemetry::{Telemetry, TelemetryEvent};
use crate::upload::Uploader;

/// Atomic counters observing a worker's activity, in the style of
/// `download::engine::DownloadStats`.
#[derive(Debug, Default)]
pub struct UploadStats {
    uploads_succeeded: AtomicU64,
    uploads_retried: AtomicU64,
    uploads_dropped: AtomicU64,
    ticks_with_no_batch: AtomicU64,
}

impl UploadStats {
    /// Number of batches successfully delivered and deleted.
    #[must_use]
    pub fn uploads_succeeded(&self) -> u64 {
        self.uploads_succeeded.load(Ordering::SeqCst)
    }

    /// Number of uploads that failed in a retryable way (file retained).
    #[must_use]
    pub fn uploads_retried(&self) -> u64 {
        self.uploads_retried.load(Ordering::SeqCst)
    }

    /// Number of batches dropped after a non-retryable failure.
    #[must_use]
    pub fn uploads_dropped(&self) -> u64 {
        self.uploads_dropped.load(Ordering::SeqCst)
    }

    /// Number of ticks that found nothing to upload (blocked or empty directory).
    #[must_use]
    pub fn ticks_with_no_batch(&self) -> u64 {
        self.ticks_with_no_batch.load(Ordering::SeqCst)
    }
}

enum Command {
    Flush(oneshot::Sender<()>),
    Cancel(oneshot::Sender<()>),
}

/// Handle to a running [`UploadWorker`] task. Dropping the handle does not
/// stop the worker — call [`Self::cancel_synchronously`] explicitly.
pub struct UploadWorker {
    commands: mpsc::Sender<Command>,
    stats: Arc<UploadStats>,
}

impl UploadWorker {
    /// Spawns the worker's cooperative tick loop as its own tokio task and
    /// returns a handle to it. The first tick is scheduled after
    /// `delay.current()`.
    pub fn spawn(
        feature_config: FeatureConfig,
        reader: Arc<Reader>,
        conditions: Arc<UploadConditions>,
        uploader: Arc<dyn Uploader>,
        delay: Delay,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(8);
        let stats = Arc::new(UploadStats::default());
        let loop_stats = Arc::clone(&stats);
        tokio::spawn(run_loop(
            feature_config,
            reader,
            conditions,
            uploader,
            delay,
            telemetry,
            rx,
            loop_stats,
        ));
        Self { commands: tx, stats }
    }

    /// Observability counters for this worker.
    #[must_use]
    pub fn stats(&self) -> &UploadStats {
        &self.stats
    }

    /// Blocks until every currently-present file has been uploaded
    /// (unconditionally, bypassing [`UploadConditions`]) and deleted,
    /// regardless of the upload's outcome. Used at shutdown and in tests.
    pub async fn flush_synchronously(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Cancels the pending scheduled tick and stops the worker loop. Runs on
    /// the worker's own task, so it cannot race a tick that is about to
    /// reschedule. An in-flight tick is allowed to complete first.
    pub async fn cancel_synchronously(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Cancel(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    config: FeatureConfig,
    reader: Arc<Reader>,
    conditions: Arc<UploadConditions>,
    uploader: Arc<dyn Uploader>,
    mut delay: Delay,
    telemetry: Arc<dyn Telemetry>,
    mut commands: mpsc::Receiver<Command>,
    stats: Arc<UploadStats>,
) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(delay.jittered_current()) => {
                tick(&config, &reader, &conditions, &uploader, &mut delay, &telemetry, &stats).await;
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Flush(reply)) => {
                        flush(&config, &reader, &uploader, &telemetry, &stats).await;
                        let _ = reply.send(());
                    }
                    Some(Command::Cancel(reply)) => {
                        debug!(feature = %config.feature_name, "upload worker cancelled");
                        let _ = reply.send(());
                        return;
                    }
                    None => return,
                }
            }
        }
    }
}

/// The state machine in `SPEC_FULL.md` §4.5: `Idle → Reading → Uploading →
/// (Acked | Retained) → Scheduled`.
#[instrument(skip_all, fields(feature = %config.feature_name))]
async fn tick(
    config: &FeatureConfig,
    reader: &Arc<Reader>,
    conditions: &Arc<UploadConditions>,
    uploader: &Arc<dyn Uploader>,
    delay: &mut Delay,
    telemetry: &Arc<dyn Telemetry>,
    stats: &Arc<UploadStats>,
) {
    let blockers = conditions.blockers().await;
    let batch = if blockers.is_empty() {
        reader.read_next_batch()
    } else {
        debug!(blockers = ?blockers, "upload skipped this tick");
        None
    };

    match batch {
        Some(batch) => {
            let status = uploader.upload(&batch.bytes).await;
            if status.needs_retry {
                stats.uploads_retried.fetch_add(1, Ordering::SeqCst);
                delay.increase();
            } else {
                reader.mark_batch_as_read(&batch);
                if status.is_success() {
                    stats.uploads_succeeded.fetch_add(1, Ordering::SeqCst);
                } else {
                    stats.uploads_dropped.fetch_add(1, Ordering::SeqCst);
                }
                delay.decrease();
            }
            if let Some(error) = &status.error {
                warn!(feature = %config.feature_name, ?error, "upload did not succeed");
                telemetry.error(TelemetryEvent {
                    feature_name: config.feature_name.clone(),
                    category: "upload.status",
                    message: format!("{error:?}"),
                });
            } else {
                info!(feature = %config.feature_name, "batch uploaded");
            }
        }
        None => {
            stats.ticks_with_no_batch.fetch_add(1, Ordering::SeqCst);
            delay.increase();
        }
    }
}

async fn flush(
    config: &FeatureConfig,
    reader: &Arc<Reader>,
    uploader: &Arc<dyn Uploader>,
    telemetry: &Arc<dyn Telemetry>,
    stats: &Arc<UploadStats>,
) {
    debug!(feature = %config.feature_name, "flushing pending batches synchronously");
    while let Some(batch) = reader.read_next_batch() {
        let status = uploader.upload(&batch.bytes).await;
        reader.mark_batch_as_read(&batch);
        if status.is_success() {
            stats.uploads_succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            stats.uploads_dropped.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = &status.error {
                telemetry.error(TelemetryEvent {
                    feature_name: config.feature_name.clone(),
                    category: "upload.flush",
                    message: format!("{error:?}"),
                });
            }
        }
    }
}

/// A shared, lockable [`Delay`], used when an [`crate::upload::http::HttpUploader`]
/// needs to raise the floor for the next tick in response to a server hint.
pub type SharedDelay = Arc<Mutex<Delay>>;
