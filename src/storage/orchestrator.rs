//! Decides which file is writable, which is readable next, and enforces
//! per-file/per-directory size, age, and count limits.
//!
//! Grounded on `KodrAus-emit/emitter/file`'s `ActiveFileSet::apply_retention`
//! (FIFO eviction by sorted filename) and `Worker::on_batch`'s reuse-or-create
//! decision. The per-key bookkeeping style (a small piece of mutable state
//! behind a lock) mirrors `download::rate_limiter::RateLimiter`'s
//! `DashMap<String, Arc<DomainState>>` pattern, scaled down to a single key
//! since one orchestrator instance serves exactly one feature directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::FeatureConfig;
use crate::conditions::{DateProvider, SystemDateProvider};
use crate::error::StorageError;
use crate::storage::file::StoredFile;
use crate::telemetry::{Telemetry, TelemetryEvent};

/// Last-writable-file bookkeeping, touched only from the Writer's serial
/// execution context.
struct WritableState {
    file: StoredFile,
    uses_count: u32,
}

/// File selection and directory hygiene for a single feature.
pub struct FilesOrchestrator {
    directory: PathBuf,
    config: FeatureConfig,
    telemetry: Arc<dyn Telemetry>,
    date: Arc<dyn DateProvider>,
    writable: Mutex<Option<WritableState>>,
}

impl FilesOrchestrator {
    /// Creates an orchestrator rooted at `directory`, creating it if absent,
    /// reading the wall clock through the default [`SystemDateProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryInit`] if the directory cannot be
    /// created.
    pub fn new(
        directory: PathBuf,
        config: FeatureConfig,
        telemetry: Arc<dyn Telemetry>,
    ) -> Result<Self, StorageError> {
        Self::with_date_provider(directory, config, telemetry, Arc::new(SystemDateProvider))
    }

    /// Same as [`Self::new`] but with an explicit [`DateProvider`], letting
    /// tests drive file age deterministically instead of sleeping on the
    /// wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryInit`] if the directory cannot be
    /// created.
    pub fn with_date_provider(
        directory: PathBuf,
        config: FeatureConfig,
        telemetry: Arc<dyn Telemetry>,
        date: Arc<dyn DateProvider>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&directory)
            .map_err(|e| StorageError::directory_init(directory.clone(), e))?;
        Ok(Self {
            directory,
            config,
            telemetry,
            date,
            writable: Mutex::new(None),
        })
    }

    /// Returns the directory this orchestrator manages.
    #[must_use]
    pub fn directory(&self) -> &std::path::Path {
        &self.directory
    }

    fn list_files(&self) -> Vec<StoredFile> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, dir = %self.directory.display(), "failed to list feature directory");
                return Vec::new();
            }
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| StoredFile::from_path(entry.path()))
            .collect()
    }

    /// Returns a file the caller may append `write_size` bytes to, reusing
    /// the previous writable file when it is still eligible, otherwise
    /// purging the directory and creating a new one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooLarge`] if `write_size` exceeds
    /// `max_object_size`.
    #[instrument(skip(self), fields(feature = %self.config.feature_name))]
    pub async fn get_writable_file(&self, write_size: usize) -> Result<PathBuf, StorageError> {
        if write_size > self.config.max_object_size {
            return Err(StorageError::too_large(write_size, self.config.max_object_size));
        }

        let mut guard = self.writable.lock().await;
        let now_ms = self.date.now_ms();

        if let Some(state) = guard.as_mut() {
            let current_size = fs::metadata(state.file.path()).map(|m| m.len()).unwrap_or(0);
            let eligible = state.file.path().exists()
                && state.file.age(now_ms) <= self.config.max_file_age_for_write
                && current_size as usize + write_size <= self.config.max_file_size
                && state.uses_count < self.config.max_objects_in_file;
            if eligible {
                state.uses_count += 1;
                debug!(path = %state.file.path().display(), uses = state.uses_count, "reusing writable file");
                return Ok(state.file.path().to_path_buf());
            }
        }

        self.purge_directory();
        let file = StoredFile::new_name(&self.directory, now_ms);
        debug!(path = %file.path().display(), "creating new writable file");
        let path = file.path().to_path_buf();
        *guard = Some(WritableState { file, uses_count: 1 });
        Ok(path)
    }

    /// Returns the oldest readable file not in `exclude`, or `None` if no
    /// file currently qualifies. Deletes any file whose age exceeds
    /// `max_file_age_for_read` as a side effect.
    #[instrument(skip(self, exclude), fields(feature = %self.config.feature_name))]
    pub fn get_readable_file(&self, exclude: &[PathBuf]) -> Option<PathBuf> {
        let now_ms = self.date.now_ms();
        let mut files = self.list_files();
        files.sort_by_key(StoredFile::created_at_ms);

        let mut candidate = None;
        for file in files {
            let age = file.age(now_ms);
            if age > self.config.max_file_age_for_read {
                debug!(path = %file.path().display(), "evicting file past max_file_age_for_read");
                self.delete(file.path());
                continue;
            }
            if age < self.config.min_file_age_for_read {
                continue;
            }
            if exclude.iter().any(|p| p == file.path()) {
                continue;
            }
            candidate = Some(file.path().to_path_buf());
            break;
        }
        candidate
    }

    /// Best-effort deletion; logs on failure but never surfaces it to the
    /// caller (a file that is already gone is not an error).
    pub fn delete(&self, path: &std::path::Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to delete file");
                self.telemetry.error(TelemetryEvent {
                    feature_name: self.config.feature_name.clone(),
                    category: "storage.io",
                    message: format!("failed to delete {}: {e}", path.display()),
                });
            }
        }
    }

    /// Removes every file currently in the feature directory.
    pub fn delete_all_readable(&self) {
        for file in self.list_files() {
            self.delete(file.path());
        }
    }

    /// Evicts the oldest files (FIFO, by filename) until the directory's
    /// aggregate size is under `max_directory_size`. Invoked only when a new
    /// writable file is about to be created, keeping the hot write path free
    /// of directory-wide scans.
    fn purge_directory(&self) {
        let mut files = self.list_files();
        files.sort_by_key(StoredFile::created_at_ms);
        let mut total: u64 = files
            .iter()
            .map(|f| fs::metadata(f.path()).map(|m| m.len()).unwrap_or(0))
            .sum();

        let mut idx = 0;
        while total >= self.config.max_directory_size && idx < files.len() {
            let file = &files[idx];
            let size = fs::metadata(file.path()).map(|m| m.len()).unwrap_or(0);
            debug!(path = %file.path().display(), "evicting file to satisfy max_directory_size");
            self.delete(file.path());
            total = total.saturating_sub(size);
            idx += 1;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PerformancePreset;
    use crate::telemetry::NullTelemetry;
    use std::time::Duration;

    fn config() -> FeatureConfig {
        FeatureConfig::new(
            "test",
            PerformancePreset::Frequent,
            1024,
            4096,
            Duration::from_millis(0),
            Duration::from_millis(50),
            Duration::from_secs(3600),
            3,
            1024 * 1024,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reuses_writable_file_within_limits() {
        let dir = tempfile::tempdir().unwrap();
        let orch = FilesOrchestrator::new(
            dir.path().to_path_buf(),
            config(),
            Arc::new(NullTelemetry),
        )
        .unwrap();
        let first = orch.get_writable_file(10).await.unwrap();
        let second = orch.get_writable_file(10).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rejects_oversized_object() {
        let dir = tempfile::tempdir().unwrap();
        let orch = FilesOrchestrator::new(
            dir.path().to_path_buf(),
            config(),
            Arc::new(NullTelemetry),
        )
        .unwrap();
        let err = orch.get_writable_file(2000).await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn creates_new_file_after_max_objects_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let orch = FilesOrchestrator::new(
            dir.path().to_path_buf(),
            config(),
            Arc::new(NullTelemetry),
        )
        .unwrap();
        let first = orch.get_writable_file(10).await.unwrap();
        let _ = orch.get_writable_file(10).await.unwrap();
        let _ = orch.get_writable_file(10).await.unwrap();
        // fourth call exceeds max_objects_in_file (3): must roll to a new file
        let fourth = orch.get_writable_file(10).await.unwrap();
        assert_ne!(first, fourth);
    }

    #[tokio::test]
    async fn readable_file_respects_min_age() {
        let dir = tempfile::tempdir().unwrap();
        let orch = FilesOrchestrator::new(
            dir.path().to_path_buf(),
            config(),
            Arc::new(NullTelemetry),
        )
        .unwrap();
        let path = orch.get_writable_file(10).await.unwrap();
        fs::write(&path, b"hello").unwrap();
        // too young yet (min_file_age_for_read = 50ms)
        assert!(orch.get_readable_file(&[]).is_none());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(orch.get_readable_file(&[]), Some(path));
    }

    struct FakeClock(std::sync::atomic::AtomicU64);

    impl DateProvider for FakeClock {
        fn now_ms(&self) -> u64 {
            self.0.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn readable_file_respects_min_age_with_fake_clock() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FakeClock(std::sync::atomic::AtomicU64::new(1_000)));
        let orch = FilesOrchestrator::with_date_provider(
            dir.path().to_path_buf(),
            config(),
            Arc::new(NullTelemetry),
            clock.clone(),
        )
        .unwrap();
        let path = orch.get_writable_file(10).await.unwrap();
        fs::write(&path, b"hello").unwrap();

        // still at the same instant the file was created: too young to read.
        assert!(orch.get_readable_file(&[]).is_none());

        // advance the fake clock well past min_file_age_for_read (50ms)
        // without any wall-clock sleep.
        clock.0.store(1_000 + 80, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(orch.get_readable_file(&[]), Some(path));
    }

    #[test]
    fn delete_is_idempotent_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let orch = FilesOrchestrator::new(
            dir.path().to_path_buf(),
            config(),
            Arc::new(NullTelemetry),
        )
        .unwrap();
        orch.delete(&dir.path().join("does-not-exist"));
    }
}
