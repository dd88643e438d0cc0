//! Multi-feature registry: the SDK may host several independent feature
//! pipelines (logs, traces, RUM, internal telemetry) side by side, each with
//! its own directory, writer, and upload worker (`SPEC_FULL.md` §5).
//!
//! Grounded on `download::rate_limiter::RateLimiter`'s
//! `DashMap<String, Arc<DomainState>>` pattern: lock-free concurrent access
//! to per-key state, scaled here from per-domain state to per-feature-name
//! pipelines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::conditions::UploadConditions;
use crate::config::FeatureConfig;
use crate::error::StorageError;
use crate::feature::Feature;
use crate::telemetry::{NullTelemetry, Telemetry};
use crate::upload::Uploader;

/// Owns every feature pipeline a host application has registered, keyed by
/// feature name. Features never share files or ordering with one another;
/// the registry is purely a convenience for looking pipelines up by name and
/// for driving shutdown across all of them at once.
pub struct FeatureRegistry {
    root: PathBuf,
    telemetry: Arc<dyn Telemetry>,
    features: DashMap<String, Arc<Feature>>,
}

impl FeatureRegistry {
    /// Creates an empty registry rooted at `root`. Each registered feature's
    /// directory is created at `root/<feature_name>`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_telemetry(root, Arc::new(NullTelemetry))
    }

    /// Same as [`Self::new`] but with an explicit [`Telemetry`] sink shared
    /// by every feature registered afterward.
    #[must_use]
    pub fn with_telemetry(root: impl Into<PathBuf>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            root: root.into(),
            telemetry,
            features: DashMap::new(),
        }
    }

    /// Root directory this registry's features are created under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registers a feature pipeline under `config.feature_name`, or returns
    /// the already-registered pipeline of that name unchanged.
    ///
    /// Re-registration is intentionally idempotent rather than an error:
    /// host SDK init code commonly runs its feature setup more than once
    /// across process lifetimes (e.g. reconfiguring on app foreground), and
    /// returning the existing pipeline avoids spawning a second upload
    /// worker racing the first one over the same directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryInit`] if the feature's directory
    /// cannot be created.
    pub fn register(
        &self,
        config: FeatureConfig,
        conditions: UploadConditions,
        uploader: Arc<dyn Uploader>,
    ) -> Result<Arc<Feature>, StorageError> {
        match self.features.entry(config.feature_name.clone()) {
            Entry::Occupied(existing) => Ok(Arc::clone(existing.get())),
            Entry::Vacant(vacant) => {
                let feature = Arc::new(Feature::with_telemetry(
                    &self.root,
                    config,
                    conditions,
                    uploader,
                    Arc::clone(&self.telemetry),
                )?);
                vacant.insert(Arc::clone(&feature));
                Ok(feature)
            }
        }
    }

    /// Looks up a previously registered feature by name.
    #[must_use]
    pub fn get(&self, feature_name: &str) -> Option<Arc<Feature>> {
        self.features.get(feature_name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of features currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no feature has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Flushes every registered feature, sequentially, draining each one's
    /// directory before moving to the next. Used at shutdown alongside
    /// [`Self::cancel_all`].
    pub async fn flush_all(&self) {
        for feature in self.snapshot() {
            feature.flush().await;
        }
    }

    /// Cancels every registered feature's upload worker, sequentially.
    pub async fn cancel_all(&self) {
        for feature in self.snapshot() {
            feature.cancel().await;
        }
    }

    /// Clones the current set of registered features out from under the
    /// map, so the async drain loops above don't hold a `DashMap` shard
    /// lock across an `.await`.
    fn snapshot(&self) -> Vec<Arc<Feature>> {
        self.features.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::conditions::{BatteryStatusProvider, NetworkInfoProvider, PowerState};
    use crate::config::PerformancePreset;
    use crate::upload::UploadStatus;
    use async_trait::async_trait;
    use std::time::Duration;

    struct AlwaysAllowed;

    #[async_trait]
    impl BatteryStatusProvider for AlwaysAllowed {
        async fn status(&self) -> (u8, PowerState) {
            (100, PowerState::Charging)
        }
        async fn low_power_mode_on(&self) -> bool {
            false
        }
    }

    #[async_trait]
    impl NetworkInfoProvider for AlwaysAllowed {
        async fn is_reachable(&self) -> bool {
            true
        }
    }

    struct NoopUploader;

    #[async_trait]
    impl Uploader for NoopUploader {
        async fn upload(&self, _payload: &[u8]) -> UploadStatus {
            UploadStatus::success()
        }
    }

    fn config(feature_name: &str) -> FeatureConfig {
        let mut cfg = FeatureConfig::new(
            feature_name,
            PerformancePreset::Frequent,
            1024,
            4096,
            Duration::from_millis(0),
            Duration::from_millis(5),
            Duration::from_secs(3600),
            100,
            1024 * 1024,
        )
        .unwrap();
        cfg.delay.initial = Duration::from_secs(60);
        cfg.delay.min = Duration::from_secs(60);
        cfg
    }

    fn conditions() -> UploadConditions {
        UploadConditions::new(Box::new(AlwaysAllowed), Box::new(AlwaysAllowed))
    }

    #[tokio::test]
    async fn registers_independent_features_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FeatureRegistry::new(dir.path().to_path_buf());

        let logs = registry
            .register(config("logs"), conditions(), Arc::new(NoopUploader))
            .unwrap();
        let traces = registry
            .register(config("traces"), conditions(), Arc::new(NoopUploader))
            .unwrap();

        assert_eq!(registry.len(), 2);
        logs.write(b"log-event").await;
        traces.write(b"trace-event").await;

        assert!(dir.path().join("logs").exists());
        assert!(dir.path().join("traces").exists());

        registry.cancel_all().await;
    }

    #[tokio::test]
    async fn re_registering_same_name_returns_existing_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FeatureRegistry::new(dir.path().to_path_buf());

        let first = registry
            .register(config("rum"), conditions(), Arc::new(NoopUploader))
            .unwrap();
        let second = registry
            .register(config("rum"), conditions(), Arc::new(NoopUploader))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        registry.cancel_all().await;
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_feature() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FeatureRegistry::new(dir.path().to_path_buf());
        assert!(registry.get("unknown").is_none());
    }
}
