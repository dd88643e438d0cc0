//! Event persistence and upload pipeline for an observability SDK.
//!
//! Collects already-serialized telemetry events (logs, traces, RUM) from
//! product front-ends, stages them durably on disk, and delivers them in
//! batches to a remote ingestion endpoint with adaptive scheduling, retry,
//! and bounded disk usage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`storage`] - file-as-queue durable persistence (`FilesOrchestrator`, `Writer`, `Reader`)
//! - [`conditions`] - device-health preconditions (battery, network, low-power mode)
//! - [`delay`] - adaptive, bounded inter-upload delay
//! - [`upload`] - upload outcome taxonomy and the `Uploader`/`RequestBuilder` abstraction
//! - [`worker`] - the cooperative upload tick loop
//! - [`feature`] - the public façade tying a feature's pipeline together
//! - [`registry`] - the multi-feature registry a host SDK uses to run several pipelines side by side
//! - [`config`] - per-feature configuration and performance presets
//! - [`telemetry`] - the dual user-logger / internal-telemetry diagnostic channels
//! - [`error`] - error taxonomy for storage, configuration, and transport failures

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod conditions;
pub mod config;
pub mod delay;
pub mod error;
pub mod feature;
pub mod registry;
pub mod storage;
pub mod telemetry;
pub mod upload;
pub mod worker;

// Re-export commonly used types
pub use config::{DataFormat, DelayConfig, FeatureConfig, PerformancePreset};
pub use conditions::{
    Blocker, BatteryStatusProvider, DateProvider, NetworkInfoProvider, PowerState, SystemDateProvider,
    UploadConditions,
};
pub use delay::Delay;
pub use error::{ConfigError, StorageError, TransportError};
pub use feature::Feature;
pub use registry::FeatureRegistry;
pub use storage::{Batch, FilesOrchestrator, Reader, StoredFile, Writer};
pub use telemetry::{NullTelemetry, Telemetry, TelemetryEvent, TracingTelemetry};
pub use upload::{RequestBuilder, UploadError, UploadStatus, Uploader, classify_http_status};
pub use worker::{UploadStats, UploadWorker};
