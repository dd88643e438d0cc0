//! Dual diagnostic channels: a human-facing logger and a machine-collected
//! telemetry sink.
//!
//! The pipeline never propagates its internal errors to event producers
//! (see `write`/`flush`/`cancel` on [`crate::feature::Feature`]); instead
//! every failure is reported through exactly one of these two channels.

use std::fmt;

/// A machine-collected error event, handed to a [`Telemetry`] sink.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    /// The feature that produced this event.
    pub feature_name: String,
    /// Short, stable category for aggregation (`"storage.io"`, `"upload.http"`, ...).
    pub category: &'static str,
    /// Human-readable detail, not meant for end users.
    pub message: String,
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.feature_name, self.category, self.message)
    }
}

/// Sink for internal error events, distinct from the human-facing logger.
///
/// Host applications implement this to forward pipeline errors into their
/// own crash-reporting or metrics collector. A no-op default is provided
/// via [`NullTelemetry`].
pub trait Telemetry: Send + Sync {
    /// Records an internal error event.
    fn error(&self, event: TelemetryEvent);
}

/// Telemetry sink that discards every event. The default for pipelines that
/// don't wire in a host collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn error(&self, _event: TelemetryEvent) {}
}

/// Telemetry sink that logs via `tracing::error!`, useful for local
/// development and for tests that want to observe failures without wiring
/// a full host collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn error(&self, event: TelemetryEvent) {
        tracing::error!(
            feature = %event.feature_name,
            category = event.category,
            message = %event.message,
            "pipeline error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CollectingTelemetry {
        events: Arc<Mutex<Vec<TelemetryEvent>>>,
    }

    impl Telemetry for CollectingTelemetry {
        fn error(&self, event: TelemetryEvent) {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        }
    }

    #[test]
    fn null_telemetry_drops_everything() {
        let sink = NullTelemetry;
        sink.error(TelemetryEvent {
            feature_name: "logs".into(),
            category: "storage.io",
            message: "disk full".into(),
        });
    }

    #[test]
    fn collecting_sink_records_events() {
        let sink = CollectingTelemetry::default();
        sink.error(TelemetryEvent {
            feature_name: "rum".into(),
            category: "upload.http",
            message: "503".into(),
        });
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].feature_name, "rum");
    }
}
