//! Outcome taxonomy for a single batch upload attempt.
//!
//! Generalizes `download::retry::{FailureType, classify_http_status}` (an
//! explicit per-status-code match, kept for documentation purposes even
//! where arms repeat) from the download-oriented `FailureType` taxonomy to
//! this crate's upload-oriented [`UploadStatus`]/[`UploadError`] taxonomy.

use tracing::instrument;

/// The specific error an upload attempt encountered, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The client token (API key) was rejected. Logged loudly once; retrying
    /// with the same token will fail identically.
    Unauthorized,
    /// A non-2xx HTTP response not covered by a more specific variant.
    HttpError(u16),
    /// A transport-level failure (DNS, TLS, connect, timeout) occurred
    /// before any HTTP response was obtained.
    NetworkError(String),
    /// An unexpected redirect was returned for an ingestion endpoint.
    Redirection,
    /// The client token was structurally invalid (malformed, empty) and was
    /// rejected before the request was even sent.
    ClientTokenError,
    /// The server reported an internal error (5xx).
    ServerError,
    /// The response body could not be parsed as the expected acknowledgment.
    ResponseError,
}

/// Outcome of one `uploader.upload(batch)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    /// Whether the batch's file should be retained for a later retry.
    pub needs_retry: bool,
    /// The specific failure, or `None` on success.
    pub error: Option<UploadError>,
}

impl UploadStatus {
    /// A successful delivery: no retry needed, no error.
    #[must_use]
    pub fn success() -> Self {
        Self {
            needs_retry: false,
            error: None,
        }
    }

    /// Whether this status represents a successful delivery.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Classifies an HTTP status code into an [`UploadStatus`].
///
/// | Status | `needs_retry` | `error` |
/// |--------|---------------|---------|
/// | 2xx | false | `None` |
/// | 3xx | false | `Redirection` |
/// | 401 | false | `Unauthorized` (non-retryable, logged loudly) |
/// | 408, 429 | true | `HttpError` |
/// | other 4xx | false | `HttpError` |
/// | 5xx | true | `ServerError` |
#[instrument]
#[allow(clippy::match_same_arms)]
pub fn classify_http_status(status: u16) -> UploadStatus {
    match status {
        200..=299 => UploadStatus::success(),

        401 => UploadStatus {
            needs_retry: false,
            error: Some(UploadError::Unauthorized),
        },

        408 => UploadStatus {
            needs_retry: true,
            error: Some(UploadError::HttpError(408)),
        },
        429 => UploadStatus {
            needs_retry: true,
            error: Some(UploadError::HttpError(429)),
        },

        status if (400..500).contains(&status) => UploadStatus {
            needs_retry: false,
            error: Some(UploadError::HttpError(status)),
        },

        status if (500..600).contains(&status) => UploadStatus {
            needs_retry: true,
            error: Some(UploadError::ServerError),
        },

        status if (300..400).contains(&status) => UploadStatus {
            needs_retry: false,
            error: Some(UploadError::Redirection),
        },

        status => UploadStatus {
            needs_retry: false,
            error: Some(UploadError::HttpError(status)),
        },
    }
}

/// Classifies a transport-level failure (no HTTP response obtained) into an
/// [`UploadStatus`]. Always retryable: the batch's file is retained so the
/// next tick can try again once connectivity recovers.
#[must_use]
pub fn classify_transport_error(cause: impl Into<String>) -> UploadStatus {
    UploadStatus {
        needs_retry: true,
        error: Some(UploadError::NetworkError(cause.into())),
    }
}
