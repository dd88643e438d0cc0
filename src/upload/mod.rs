//! Upload abstraction: the pipeline core delegates HTTP transport mechanics
//! to an [`Uploader`], built from a [`RequestBuilder`] it does not inspect.

pub mod http;
pub mod status;

pub use status::{UploadError, UploadStatus, classify_http_status, classify_transport_error};

use async_trait::async_trait;

/// Supplies everything an [`Uploader`] needs to address a request, without
/// the core ever inspecting the specifics (endpoint, auth, compression are
/// entirely the product's concern).
pub trait RequestBuilder: Send + Sync {
    /// Full URL events for this feature should be POSTed to.
    fn endpoint(&self) -> String;
    /// Headers to attach, e.g. client-token, content-type.
    fn headers(&self) -> Vec<(String, String)>;
    /// Whether the request body should be gzip-compressed.
    fn compress(&self) -> bool {
        false
    }
}

/// Delivers one already-framed batch payload and reports the outcome.
///
/// Implementations must never panic on a failed delivery: every failure
/// mode is expressed as an [`UploadStatus`] variant.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads `payload` (the framed batch bytes) and returns the outcome.
    async fn upload(&self, payload: &[u8]) -> UploadStatus;
}
