//! Default `reqwest`-based [`Uploader`].
//!
//! HTTP transport mechanics are delegated per the pipeline's design — this
//! module exists so the crate is usable out of the box. Connection reuse (a
//! single shared `reqwest::Client` rather than one per request) avoids
//! repeated TLS handshakes and connection-pool churn.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::delay::Delay;
use crate::error::TransportError;
use crate::upload::status::{UploadError, UploadStatus, classify_http_status, classify_transport_error};
use crate::upload::{RequestBuilder, Uploader};

/// Ceiling applied to a parsed `Retry-After` value, mirroring
/// `download::rate_limiter`'s `MAX_RETRY_AFTER` cap of one hour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Default HTTP uploader. Reuses a single `reqwest::Client` across uploads
/// and, on a 429 response, feeds a parsed `Retry-After` value back into the
/// shared [`Delay`] as a floor for the worker's next tick.
pub struct HttpUploader {
    client: reqwest::Client,
    builder: Arc<dyn RequestBuilder>,
    delay: Option<Arc<tokio::sync::Mutex<Delay>>>,
}

impl HttpUploader {
    /// Creates an uploader addressing requests via `builder`.
    #[must_use]
    pub fn new(builder: Arc<dyn RequestBuilder>) -> Self {
        Self {
            client: reqwest::Client::new(),
            builder,
            delay: None,
        }
    }

    /// Wires a shared [`Delay`] so a `Retry-After` header can raise its
    /// floor for the next tick.
    #[must_use]
    pub fn with_delay(mut self, delay: Arc<tokio::sync::Mutex<Delay>>) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn apply_retry_after(&self, value: &str) {
        if let (Some(delay_handle), Some(parsed)) = (&self.delay, parse_retry_after(value)) {
            delay_handle.lock().await.raise_floor(parsed);
        }
    }

    /// Builds the outgoing request, validating the endpoint and header
    /// values before handing anything to `reqwest`. Grounded on
    /// `download::client::HttpClient`'s own `Url::parse(url).map_err(...)?`
    /// validation at the top of its request path.
    ///
    /// When `self.builder.compress()` is set, the body is gzipped and a
    /// `Content-Encoding: gzip` header is attached, per `SPEC_FULL.md`
    /// §10.4.
    fn build_request(&self, payload: &[u8]) -> Result<reqwest::RequestBuilder, TransportError> {
        let endpoint = self.builder.endpoint();
        url::Url::parse(&endpoint)
            .map_err(|e| TransportError::Build(format!("invalid endpoint {endpoint}: {e}")))?;

        let compress = self.builder.compress();
        let body = if compress {
            gzip_compress(payload).map_err(|e| TransportError::Build(format!("gzip compression failed: {e}")))?
        } else {
            payload.to_vec()
        };

        let mut request = self.client.post(endpoint).body(body);
        if compress {
            request = request.header(reqwest::header::CONTENT_ENCODING, "gzip");
        }
        for (name, value) in self.builder.headers() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Build(format!("invalid header name {name}: {e}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value)
                .map_err(|e| TransportError::Build(format!("invalid header value for {name}: {e}")))?;
            request = request.header(header_name, header_value);
        }
        Ok(request)
    }
}

/// Gzips `payload` at the default compression level. Mirrors the
/// feature-gated compression approach `emit_otlp` uses for its own
/// optional request-body compression.
fn gzip_compress(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    use std::io::Write as _;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}

/// Translates a [`TransportError`] into the [`UploadStatus`] the worker
/// reacts to. A malformed request (bad endpoint or header — most commonly a
/// structurally invalid client token) is treated as `ClientTokenError` and
/// is non-retryable, since resending the same bytes would fail identically.
/// A failure to even obtain a response is a retryable `NetworkError`.
fn transport_error_to_status(err: &TransportError) -> UploadStatus {
    match err {
        TransportError::Build(_) => UploadStatus {
            needs_retry: false,
            error: Some(UploadError::ClientTokenError),
        },
        TransportError::Send(_) => classify_transport_error(err.to_string()),
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    async fn upload(&self, payload: &[u8]) -> UploadStatus {
        let request = match self.build_request(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "failed to build upload request, rejecting before send");
                return transport_error_to_status(&e);
            }
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let transport_err = TransportError::Send(e);
                warn!(error = %transport_err, "upload request failed before a response was obtained");
                return transport_error_to_status(&transport_err);
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status.as_u16() == 429 {
            if let Some(value) = &retry_after {
                self.apply_retry_after(value).await;
            }
        }

        classify_http_status(status.as_u16())
    }
}

/// Parses a `Retry-After` header value, accepting both integer-seconds and
/// RFC 7231 HTTP-date forms, capped at [`MAX_RETRY_AFTER`].
///
/// Grounded on `download::rate_limiter::parse_retry_after`.
#[must_use]
fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(duration.min(MAX_RETRY_AFTER));
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        return match datetime.duration_since(now) {
            Ok(duration) => Some(duration.min(MAX_RETRY_AFTER)),
            Err(_) => Some(Duration::ZERO),
        };
    }

    None
}
