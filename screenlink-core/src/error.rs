//! Domain-specific error types for the screenlink pipeline.
//!
//! All fallible operations return `Result<T, LinkError>`, except frame
//! capture which returns the narrower [`Unavailable`] — a *transient*
//! failure the caller retries on the next cycle rather than propagating.

use std::time::Duration;
use thiserror::Error;

// ── Unavailable ──────────────────────────────────────────────────

/// Transient capture failure: "no frame this cycle".
///
/// Device bridges are flaky; every variant here is retryable and must
/// never terminate a capture loop. The variants are typed (rather than
/// a swallowed generic fault) so callers can distinguish "bridge not
/// installed" from "bridge reachable but slow" when tuning backoff.
#[derive(Debug, Error)]
pub enum Unavailable {
    /// The bridge executable could not be spawned (not installed / bad path).
    #[error("bridge executable not found: {0}")]
    BridgeMissing(String),

    /// A bridge command exceeded its deadline.
    #[error("bridge timed out after {0:?}")]
    Timeout(Duration),

    /// The bridge ran but exited with a non-zero status.
    #[error("bridge exited with status {status}: {stderr}")]
    BridgeFailed { status: i32, stderr: String },

    /// The display-size query returned text we could not parse.
    #[error("unparseable device size: {0:?}")]
    MalformedSize(String),

    /// Screenshot bytes could not be decoded into an image.
    #[error("screenshot decode failed: {0}")]
    Decode(String),

    /// The platform capture call itself failed (no frame available).
    #[error("platform capture failed: {0}")]
    Platform(String),
}

// ── LinkError ────────────────────────────────────────────────────

/// The canonical error type for screenlink.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Capture failed transiently; see [`Unavailable`].
    #[error("capture unavailable: {0}")]
    Unavailable(#[from] Unavailable),

    /// Image encoding failed.
    #[error("image encoding failed: {0}")]
    Encode(String),

    /// Pointer injection into the OS input subsystem failed.
    #[error("input injection failed: {0}")]
    Injection(String),

    /// The single-writer injection task is gone (channel closed).
    #[error("injection service is not running")]
    InjectorClosed,

    /// A cooperative join did not observe the stop flag in time.
    ///
    /// Best-effort shutdown: callers log this and proceed, but must not
    /// assume the worker's resources are released yet.
    #[error("worker did not stop within {0:?}")]
    JoinTimeout(Duration),

    /// The I/O layer reported an error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Window / renderer failure on the viewer side.
    #[error("display error: {0}")]
    Display(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl From<String> for LinkError {
    fn from(s: String) -> Self {
        LinkError::Other(s)
    }
}

impl From<&str> for LinkError {
    fn from(s: &str) -> Self {
        LinkError::Other(s.to_string())
    }
}

impl From<image::ImageError> for LinkError {
    fn from(e: image::ImageError) -> Self {
        LinkError::Encode(e.to_string())
    }
}
