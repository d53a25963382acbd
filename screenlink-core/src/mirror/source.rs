//! The capture seam: anything that can produce one frame per request.

use async_trait::async_trait;

use crate::error::Unavailable;
use crate::mirror::frame::Frame;

/// Produces one decoded frame per call.
///
/// Implementations: [`DesktopSource`](crate::mirror::desktop::DesktopSource)
/// (full-desktop capture, ignores `target_width`) and
/// [`BridgeSource`](crate::mirror::bridge::BridgeSource) (pulls from an
/// attached device over a command-line bridge, resized to `target_width`).
///
/// A failed capture is [`Unavailable`] — transient by definition; the
/// caller skips the cycle and retries. It is never a reason to stop a
/// loop or fail a request.
#[async_trait]
pub trait FrameSource: Send {
    /// Capture one frame, optionally scaled to `target_width` pixels
    /// wide (aspect ratio preserved). Sources that capture at a fixed
    /// resolution may ignore the hint.
    async fn capture(&mut self, target_width: Option<u32>) -> Result<Frame, Unavailable>;
}
