//! # mirror — the two screen-relay pipelines
//!
//! ```text
//! Direction 1 (PC → phone, pull-only)
//! ┌──────────────────────────┐                ┌─────────────────┐
//! │ DesktopSource            │   HTTP (warp)  │ phone browser   │
//! │   capture → JPEG encode  │ ─────────────► │ <img>/MJPEG     │
//! │ InjectionService         │ ◄───────────── │ tap → /click    │
//! └──────────────────────────┘                └─────────────────┘
//!
//! Direction 2 (phone → PC, producer/consumer)
//! ┌──────────────┐    ┌────────────┐    ┌─────────────────────┐
//! │ BridgeSource │ ─► │ FrameQueue │ ─► │ DisplayLoop → sink  │
//! │ CaptureLoop  │    │ (drop-old) │    │ (paced, fps window) │
//! └──────────────┘    └────────────┘    └─────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module        | Purpose                                             |
//! |---------------|-----------------------------------------------------|
//! | `frame`       | Decoded frame type, JPEG encoding, quality clamp    |
//! | `source`      | `FrameSource` — the capture seam                    |
//! | `desktop`     | DXGI full-desktop capture (Windows)                 |
//! | `bridge`      | Device screenshot pull over the `adb` bridge        |
//! | `queue`       | Bounded, drop-oldest frame buffer                   |
//! | `capture`     | Producer loop with cooperative lifecycle            |
//! | `display`     | Paced consumer loop with rolling FPS window         |
//! | `inject`      | Single-writer pointer injection                     |
//! | `placeholder` | Synthesized error frames for failed captures        |

pub mod bridge;
pub mod capture;
pub mod desktop;
pub mod display;
pub mod frame;
pub mod inject;
pub mod placeholder;
pub mod queue;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────

pub use bridge::{BridgeSource, DeviceBridge};
pub use capture::{CaptureConfig, CaptureLoop};
pub use desktop::DesktopSource;
pub use display::{DisplayLoop, DisplayStats, FrameSink};
pub use frame::{Frame, PixelFormat, clamp_quality, scaled_height};
pub use inject::{InjectionService, InputBackend, SystemInput, to_absolute};
pub use placeholder::error_frame;
pub use queue::FrameQueue;
pub use source::FrameSource;
