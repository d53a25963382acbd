//! # screenlink-core
//!
//! Core library for screenlink, a LAN screen-mirroring tool that lets a
//! phone and a PC mirror each other's screen and inject remote input.
//!
//! This crate contains:
//! - **Frames**: `Frame`, `PixelFormat`, JPEG encoding with clamped quality
//! - **Sources**: `FrameSource` trait, DXGI desktop capture, `adb` device bridge
//! - **Pipeline**: `FrameQueue` (bounded, drop-oldest), `CaptureLoop`,
//!   `DisplayLoop` with rolling FPS and pacing
//! - **Injection**: `InjectionService` — single-writer pointer control
//! - **Error**: `LinkError` / `Unavailable` — typed, `thiserror`-based
//!
//! The HTTP relay and the viewer binary live in their own crates.

pub mod error;
pub mod mirror;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::{LinkError, Unavailable};
pub use mirror::{
    BridgeSource, CaptureConfig, CaptureLoop, DesktopSource, DeviceBridge, DisplayLoop,
    DisplayStats, Frame, FrameQueue, FrameSink, FrameSource, InjectionService, InputBackend,
    PixelFormat, SystemInput, clamp_quality, error_frame, scaled_height, to_absolute,
};
