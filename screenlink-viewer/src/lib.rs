//! # screenlink-viewer — phone screen on the PC
//!
//! Pulls screenshots from an attached device over the `adb` bridge,
//! buffers them through a small drop-oldest queue, and renders them
//! into a native window at a paced frame rate with an FPS readout in
//! the title bar.

pub mod config;
pub mod window;
