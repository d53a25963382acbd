//! # screenlink-relay — phone-facing screen relay
//!
//! HTTP server that mirrors the PC desktop to a phone browser on the
//! same LAN and forwards taps back as mouse clicks.
//!
//! ## Endpoints
//!
//! - `GET /` — embedded control page
//! - `GET /screen?mode&q` — one JPEG snapshot, always 200
//! - `GET /screen_video` — MJPEG multipart stream (~10 fps)
//! - `POST /click` — normalized tap → move-then-click injection
//! - `GET /get_ip`, `GET /info` — LAN address and host metrics

pub mod config;
pub mod page;
pub mod routes;
