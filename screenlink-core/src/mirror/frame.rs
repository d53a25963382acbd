//! Shared frame types for the capture/display pipeline.
//!
//! A [`Frame`] is the in-memory currency of the whole system: produced
//! by a capture source, held briefly by the queue, and consumed exactly
//! once by a renderer or an HTTP response writer. Nothing here is ever
//! persisted.

use std::time::Instant;

use image::{DynamicImage, RgbImage, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::error::LinkError;

// ── Quality ──────────────────────────────────────────────────────

/// Lowest JPEG quality a client may request.
pub const MIN_QUALITY: u8 = 10;
/// Highest JPEG quality a client may request.
pub const MAX_QUALITY: u8 = 100;

/// Clamp a caller-supplied quality value into the supported range.
///
/// Accepts a wide integer so malformed query values (`q=5`, `q=500`)
/// clamp instead of failing the request.
pub fn clamp_quality(q: i64) -> u8 {
    q.clamp(MIN_QUALITY as i64, MAX_QUALITY as i64) as u8
}

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout for decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel: Red, Green, Blue. The pipeline's working format.
    Rgb8,
    /// 4 bytes per pixel: Blue, Green, Red, Alpha (DXGI capture output).
    Bgra8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Bgra8 => 4,
        }
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// One decoded bitmap captured from a screen source.
///
/// Rows are tightly packed (`width * bytes_per_pixel` bytes each, no
/// stride padding).
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Pixel data — `width * height * bytes_per_pixel` bytes.
    pub data: Vec<u8>,
    /// Monotonic capture timestamp.
    pub timestamp: Instant,
}

impl Frame {
    /// Build an RGB8 frame from a raw pixel buffer.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data,
            timestamp: Instant::now(),
        })
    }

    /// Build an RGB8 frame from a decoded image, optionally resized to
    /// `target_width` with aspect ratio preserved.
    pub fn from_decoded(img: DynamicImage, target_width: Option<u32>) -> Self {
        let rgb = img.to_rgb8();
        let rgb = match target_width {
            Some(w) if w > 0 && w != rgb.width() => {
                let h = scaled_height(rgb.width(), rgb.height(), w);
                image::imageops::resize(&rgb, w, h, FilterType::Triangle)
            }
            _ => rgb,
        };
        let (width, height) = rgb.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data: rgb.into_raw(),
            timestamp: Instant::now(),
        }
    }

    /// Total byte size of the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Encode the frame as JPEG at the given (already clamped) quality.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, LinkError> {
        let rgb = self.as_rgb_image()?;
        let mut out = Vec::with_capacity(self.byte_len() / 8);
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder.encode(
            rgb.as_raw(),
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }

    /// View the frame as an `RgbImage`, converting from BGRA if needed.
    fn as_rgb_image(&self) -> Result<RgbImage, LinkError> {
        let rgb_data = match self.format {
            PixelFormat::Rgb8 => self.data.clone(),
            PixelFormat::Bgra8 => {
                let mut rgb = Vec::with_capacity(self.data.len() / 4 * 3);
                for px in self.data.chunks_exact(4) {
                    rgb.extend_from_slice(&[px[2], px[1], px[0]]);
                }
                rgb
            }
        };
        RgbImage::from_raw(self.width, self.height, rgb_data)
            .ok_or_else(|| LinkError::Encode("pixel buffer does not match dimensions".into()))
    }
}

/// Height that preserves aspect ratio when scaling `src_w`×`src_h`
/// down (or up) to `target_width`.
pub fn scaled_height(src_w: u32, src_h: u32, target_width: u32) -> u32 {
    let scale = target_width as f64 / src_w as f64;
    (src_h as f64 * scale).round().max(1.0) as u32
}

// ── Tests ────────────────────────────────────────────────────────
