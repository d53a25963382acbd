//! Synthesized fallback frames for capture failures.
//!
//! The snapshot endpoints promise "the browser never sees a broken
//! image": when capture fails we substitute a solid-color frame with
//! the failure text baked into the pixels, instead of an HTTP error.
//!
//! Text is rendered with a built-in 5×7 glyph set (uppercase, digits,
//! basic punctuation) — enough for a diagnostic banner without pulling
//! a font rasterizer into the tree.

use crate::mirror::frame::{Frame, PixelFormat};

/// Width of the synthesized error frame.
const ERROR_FRAME_WIDTH: u32 = 800;
/// Height of the synthesized error frame.
const ERROR_FRAME_HEIGHT: u32 = 600;
/// Background: solid red, matching the "something is wrong" banner.
const BACKGROUND: [u8; 3] = [180, 20, 20];
const FOREGROUND: [u8; 3] = [255, 255, 255];
/// Pixel scale applied to the 5×7 glyphs.
const GLYPH_SCALE: u32 = 2;

/// Build the frame served in place of a failed capture.
///
/// `message` is uppercased and wrapped; characters without a glyph
/// render as blanks.
pub fn error_frame(message: &str) -> Frame {
    let (w, h) = (ERROR_FRAME_WIDTH, ERROR_FRAME_HEIGHT);
    let mut data = Vec::with_capacity((w * h) as usize * 3);
    for _ in 0..w * h {
        data.extend_from_slice(&BACKGROUND);
    }
    let mut frame = Frame {
        width: w,
        height: h,
        format: PixelFormat::Rgb8,
        data,
        timestamp: std::time::Instant::now(),
    };

    let cell_w = (5 + 1) * GLYPH_SCALE;
    let cell_h = (7 + 2) * GLYPH_SCALE;
    let cols = ((w - 20) / cell_w).max(1) as usize;

    let text = message.to_ascii_uppercase();
    for (i, ch) in text.chars().enumerate() {
        let col = (i % cols) as u32;
        let row = (i / cols) as u32;
        let y = 10 + row * cell_h;
        if y + cell_h > h {
            break;
        }
        draw_glyph(&mut frame, ch, 10 + col * cell_w, y);
    }
    frame
}

/// Blit one glyph at pixel position (`x0`, `y0`).
fn draw_glyph(frame: &mut Frame, ch: char, x0: u32, y0: u32) {
    let Some(rows) = glyph(ch) else { return };
    for (gy, bits) in rows.iter().enumerate() {
        for gx in 0..5u32 {
            if bits & (0x10 >> gx) == 0 {
                continue;
            }
            for sy in 0..GLYPH_SCALE {
                for sx in 0..GLYPH_SCALE {
                    let x = x0 + gx * GLYPH_SCALE + sx;
                    let y = y0 + gy as u32 * GLYPH_SCALE + sy;
                    if x < frame.width && y < frame.height {
                        let idx = (y as usize * frame.width as usize + x as usize) * 3;
                        frame.data[idx..idx + 3].copy_from_slice(&FOREGROUND);
                    }
                }
            }
        }
    }
}

/// 5×7 bitmap rows for a character (MSB-left in the low 5 bits).
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x06, 0x08, 0x10, 0x1F],
        '3' => [0x0E, 0x11, 0x01, 0x06, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x04, 0x04, 0x00, 0x04, 0x04, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        _ => return None,
    };
    Some(rows)
}

// ── Tests ────────────────────────────────────────────────────────
