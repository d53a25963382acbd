//! Pointer injection for remote clicks.
//!
//! The OS cursor is a single global resource, so all injection flows
//! through one writer task fed by an mpsc channel: HTTP handlers
//! enqueue a request and await a oneshot completion. Concurrent clicks
//! are therefore applied in submission order, never interleaved.
//!
//! The platform seam is [`InputBackend`]; Windows injects through
//! `SendInput`, other platforms error (and tests use a scripted mock).

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::LinkError;

// ── Coordinate mapping ───────────────────────────────────────────

/// Map normalized coordinates onto a `width`×`height` screen.
///
/// Inputs are clamped to [0,1] first: out-of-range values from a
/// client must target the screen edge, not an out-of-bounds pixel.
pub fn to_absolute(x: f64, y: f64, width: u32, height: u32) -> (i32, i32) {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    (
        (x * width as f64).round() as i32,
        (y * height as f64).round() as i32,
    )
}

// ── InputBackend ─────────────────────────────────────────────────

/// OS input subsystem seam.
pub trait InputBackend: Send {
    /// Current screen size in pixels.
    fn screen_size(&self) -> Result<(u32, u32), LinkError>;

    /// Move the cursor to an absolute position.
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), LinkError>;

    /// Press and release the primary button at the current position.
    fn click(&mut self) -> Result<(), LinkError>;
}

// ── SystemInput ──────────────────────────────────────────────────

/// [`InputBackend`] talking to the real OS cursor.
pub struct SystemInput;

impl SystemInput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use windows::Win32::UI::Input::KeyboardAndMouse::*;

    fn send(input: INPUT) -> Result<(), LinkError> {
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            return Err(LinkError::Injection("SendInput returned 0".into()));
        }
        Ok(())
    }

    fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    impl InputBackend for SystemInput {
        fn screen_size(&self) -> Result<(u32, u32), LinkError> {
            use windows::Win32::UI::WindowsAndMessaging::*;
            let (w, h) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
            if w <= 0 || h <= 0 {
                return Err(LinkError::Injection("GetSystemMetrics returned 0".into()));
            }
            Ok((w as u32, h as u32))
        }

        fn move_to(&mut self, x: i32, y: i32) -> Result<(), LinkError> {
            let (w, h) = self.screen_size()?;
            // SendInput absolute coordinates are normalized to 0..65535.
            let nx = (x as i64 * 65535 / w as i64) as i32;
            let ny = (y as i64 * 65535 / h as i64) as i32;
            send(mouse_input(nx, ny, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE))
        }

        fn click(&mut self) -> Result<(), LinkError> {
            send(mouse_input(0, 0, MOUSEEVENTF_LEFTDOWN))?;
            send(mouse_input(0, 0, MOUSEEVENTF_LEFTUP))
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl InputBackend for SystemInput {
    fn screen_size(&self) -> Result<(u32, u32), LinkError> {
        Err(LinkError::Injection(
            "pointer injection is only available on Windows".into(),
        ))
    }

    fn move_to(&mut self, _x: i32, _y: i32) -> Result<(), LinkError> {
        Err(LinkError::Injection(
            "pointer injection is only available on Windows".into(),
        ))
    }

    fn click(&mut self) -> Result<(), LinkError> {
        Err(LinkError::Injection(
            "pointer injection is only available on Windows".into(),
        ))
    }
}

// ── InjectionService ─────────────────────────────────────────────

struct ClickRequest {
    x: f64,
    y: f64,
    reply: oneshot::Sender<Result<(i32, i32), LinkError>>,
}

/// Cloneable handle to the single-writer injection task.
#[derive(Clone)]
pub struct InjectionService {
    tx: mpsc::Sender<ClickRequest>,
}

impl InjectionService {
    /// Spawn the writer task owning `backend`.
    pub fn spawn<B>(mut backend: B) -> Self
    where
        B: InputBackend + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<ClickRequest>(32);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                let result = Self::apply(&mut backend, req.x, req.y);
                if let Err(e) = &result {
                    warn!("click injection failed: {e}");
                }
                let _ = req.reply.send(result);
            }
            debug!("injection service stopped");
        });
        Self { tx }
    }

    /// Resolve and perform one move-then-click.
    fn apply<B: InputBackend>(backend: &mut B, x: f64, y: f64) -> Result<(i32, i32), LinkError> {
        let (w, h) = backend.screen_size()?;
        let (ax, ay) = to_absolute(x, y, w, h);
        backend.move_to(ax, ay)?;
        backend.click()?;
        debug!(x = ax, y = ay, "injected click");
        Ok((ax, ay))
    }

    /// Enqueue a normalized click and await its outcome.
    ///
    /// Returns the resolved absolute coordinates on success.
    pub async fn click(&self, x: f64, y: f64) -> Result<(i32, i32), LinkError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ClickRequest { x, y, reply })
            .await
            .map_err(|_| LinkError::InjectorClosed)?;
        rx.await.map_err(|_| LinkError::InjectorClosed)?
    }
}

// ── Tests ────────────────────────────────────────────────────────
