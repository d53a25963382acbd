//! Full-desktop capture for the PC→phone direction.
//!
//! Windows uses the Direct3D 11 Desktop Duplication API. The
//! duplication API only yields a frame when the desktop *changes*, but
//! the HTTP contract is "every request gets an image" — so the source
//! keeps the last good frame and serves it when the compositor has
//! nothing new. `Unavailable` is returned only before the first
//! successful capture.
//!
//! # Platform
//!
//! Windows-only. On other platforms the type exists but construction
//! fails at runtime, which callers surface as a synthesized error image.

use async_trait::async_trait;

use crate::error::Unavailable;
use crate::mirror::frame::Frame;
use crate::mirror::source::FrameSource;

/// How long to wait for the compositor to produce a new frame before
/// falling back to the cached one.
const ACQUIRE_TIMEOUT_MS: u32 = 100;

/// Desktop capturer backed by `IDXGIOutputDuplication`.
pub struct DesktopSource {
    /// Screen width in pixels.
    width: u32,
    /// Screen height in pixels.
    height: u32,
    /// Last successfully captured frame, reserved when the desktop is static.
    last_frame: Option<Frame>,

    #[cfg(target_os = "windows")]
    context: windows::Win32::Graphics::Direct3D11::ID3D11DeviceContext,
    #[cfg(target_os = "windows")]
    duplication: windows::Win32::Graphics::Dxgi::IDXGIOutputDuplication,
    #[cfg(target_os = "windows")]
    staging: windows::Win32::Graphics::Direct3D11::ID3D11Texture2D,
}

#[async_trait]
impl FrameSource for DesktopSource {
    /// Desktop capture is always full resolution; `target_width` is a
    /// hint this source ignores (the HTTP layer encodes as-is).
    async fn capture(&mut self, _target_width: Option<u32>) -> Result<Frame, Unavailable> {
        match self.grab() {
            Ok(frame) => {
                self.last_frame = Some(frame.clone());
                Ok(frame)
            }
            Err(e) => match &self.last_frame {
                // Static desktop: the previous frame is still accurate.
                Some(cached) => Ok(cached.clone()),
                None => Err(e),
            },
        }
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use crate::mirror::frame::PixelFormat;
    use std::time::Instant;
    use windows::{
        Win32::Graphics::{
            Direct3D::D3D_DRIVER_TYPE_HARDWARE,
            Direct3D11::*,
            Dxgi::{Common::*, *},
        },
        core::Interface,
    };

    impl DesktopSource {
        /// Open the primary monitor for duplication.
        pub fn primary() -> Result<Self, Unavailable> {
            Self::new(0)
        }

        /// Open monitor `monitor_index` (0 = primary).
        pub fn new(monitor_index: u32) -> Result<Self, Unavailable> {
            unsafe { Self::init(monitor_index) }
        }

        unsafe fn init(monitor_index: u32) -> Result<Self, Unavailable> {
            let fail = |what: &str, e: &dyn std::fmt::Display| {
                Unavailable::Platform(format!("{what}: {e}"))
            };

            let mut device = None;
            let mut context = None;
            unsafe {
                D3D11CreateDevice(
                    None,
                    D3D_DRIVER_TYPE_HARDWARE,
                    None,
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    None,
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    Some(&mut context),
                )
                .map_err(|e| fail("D3D11CreateDevice", &e))?;
            }
            let device =
                device.ok_or_else(|| Unavailable::Platform("D3D11 device is None".into()))?;
            let context =
                context.ok_or_else(|| Unavailable::Platform("D3D11 context is None".into()))?;

            // Device → adapter → output → duplication.
            let dxgi_device: IDXGIDevice =
                device.cast().map_err(|e| fail("cast IDXGIDevice", &e))?;
            let adapter = unsafe { dxgi_device.GetAdapter() }
                .map_err(|e| fail("GetAdapter", &e))?;
            let output: IDXGIOutput = unsafe { adapter.EnumOutputs(monitor_index) }
                .map_err(|e| fail("EnumOutputs", &e))?;
            let output1: IDXGIOutput1 =
                output.cast().map_err(|e| fail("cast IDXGIOutput1", &e))?;
            let duplication = unsafe { output1.DuplicateOutput(&device) }
                .map_err(|e| fail("DuplicateOutput", &e))?;

            let desc = unsafe { duplication.GetDesc() };
            let width = desc.ModeDesc.Width;
            let height = desc.ModeDesc.Height;

            // CPU-readable staging texture for the copy-out.
            let staging_desc = D3D11_TEXTURE2D_DESC {
                Width: width,
                Height: height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_STAGING,
                BindFlags: 0,
                CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
                MiscFlags: 0,
            };
            let mut staging = None;
            unsafe {
                device
                    .CreateTexture2D(&staging_desc, None, Some(&mut staging))
                    .map_err(|e| fail("CreateTexture2D", &e))?;
            }
            let staging =
                staging.ok_or_else(|| Unavailable::Platform("staging texture is None".into()))?;

            Ok(Self {
                width,
                height,
                last_frame: None,
                context,
                duplication,
                staging,
            })
        }

        /// Acquire the next desktop frame and repack it tightly as BGRA8.
        pub(super) fn grab(&mut self) -> Result<Frame, Unavailable> {
            unsafe { self.grab_inner() }
        }

        unsafe fn grab_inner(&mut self) -> Result<Frame, Unavailable> {
            let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
            let mut resource = None;

            match unsafe {
                self.duplication
                    .AcquireNextFrame(ACQUIRE_TIMEOUT_MS, &mut info, &mut resource)
            } {
                Ok(()) => {}
                Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                    return Err(Unavailable::Timeout(std::time::Duration::from_millis(
                        ACQUIRE_TIMEOUT_MS as u64,
                    )));
                }
                Err(e) => {
                    return Err(Unavailable::Platform(format!("AcquireNextFrame: {e}")));
                }
            }

            let resource = resource
                .ok_or_else(|| Unavailable::Platform("acquired resource is None".into()))?;
            let texture: ID3D11Texture2D = resource.cast().map_err(|e| {
                let _ = unsafe { self.duplication.ReleaseFrame() };
                Unavailable::Platform(format!("cast ID3D11Texture2D: {e}"))
            })?;

            unsafe { self.context.CopyResource(&self.staging, &texture) };
            let _ = unsafe { self.duplication.ReleaseFrame() };

            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            unsafe {
                self.context
                    .Map(&self.staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                    .map_err(|e| Unavailable::Platform(format!("Map: {e}")))?;
            }

            // Drop the GPU row padding: copy width*4 bytes per row.
            let stride = mapped.RowPitch as usize;
            let row_bytes = self.width as usize * 4;
            let mut data = Vec::with_capacity(row_bytes * self.height as usize);
            let base = mapped.pData as *const u8;
            for y in 0..self.height as usize {
                let row = unsafe { std::slice::from_raw_parts(base.add(y * stride), row_bytes) };
                data.extend_from_slice(row);
            }
            unsafe { self.context.Unmap(&self.staging, 0) };

            Ok(Frame {
                width: self.width,
                height: self.height,
                format: PixelFormat::Bgra8,
                data,
                timestamp: Instant::now(),
            })
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl DesktopSource {
    /// Desktop duplication is only available on Windows.
    pub fn primary() -> Result<Self, Unavailable> {
        Self::new(0)
    }

    pub fn new(_monitor_index: u32) -> Result<Self, Unavailable> {
        Err(Unavailable::Platform(
            "desktop capture is only available on Windows".into(),
        ))
    }

    fn grab(&mut self) -> Result<Frame, Unavailable> {
        Err(Unavailable::Platform(
            "desktop capture is only available on Windows".into(),
        ))
    }
}

impl DesktopSource {
    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}
