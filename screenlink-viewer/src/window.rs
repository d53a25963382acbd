//! Native display window for mirrored frames.
//!
//! [`WindowSink`] implements the pipeline's `FrameSink` on top of a
//! Win32 window: frames are blitted with GDI `StretchDIBits` (stretched
//! to the current client area), the close button or the `q`/`Esc` keys
//! request quit, and the measured frame rate is shown in the title bar.

#[cfg(target_os = "windows")]
mod platform {
    use std::sync::mpsc;

    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::*;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::*;
    use windows::core::PCWSTR;

    use screenlink_core::{Frame, FrameSink, LinkError, PixelFormat};

    // Virtual-key codes that close the viewer: `q` and Escape.
    const VK_QUIT_KEYS: [usize; 2] = [0x51, 0x1B];

    /// Frame sink backed by a native window.
    pub struct WindowSink {
        hwnd: HWND,
        title: String,
        quit_rx: mpsc::Receiver<()>,
        quit_requested: bool,
        /// Reused BGRA conversion buffer.
        scratch: Vec<u8>,
    }

    // The quit sender pointer is stored in GWLP_USERDATA and lives as
    // long as the window.
    unsafe extern "system" fn wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        let tx_ptr =
            unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const mpsc::Sender<()>;
        if tx_ptr.is_null() {
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }
        let tx = unsafe { &*tx_ptr };

        match msg {
            WM_CLOSE => {
                let _ = tx.send(());
                LRESULT(0)
            }
            WM_KEYDOWN if VK_QUIT_KEYS.contains(&wparam.0) => {
                let _ = tx.send(());
                LRESULT(0)
            }
            WM_DESTROY => {
                unsafe { PostQuitMessage(0) };
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    impl WindowSink {
        /// Create and show the viewer window.
        pub fn create(title: &str, width: u32, height: u32) -> Result<Self, LinkError> {
            let (quit_tx, quit_rx) = mpsc::channel();

            let hinstance = unsafe { GetModuleHandleW(None) }
                .map_err(|e| LinkError::Display(format!("GetModuleHandle: {e}")))?;

            let class_name_wide: Vec<u16> = "ScreenlinkViewerClass\0".encode_utf16().collect();

            let wc = WNDCLASSW {
                lpfnWndProc: Some(wndproc),
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name_wide.as_ptr()),
                hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                ..Default::default()
            };

            let atom = unsafe { RegisterClassW(&wc) };
            if atom == 0 {
                return Err(LinkError::Display("RegisterClassW failed".into()));
            }

            let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

            let hwnd = unsafe {
                CreateWindowExW(
                    WINDOW_EX_STYLE(0),
                    PCWSTR(class_name_wide.as_ptr()),
                    PCWSTR(title_wide.as_ptr()),
                    WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    width as i32,
                    height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .map_err(|e| LinkError::Display(format!("CreateWindowExW: {e}")))?;

            if hwnd.is_invalid() {
                return Err(LinkError::Display("CreateWindowExW returned invalid HWND".into()));
            }

            let tx_ptr = Box::into_raw(Box::new(quit_tx));
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, tx_ptr as isize);
            }

            Ok(Self {
                hwnd,
                title: title.to_string(),
                quit_rx,
                quit_requested: false,
                scratch: Vec::new(),
            })
        }

        /// Current client-area size in pixels.
        fn client_size(&self) -> (i32, i32) {
            let mut rect = RECT::default();
            if unsafe { GetClientRect(self.hwnd, &mut rect) }.is_err() {
                return (0, 0);
            }
            (rect.right - rect.left, rect.bottom - rect.top)
        }

        /// Repack the frame as tightly-packed BGRA8 into `scratch`.
        fn fill_scratch(&mut self, frame: &Frame) {
            self.scratch.clear();
            self.scratch
                .reserve(frame.width as usize * frame.height as usize * 4);
            match frame.format {
                PixelFormat::Bgra8 => self.scratch.extend_from_slice(&frame.data),
                PixelFormat::Rgb8 => {
                    for px in frame.data.chunks_exact(3) {
                        self.scratch.extend_from_slice(&[px[2], px[1], px[0], 255]);
                    }
                }
            }
        }
    }

    impl FrameSink for WindowSink {
        fn present(&mut self, frame: &Frame) -> Result<(), LinkError> {
            let (client_w, client_h) = self.client_size();
            if client_w <= 0 || client_h <= 0 {
                // Minimized: nothing to draw into.
                return Ok(());
            }

            self.fill_scratch(frame);

            unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err(LinkError::Display("GetDC failed".into()));
                }

                let bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: frame.width as i32,
                        // Negative height = top-down DIB (origin at top-left).
                        biHeight: -(frame.height as i32),
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        biSizeImage: 0,
                        biXPelsPerMeter: 0,
                        biYPelsPerMeter: 0,
                        biClrUsed: 0,
                        biClrImportant: 0,
                    },
                    bmiColors: [RGBQUAD::default(); 1],
                };

                StretchDIBits(
                    hdc,
                    0,
                    0,
                    client_w,
                    client_h,
                    0,
                    0,
                    frame.width as i32,
                    frame.height as i32,
                    Some(self.scratch.as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(self.hwnd, hdc);
            }

            Ok(())
        }

        fn poll_quit(&mut self) -> bool {
            unsafe {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            if self.quit_rx.try_recv().is_ok() {
                self.quit_requested = true;
            }
            self.quit_requested
        }

        fn set_status(&mut self, fps: f64) {
            let text = format!("{} — {:.1} fps", self.title, fps);
            let wide: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
            let _ = unsafe { SetWindowTextW(self.hwnd, PCWSTR(wide.as_ptr())) };
        }
    }

    impl Drop for WindowSink {
        fn drop(&mut self) {
            unsafe {
                // Recover and drop the boxed quit sender.
                let ptr = GetWindowLongPtrW(self.hwnd, GWLP_USERDATA) as *mut mpsc::Sender<()>;
                if !ptr.is_null() {
                    drop(Box::from_raw(ptr));
                    SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
                }
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
mod stub {
    use screenlink_core::{Frame, FrameSink, LinkError};

    pub struct WindowSink;

    impl WindowSink {
        pub fn create(_title: &str, _width: u32, _height: u32) -> Result<Self, LinkError> {
            Err(LinkError::Display(
                "the viewer window is only available on Windows".into(),
            ))
        }
    }

    impl FrameSink for WindowSink {
        fn present(&mut self, _frame: &Frame) -> Result<(), LinkError> {
            Err(LinkError::Display(
                "the viewer window is only available on Windows".into(),
            ))
        }

        fn poll_quit(&mut self) -> bool {
            true
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
