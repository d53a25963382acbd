//! Device screenshot capture over a command-line bridge (`adb`).
//!
//! Each pull is a fresh round trip: query the device display size,
//! request a raw screenshot on stdout, decode, resize. There is no
//! persistent connection — the bridge binary owns the transport.
//!
//! Every failure mode (binary missing, timeout, non-zero exit, garbled
//! size line, undecodable bytes) maps to a typed [`Unavailable`] so the
//! capture loop can treat it as "no frame this cycle" and retry.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::Unavailable;
use crate::mirror::frame::Frame;
use crate::mirror::source::FrameSource;

/// Upper bound on any single bridge invocation. A hung bridge process
/// must not stall the pipeline.
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(2);

// ── DeviceBridge ─────────────────────────────────────────────────

/// Handle to the bridge executable.
///
/// Stateless between calls: every method spawns a new subprocess with
/// its own timeout.
#[derive(Debug, Clone)]
pub struct DeviceBridge {
    program: PathBuf,
    timeout: Duration,
}

impl DeviceBridge {
    /// Bridge at `program` with the default 2-second timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_BRIDGE_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the bridge executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Query the device's physical display size in pixels.
    pub async fn display_size(&self) -> Result<(u32, u32), Unavailable> {
        let out = self.run(&["shell", "wm", "size"]).await?;
        let text = String::from_utf8_lossy(&out);
        parse_size_line(&text)
    }

    /// Pull one raw screenshot (PNG bytes on stdout).
    pub async fn screenshot(&self) -> Result<Vec<u8>, Unavailable> {
        self.run(&["exec-out", "screencap", "-p"]).await
    }

    /// Spawn the bridge with `args`, enforce the timeout, and return
    /// stdout on success.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, Unavailable> {
        // A timeout drops the output future mid-flight; the child has
        // to die with it or every hung invocation leaks a process.
        let fut = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let out = match tokio::time::timeout(self.timeout, fut).await {
            Err(_) => return Err(Unavailable::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Unavailable::BridgeMissing(
                    self.program.display().to_string(),
                ));
            }
            Ok(Err(e)) => return Err(Unavailable::Platform(e.to_string())),
            Ok(Ok(out)) => out,
        };

        if !out.status.success() {
            return Err(Unavailable::BridgeFailed {
                status: out.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(out.stdout)
    }
}

/// Parse the `wm size` output, e.g. `Physical size: 1080x2400`.
///
/// When an override is active the tool prints both lines; the override
/// line wins because it reflects what screenshots actually produce.
pub fn parse_size_line(text: &str) -> Result<(u32, u32), Unavailable> {
    let malformed = || Unavailable::MalformedSize(text.trim().to_string());

    let line = text
        .lines()
        .filter(|l| l.contains("size:"))
        .last()
        .ok_or_else(malformed)?;
    let dims = line.rsplit(':').next().ok_or_else(malformed)?.trim();
    let (w, h) = dims.split_once('x').ok_or_else(malformed)?;
    let w: u32 = w.trim().parse().map_err(|_| malformed())?;
    let h: u32 = h.trim().parse().map_err(|_| malformed())?;
    if w == 0 || h == 0 {
        return Err(malformed());
    }
    Ok((w, h))
}

// ── BridgeSource ─────────────────────────────────────────────────

/// [`FrameSource`] that pulls frames from an attached device.
pub struct BridgeSource {
    bridge: DeviceBridge,
}

impl BridgeSource {
    pub fn new(bridge: DeviceBridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl FrameSource for BridgeSource {
    async fn capture(&mut self, target_width: Option<u32>) -> Result<Frame, Unavailable> {
        let (dev_w, dev_h) = self.bridge.display_size().await?;

        let png = self.bridge.screenshot().await?;
        let img = image::load_from_memory(&png)
            .map_err(|e| Unavailable::Decode(e.to_string()))?;

        let frame = Frame::from_decoded(img, target_width);
        debug!(
            device_w = dev_w,
            device_h = dev_h,
            frame_w = frame.width,
            frame_h = frame.height,
            "bridge capture"
        );
        Ok(frame)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_physical_size() {
        let (w, h) = parse_size_line("Physical size: 1080x2400\n").unwrap();
        assert_eq!((w, h), (1080, 2400));
    }

    #[test]
    fn override_line_wins() {
        let text = "Physical size: 1080x2400\nOverride size: 720x1600\n";
        assert_eq!(parse_size_line(text).unwrap(), (720, 1600));
    }

    #[test]
    fn garbled_size_is_malformed() {
        for text in ["", "no size here", "Physical size: wide x tall", "size: 0x100"] {
            assert!(matches!(
                parse_size_line(text),
                Err(Unavailable::MalformedSize(_))
            ));
        }
    }

    #[tokio::test]
    async fn missing_bridge_is_typed() {
        let bridge = DeviceBridge::new("/nonexistent/path/to/adb");
        match bridge.display_size().await {
            Err(Unavailable::BridgeMissing(p)) => assert!(p.contains("adb")),
            other => panic!("expected BridgeMissing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_bridge_reports_status() {
        // `false` exits 1 with no output — a portable "bridge failed".
        let bridge = DeviceBridge::new("false");
        match bridge.screenshot().await {
            Err(Unavailable::BridgeFailed { status, .. }) => assert_ne!(status, 0),
            // Environments without /bin/false in PATH surface as missing.
            Err(Unavailable::BridgeMissing(_)) => {}
            other => panic!("expected BridgeFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_bridge_times_out() {
        let bridge = DeviceBridge::new("sleep").with_timeout(Duration::from_millis(50));
        let start = std::time::Instant::now();
        match bridge.run(&["5"]).await {
            Err(Unavailable::Timeout(_)) => {}
            Err(Unavailable::BridgeMissing(_)) => return, // no `sleep` binary
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn timed_out_bridge_leaves_no_child_behind() {
        // A sleep duration nobody else would run makes the child
        // findable by command line.
        let secs = format!("{}.875", 7000 + std::process::id() % 1000);
        let bridge = DeviceBridge::new("sleep").with_timeout(Duration::from_millis(50));
        match bridge.run(&[secs.as_str()]).await {
            Err(Unavailable::Timeout(_)) => {}
            Err(Unavailable::BridgeMissing(_)) => return, // no `sleep` binary
            other => panic!("expected Timeout, got {other:?}"),
        }

        // The kill lands when the dropped future's child is reaped.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let Ok(out) = std::process::Command::new("pgrep")
            .arg("-f")
            .arg(format!("sleep {secs}"))
            .output()
        else {
            return; // no pgrep on this host
        };
        let pids = String::from_utf8_lossy(&out.stdout);
        assert!(
            pids.trim().is_empty(),
            "bridge child still running after timeout: pids {pids}"
        );
    }

    #[tokio::test]
    async fn garbled_bridge_output_stays_transient() {
        // `echo` answers the size query with its own arguments — not a
        // size line. The source must surface a typed Unavailable, never
        // a panic or a hard error.
        let mut source = BridgeSource::new(DeviceBridge::new("echo"));
        match source.capture(Some(480)).await {
            Err(Unavailable::MalformedSize(_)) | Err(Unavailable::BridgeMissing(_)) => {}
            other => panic!("expected MalformedSize, got {other:?}"),
        }
    }
}
