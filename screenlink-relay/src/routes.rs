//! HTTP surface of the relay.
//!
//! Five endpoints on top of warp: the control page, an on-demand JPEG
//! snapshot, an MJPEG multipart stream, click injection, and two small
//! JSON helpers (`/get_ip`, `/info`).
//!
//! The snapshot and stream endpoints never answer with an HTTP error:
//! when capture fails they substitute a synthesized error image, so the
//! browser always has something to render.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_stream::stream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use warp::Filter;
use warp::http::StatusCode;

use screenlink_core::{FrameSource, InjectionService, clamp_quality, error_frame};

use crate::config::RelayConfig;
use crate::page::INDEX_HTML;

/// Capture source shared between the snapshot and stream handlers.
pub type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct RelayState {
    pub source: SharedSource,
    pub injector: InjectionService,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    pub fn new(source: SharedSource, injector: InjectionService, config: RelayConfig) -> Self {
        Self {
            source,
            injector,
            config: Arc::new(config),
        }
    }
}

fn with_state(
    state: RelayState,
) -> impl Filter<Extract = (RelayState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

// ── Route tree ───────────────────────────────────────────────────

/// Build the full route tree.
pub fn routes(
    state: RelayState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML));

    let screen = warp::path("screen")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<SnapshotQuery>())
        .and(with_state(state.clone()))
        .and_then(snapshot);

    let screen_video = warp::path("screen_video")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(video_stream);

    let click = warp::path("click")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json::<PointerEvent>())
        .and(with_state(state.clone()))
        .and_then(handle_click);

    let get_ip = warp::path("get_ip")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_get_ip);

    let info = warp::path("info")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handle_info);

    index
        .or(screen)
        .or(screen_video)
        .or(click)
        .or(get_ip)
        .or(info)
}

// ── Snapshot ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SnapshotQuery {
    /// `stream` or `screenshot`; informational only, both paths
    /// capture the same way.
    #[serde(default)]
    mode: Option<String>,
    /// Requested JPEG quality, clamped to 10..=100.
    #[serde(default)]
    q: Option<i64>,
}

async fn snapshot(query: SnapshotQuery, state: RelayState) -> Result<impl warp::Reply, Infallible> {
    let quality = clamp_quality(query.q.unwrap_or(70));
    debug!(mode = query.mode.as_deref(), quality, "snapshot request");

    let captured = state.source.lock().await.capture(None).await;
    let jpeg = match captured {
        Ok(frame) => frame.to_jpeg(quality),
        Err(e) => {
            warn!("snapshot capture failed: {e}");
            error_frame(&format!("capture failed: {e}")).to_jpeg(quality)
        }
    };
    // A good frame that refuses to encode still gets the error image.
    let body = jpeg.unwrap_or_else(|e| {
        error!("jpeg encode failed: {e}");
        error_frame(&format!("encode failed: {e}"))
            .to_jpeg(quality)
            .unwrap_or_default()
    });

    let mut res = warp::reply::Response::new(body.into());
    res.headers_mut().insert(
        "Content-Type",
        warp::http::HeaderValue::from_static("image/jpeg"),
    );
    Ok(res)
}

// ── MJPEG stream ─────────────────────────────────────────────────

/// Frame one JPEG as a part of the `boundary=frame` multipart body.
fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    let mut part = Vec::with_capacity(jpeg.len() + 48);
    part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

fn video_stream(state: RelayState) -> warp::reply::Response {
    let quality = state.config.stream.quality;
    let interval = Duration::from_millis(state.config.stream.interval_ms);

    let mjpeg_stream = stream! {
        loop {
            let captured = state.source.lock().await.capture(None).await;
            match captured.map_err(Into::into).and_then(|f| f.to_jpeg(quality)) {
                Ok(jpeg) => {
                    yield Ok::<Bytes, Infallible>(multipart_chunk(&jpeg));
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    warn!("stream capture failed: {e}");
                    if let Ok(jpeg) = error_frame(&format!("capture failed: {e}")).to_jpeg(quality) {
                        yield Ok(multipart_chunk(&jpeg));
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    };

    let mut res = warp::reply::Response::new(warp::hyper::Body::wrap_stream(mjpeg_stream));
    res.headers_mut().insert(
        "Content-Type",
        warp::http::HeaderValue::from_static("multipart/x-mixed-replace; boundary=frame"),
    );
    res
}

// ── Click injection ──────────────────────────────────────────────

/// Normalized tap position from the control page.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
}

impl Default for PointerEvent {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

async fn handle_click(
    event: PointerEvent,
    state: RelayState,
) -> Result<impl warp::Reply, Infallible> {
    match state.injector.click(event.x, event.y).await {
        Ok((x, y)) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "status": "success",
                "x": x,
                "y": y,
            })),
            StatusCode::OK,
        )),
        Err(e) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "status": "error",
                "message": e.to_string(),
            })),
            StatusCode::INTERNAL_SERVER_ERROR,
        )),
    }
}

// ── Address + host info ──────────────────────────────────────────

/// LAN address of this host, found by opening an outbound UDP socket.
/// No packet is sent; the OS just picks the routable interface.
pub fn local_ip() -> String {
    let probe = || -> std::io::Result<String> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    probe().unwrap_or_else(|_| "127.0.0.1".into())
}

/// Render `url` as a terminal-printable QR block so the phone can scan
/// its way in instead of typing the address.
///
/// Colors are inverted: terminals draw light glyphs on dark background,
/// and scanners expect dark modules on light.
pub fn qr_banner(url: &str) -> Option<String> {
    use qrcode::QrCode;
    use qrcode::render::unicode;

    let code = QrCode::new(url.as_bytes()).ok()?;
    Some(
        code.render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    )
}

async fn handle_get_ip(state: RelayState) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&serde_json::json!({
        "ip": local_ip(),
        "port": state.config.server.port,
    })))
}

#[derive(Debug, Serialize)]
struct HostInfo {
    system: String,
    hostname: String,
    cpu_usage: f32,
    memory_usage: f32,
    timestamp: f64,
}

async fn handle_info() -> Result<impl warp::Reply, Infallible> {
    use sysinfo::System;

    let mut sys = System::new();
    sys.refresh_cpu_usage();
    // CPU usage is a delta; sysinfo needs two samples.
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let memory_usage = if sys.total_memory() > 0 {
        sys.used_memory() as f32 / sys.total_memory() as f32 * 100.0
    } else {
        0.0
    };
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Ok(warp::reply::json(&HostInfo {
        system: System::name().unwrap_or_else(|| std::env::consts::OS.into()),
        hostname: System::host_name().unwrap_or_else(|| "unknown".into()),
        cpu_usage: sys.global_cpu_usage(),
        memory_usage,
        timestamp,
    }))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use screenlink_core::{Frame, InputBackend, LinkError, Unavailable};
    use warp::Reply;

    /// Deterministic noisy source: same pixels every capture, textured
    /// enough that JPEG quality visibly changes the output size.
    struct NoiseSource;

    #[async_trait]
    impl FrameSource for NoiseSource {
        async fn capture(&mut self, _w: Option<u32>) -> Result<Frame, Unavailable> {
            let mut seed: u32 = 0x2545_F491;
            let mut data = Vec::with_capacity(64 * 64 * 3);
            for _ in 0..64 * 64 * 3 {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                data.push((seed >> 24) as u8);
            }
            Ok(Frame::from_rgb(64, 64, data).expect("valid buffer"))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FrameSource for FailingSource {
        async fn capture(&mut self, _w: Option<u32>) -> Result<Frame, Unavailable> {
            Err(Unavailable::BridgeMissing("adb".into()))
        }
    }

    struct OkBackend;

    impl InputBackend for OkBackend {
        fn screen_size(&self) -> Result<(u32, u32), LinkError> {
            Ok((1920, 1080))
        }
        fn move_to(&mut self, _x: i32, _y: i32) -> Result<(), LinkError> {
            Ok(())
        }
        fn click(&mut self) -> Result<(), LinkError> {
            Ok(())
        }
    }

    struct BrokenBackend;

    impl InputBackend for BrokenBackend {
        fn screen_size(&self) -> Result<(u32, u32), LinkError> {
            Err(LinkError::Injection("no display".into()))
        }
        fn move_to(&mut self, _x: i32, _y: i32) -> Result<(), LinkError> {
            Err(LinkError::Injection("no display".into()))
        }
        fn click(&mut self) -> Result<(), LinkError> {
            Err(LinkError::Injection("no display".into()))
        }
    }

    fn state_with<S, B>(source: S, backend: B) -> RelayState
    where
        S: FrameSource + 'static,
        B: InputBackend + 'static,
    {
        RelayState::new(
            Arc::new(Mutex::new(Box::new(source))),
            InjectionService::spawn(backend),
            RelayConfig::default(),
        )
    }

    #[tokio::test]
    async fn snapshot_returns_decodable_jpeg() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let resp = warp::test::request()
            .path("/screen?mode=stream&q=70")
            .reply(&api)
            .await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "image/jpeg");
        let decoded = image::load_from_memory(resp.body()).unwrap();
        assert_eq!(decoded.width(), 64);
    }

    #[tokio::test]
    async fn snapshot_failure_still_answers_200_with_image() {
        let api = routes(state_with(FailingSource, OkBackend));
        let resp = warp::test::request().path("/screen").reply(&api).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "image/jpeg");
        assert!(image::load_from_memory(resp.body()).is_ok());

        // The substitute must not pass for a real capture.
        let good_api = routes(state_with(NoiseSource, OkBackend));
        let good = warp::test::request()
            .path("/screen")
            .reply(&good_api)
            .await;
        assert_ne!(resp.body(), good.body());
    }

    #[tokio::test]
    async fn out_of_range_quality_clamps() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let low = warp::test::request()
            .path("/screen?q=5")
            .reply(&api)
            .await;
        let high = warp::test::request()
            .path("/screen?q=500")
            .reply(&api)
            .await;

        assert_eq!(low.status(), 200);
        assert_eq!(high.status(), 200);
        // Same pixels, clamped qualities 10 vs 100: sizes must order.
        assert!(low.body().len() < high.body().len());
    }

    #[tokio::test]
    async fn click_maps_and_reports_coordinates() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let resp = warp::test::request()
            .method("POST")
            .path("/click")
            .json(&serde_json::json!({"x": 0.5, "y": 0.5}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["x"], 960);
        assert_eq!(body["y"], 540);
    }

    #[tokio::test]
    async fn click_with_empty_body_defaults_to_origin() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let resp = warp::test::request()
            .method("POST")
            .path("/click")
            .json(&serde_json::json!({}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["x"], 0);
        assert_eq!(body["y"], 0);
    }

    #[tokio::test]
    async fn click_failure_reports_error_json() {
        let api = routes(state_with(NoiseSource, BrokenBackend));
        let resp = warp::test::request()
            .method("POST")
            .path("/click")
            .json(&serde_json::json!({"x": 0.5, "y": 0.5}))
            .reply(&api)
            .await;

        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("no display"));
    }

    #[tokio::test]
    async fn get_ip_reports_address_and_port() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let resp = warp::test::request().path("/get_ip").reply(&api).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert!(body["ip"].as_str().unwrap().parse::<std::net::IpAddr>().is_ok());
        assert_eq!(body["port"], 5000);
    }

    #[tokio::test]
    async fn info_reports_host_metrics() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let resp = warp::test::request().path("/info").reply(&api).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert!(body["cpu_usage"].is_number());
        assert!(body["memory_usage"].is_number());
        assert!(body["hostname"].is_string());
    }

    #[tokio::test]
    async fn video_stream_declares_multipart_boundary() {
        // `.filter` instead of `.reply`: the body is endless.
        let api = routes(state_with(NoiseSource, OkBackend));
        let reply = warp::test::request()
            .path("/screen_video")
            .filter(&api)
            .await
            .unwrap();

        let resp = reply.into_response();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()["content-type"],
            "multipart/x-mixed-replace; boundary=frame"
        );
    }

    #[test]
    fn multipart_chunk_frames_bytes() {
        let chunk = multipart_chunk(b"JPEG");
        let text = chunk.as_ref();
        assert!(text.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(text.ends_with(b"JPEG\r\n"));
    }

    #[test]
    fn qr_banner_renders_a_block() {
        let qr = qr_banner("http://192.168.1.20:5000").unwrap();
        // A QR code is square-ish: many lines, none of them empty.
        let lines: Vec<&str> = qr.lines().collect();
        assert!(lines.len() >= 10, "suspiciously small code: {} lines", lines.len());
        assert!(lines.iter().all(|l| !l.trim().is_empty()));
    }

    #[test]
    fn local_ip_is_parseable() {
        let ip: std::net::IpAddr = local_ip().parse().unwrap();
        assert!(!ip.to_string().is_empty());
    }

    #[tokio::test]
    async fn index_serves_control_page() {
        let api = routes(state_with(NoiseSource, OkBackend));
        let resp = warp::test::request().path("/").reply(&api).await;

        assert_eq!(resp.status(), 200);
        let body = std::str::from_utf8(resp.body()).unwrap();
        assert!(body.contains("/click"));
        assert!(body.contains("/get_ip"));
    }
}
