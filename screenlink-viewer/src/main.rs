//! screenlink-viewer — entry point.
//!
//! ```text
//! screenlink-viewer                   Mirror the attached device
//! screenlink-viewer --config <path>   Load a custom config TOML
//! screenlink-viewer --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use screenlink_core::{
    BridgeSource, CaptureConfig, CaptureLoop, DeviceBridge, DisplayLoop, FrameQueue, LinkError,
    scaled_height,
};

use screenlink_viewer::config::ViewerConfig;
use screenlink_viewer::window::WindowSink;

/// Upper bound on waiting for the capture task after stop.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "screenlink-viewer", about = "Mirror an attached phone's screen")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "screenlink-viewer.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = ViewerConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("screenlink-viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("bridge: {}", config.bridge.adb_path);
    info!("target width: {}", config.display.target_width);
    info!("target FPS: {}", config.display.target_fps);

    let bridge = DeviceBridge::new(&config.bridge.adb_path)
        .with_timeout(Duration::from_millis(config.bridge.timeout_ms));

    // The window opens before the first frame arrives; size it from the
    // device when reachable, else assume a common portrait aspect.
    let target_width = config.display.target_width;
    let window_height = match bridge.display_size().await {
        Ok((w, h)) => {
            info!("device display: {w}x{h}");
            scaled_height(w, h, target_width)
        }
        Err(e) => {
            warn!("device not reachable yet: {e}");
            scaled_height(1080, 2400, target_width)
        }
    };

    let queue = Arc::new(FrameQueue::with_capacity(config.display.queue_depth));
    let mut capture = CaptureLoop::new(
        Arc::clone(&queue),
        CaptureConfig {
            target_width: Some(target_width),
            ..Default::default()
        },
    );
    capture.start(BridgeSource::new(bridge));

    let mut sink = WindowSink::create("screenlink", target_width, window_height)?;
    let mut display = DisplayLoop::new(Arc::clone(&queue), config.display.target_fps);
    display.run(&mut sink).await?;

    // Shutdown: flag the producer, then wait a bounded time for it.
    info!("window closed — shutting down");
    capture.stop();
    match capture.join(JOIN_TIMEOUT).await {
        Ok(()) => info!("capture loop stopped"),
        Err(LinkError::JoinTimeout(t)) => {
            warn!("capture loop ignored stop for {t:?}; aborted")
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
