//! screenlink-relay — entry point.
//!
//! ```text
//! screenlink-relay                   Serve on the configured address
//! screenlink-relay --config <path>   Load a custom config TOML
//! screenlink-relay --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use async_trait::async_trait;
use screenlink_core::{
    DesktopSource, Frame, FrameSource, InjectionService, SystemInput, Unavailable,
};

use screenlink_relay::config::RelayConfig;
use screenlink_relay::routes::{RelayState, local_ip, qr_banner, routes};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "screenlink-relay", about = "Serve the PC screen to a phone browser")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "screenlink-relay.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

/// Stand-in source when desktop capture could not be opened.
struct UnavailableSource(String);

#[async_trait]
impl FrameSource for UnavailableSource {
    async fn capture(&mut self, _target_width: Option<u32>) -> Result<Frame, Unavailable> {
        Err(Unavailable::Platform(self.0.clone()))
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&RelayConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = RelayConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("screenlink-relay v{}", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let host: std::net::IpAddr = config.server.host.parse()?;

    // Without a capturer the server still runs; every snapshot carries
    // the failure text as an error image.
    let source: Box<dyn FrameSource> = match DesktopSource::new(config.stream.monitor_index) {
        Ok(desktop) => {
            info!("capturing {}x{}", desktop.width(), desktop.height());
            Box::new(desktop)
        }
        Err(e) => {
            tracing::warn!("desktop capture unavailable: {e}");
            Box::new(UnavailableSource(e.to_string()))
        }
    };
    let injector = InjectionService::spawn(SystemInput::new());
    let state = RelayState::new(Arc::new(Mutex::new(source)), injector, config);

    let ip = local_ip();
    println!("{}", "=".repeat(50));
    println!("Local access:  http://localhost:{port}");
    println!("Phone access:  http://{ip}:{port}");
    println!("Any device on the same Wi-Fi can connect.");
    println!("{}", "=".repeat(50));
    println!("Tap the screen on the phone to control the mouse.");
    println!("Press Ctrl+C to stop the server.");
    println!("{}", "=".repeat(50));
    if let Some(qr) = qr_banner(&format!("http://{ip}:{port}")) {
        println!("{qr}");
        println!("Scan to open on the phone.");
    }

    warp::serve(routes(state)).run((host, port)).await;

    Ok(())
}
