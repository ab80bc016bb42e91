use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vc_capture::{ScreenCapture, XcapCapture};

mod config;
mod metrics;
mod net;
mod server;

use config::Settings;
use server::StreamingServer;

#[derive(Parser, Debug)]
#[command(name = "vrcast")]
#[command(about = "Screen region MJPEG streamer for VR headsets", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "vrcast.toml")]
    config: PathBuf,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// List detected monitors and exit
    #[arg(long)]
    list_monitors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("🥽 VR Stream Server v{}", env!("CARGO_PKG_VERSION"));

    let capture: Arc<dyn ScreenCapture> = Arc::new(XcapCapture::new());

    if args.list_monitors {
        list_monitors(capture.as_ref())?;
        return Ok(());
    }

    // Load configuration
    let mut settings = if args.config.exists() {
        info!("Loading configuration from: {}", args.config.display());
        Settings::from_file(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        Settings::default()
    };

    // Apply CLI overrides
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(bind) = args.bind {
        settings.server.bind_address = bind;
    }

    settings.validate()?;

    info!("Configuration:");
    info!("  Capture: {:?} on monitor {}, region {:?}",
          settings.capture.mode, settings.capture.monitor_index, settings.capture.region);
    info!("  Stream: {} fps, JPEG quality {}",
          settings.capture.fps, settings.capture.quality);

    let server = StreamingServer::new(settings, capture);
    server.start().await?;

    // Handle Ctrl+C gracefully
    server.serve(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down...");
    })
    .await?;

    server.stop().await?;

    info!("Server stopped gracefully");
    Ok(())
}

fn list_monitors(capture: &dyn ScreenCapture) -> anyhow::Result<()> {
    println!("Detected monitors:");
    for monitor in capture.monitors()? {
        let label = if monitor.index == 0 { " (virtual desktop)" } else { "" };
        println!("  {}. {}x{} at ({}, {}){}",
                 monitor.index, monitor.width, monitor.height,
                 monitor.left, monitor.top, label);
    }
    Ok(())
}
