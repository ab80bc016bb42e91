use crate::bbox;
use crate::config::CaptureConfig;
use crate::error::Result;
use crate::frame::{FrameSlot, FrameSubscriber, LatestFrame};
use crate::monitors::{MonitorCache, MONITOR_REFRESH_TICKS};
use crate::store::{ConfigStore, UpdateOutcome};
use crate::EngineError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use vc_capture::{BoundingBox, CapturedFrame, MonitorInfo, ScreenCapture};
use vc_encoder::{EncodedFrame, FrameEncoder, PixelFormat, RawFrame};

/// Pause after a failed grab or encode before the next attempt.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Owns the background capture loop and the state it shares with
/// HTTP consumers.
pub struct CaptureEngine {
    ctx: CaptureContext,
    running: Arc<RwLock<bool>>,
    shutdown_tx: broadcast::Sender<()>,
}

#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    pub frames_captured: u64,
    pub frames_encoded: u64,
    pub frames_skipped: u64,
    pub capture_errors: u64,
    pub bytes_encoded: u64,
}

#[derive(Clone)]
struct CaptureContext {
    capture: Arc<dyn ScreenCapture>,
    encoder: Arc<dyn FrameEncoder>,
    store: Arc<ConfigStore>,
    monitors: Arc<MonitorCache>,
    frames: FrameSlot,
    stats: Arc<RwLock<EngineStats>>,
}

struct TickOutput {
    encoded: EncodedFrame,
    bbox: BoundingBox,
}

impl CaptureEngine {
    pub fn new(
        capture: Arc<dyn ScreenCapture>,
        encoder: Arc<dyn FrameEncoder>,
        initial: CaptureConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        info!("Created capture engine with config: {:?}", initial);

        Self {
            ctx: CaptureContext {
                capture,
                encoder,
                store: Arc::new(ConfigStore::new(initial)),
                monitors: Arc::new(MonitorCache::new()),
                frames: FrameSlot::new(),
                stats: Arc::new(RwLock::new(EngineStats::default())),
            },
            running: Arc::new(RwLock::new(false)),
            shutdown_tx,
        }
    }

    pub async fn start(&self) -> Result<()> {
        {
            let mut running = self.running.write().await;
            if *running {
                return Err(EngineError::AlreadyRunning);
            }

            *running = true;
        }

        info!("Starting capture engine");

        let ctx = self.ctx.clone();
        let initial = tokio::task::spawn_blocking(move || {
            ctx.monitors.refresh(ctx.capture.as_ref())
        })
        .await;

        match initial {
            Ok(Ok(monitors)) => info!("Detected {} monitors (including virtual desktop)", monitors.len()),
            Ok(Err(e)) => warn!("Initial monitor query failed: {}", e),
            Err(e) => warn!("Initial monitor query panicked: {}", e),
        }

        tokio::spawn(run_capture_loop(self.ctx.clone(), self.shutdown_tx.subscribe()));

        info!("Capture engine started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.write().await;

        if !*running {
            return Err(EngineError::NotRunning);
        }

        info!("Stopping capture engine");
        let _ = self.shutdown_tx.send(());

        *running = false;
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub fn config(&self) -> CaptureConfig {
        self.ctx.store.read()
    }

    pub fn update_config(&self, payload: &Value) -> UpdateOutcome {
        self.ctx.store.apply(payload)
    }

    /// Cached monitor layout. Before the first successful refresh the
    /// backend is queried on the blocking pool; a failed query is empty.
    pub async fn monitors(&self) -> Vec<MonitorInfo> {
        let cached = self.ctx.monitors.snapshot();
        if !cached.is_empty() {
            return cached;
        }

        let capture = self.ctx.capture.clone();
        match tokio::task::spawn_blocking(move || capture.monitors()).await {
            Ok(Ok(monitors)) => monitors,
            Ok(Err(e)) => {
                debug!("Direct monitor query failed: {}", e);
                Vec::new()
            }
            Err(e) => {
                warn!("Direct monitor query panicked: {}", e);
                Vec::new()
            }
        }
    }

    /// Capture rectangle for the current config and monitor layout.
    pub async fn bbox(&self) -> Option<BoundingBox> {
        bbox::resolve(&self.config(), &self.monitors().await)
    }

    /// Content type of the published frames.
    pub fn content_type(&self) -> &'static str {
        self.ctx.encoder.mime_type()
    }

    pub fn latest_frame(&self) -> Option<Arc<LatestFrame>> {
        self.ctx.frames.latest()
    }

    pub fn subscribe(&self) -> FrameSubscriber {
        self.ctx.frames.subscribe()
    }

    pub async fn get_stats(&self) -> EngineStats {
        self.ctx.stats.read().await.clone()
    }
}

fn frame_interval(fps: u32) -> Duration {
    Duration::from_micros(1_000_000 / fps.max(1) as u64)
}

async fn run_capture_loop(ctx: CaptureContext, mut shutdown_rx: broadcast::Receiver<()>) {
    info!("Capture loop started");

    let mut tick = 0u64;
    let mut sequence = 0u64;

    loop {
        // Changes made while this tick runs apply from the next one.
        let config = ctx.store.read();
        tick += 1;

        let delay = match ctx.tick(&config, tick).await {
            Ok(Some(output)) => {
                sequence += 1;
                let encoded = output.encoded;

                if sequence % 60 == 0 {
                    debug!("Published {} frames (last {}x{} at q{}, {} bytes)",
                           sequence, encoded.width, encoded.height, encoded.quality, encoded.size());
                }

                ctx.frames.publish(LatestFrame {
                    jpeg: encoded.data,
                    bbox: output.bbox,
                    sequence,
                    captured_at: encoded.timestamp,
                });
                frame_interval(config.fps)
            }
            Ok(None) => frame_interval(config.fps),
            Err(e) => {
                warn!("Capture error: {}", e);
                ERROR_BACKOFF
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.recv() => {
                info!("Capture loop shutting down");
                break;
            }
        }
    }

    info!("Capture loop stopped");
}

impl CaptureContext {
    async fn tick(&self, config: &CaptureConfig, tick: u64) -> Result<Option<TickOutput>> {
        let refresh = tick % MONITOR_REFRESH_TICKS == 0 || self.monitors.snapshot().is_empty();
        let ctx = self.clone();
        let config = config.clone();

        let result = tokio::task::spawn_blocking(move || ctx.grab_and_encode(&config, refresh))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;

        let mut stats = self.stats.write().await;
        match &result {
            Ok(Some(output)) => {
                stats.frames_captured += 1;
                stats.frames_encoded += 1;
                stats.bytes_encoded += output.encoded.size() as u64;
            }
            Ok(None) => stats.frames_skipped += 1,
            Err(EngineError::Encoding(_)) => {
                stats.frames_captured += 1;
                stats.capture_errors += 1;
            }
            Err(_) => stats.capture_errors += 1,
        }

        result
    }

    /// Runs on the blocking pool; no lock is held while grabbing or encoding.
    fn grab_and_encode(&self, config: &CaptureConfig, refresh: bool) -> Result<Option<TickOutput>> {
        let monitors = if refresh {
            self.monitors.refresh(self.capture.as_ref())?
        } else {
            self.monitors.snapshot()
        };

        let Some(bbox) = bbox::resolve(config, &monitors) else {
            return Ok(None);
        };

        let grabbed = self.capture.grab(&bbox)?;
        let encoded = self.encoder.encode(&to_raw_frame(grabbed), config.quality)?;

        Ok(Some(TickOutput { encoded, bbox }))
    }
}

fn to_raw_frame(frame: CapturedFrame) -> RawFrame {
    RawFrame {
        data: frame.data,
        width: frame.width,
        height: frame.height,
        stride: frame.stride,
        format: match frame.format {
            vc_capture::PixelFormat::BGRA => PixelFormat::BGRA,
            vc_capture::PixelFormat::RGBA => PixelFormat::RGBA,
        },
        timestamp: frame.timestamp,
    }
}
