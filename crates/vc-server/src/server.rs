use crate::config::Settings;
use crate::metrics::{MetricsCollector, StreamClientGuard};
use crate::net::local_ip;
use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream;
use serde::Serialize;
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::future::Future;
use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use vc_capture::{BoundingBox, MonitorInfo, ScreenCapture};
use vc_core::store::MSG_INVALID_PAYLOAD;
use vc_core::{CaptureConfig, CaptureEngine, EngineStats};
use vc_encoder::JpegEncoder;

const VIEWER_PAGE: &str = include_str!("../static/index.html");
const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";
const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";
const X_CAPTURE_WIDTH: HeaderName = HeaderName::from_static("x-capture-width");
const X_CAPTURE_HEIGHT: HeaderName = HeaderName::from_static("x-capture-height");

pub struct StreamingServer {
    settings: Settings,
    state: AppState,
}

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CaptureEngine>,
    pub metrics: Arc<MetricsCollector>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(engine: Arc<CaptureEngine>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            engine,
            metrics: Arc::new(MetricsCollector::new()),
            shutdown_tx,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    config: CaptureConfig,
    monitors: Vec<MonitorInfo>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    config: CaptureConfig,
    monitors: Vec<MonitorInfo>,
    ip: IpAddr,
    bbox: Option<BoundingBox>,
}

impl StreamingServer {
    pub fn new(settings: Settings, capture: Arc<dyn ScreenCapture>) -> Self {
        let engine = CaptureEngine::new(
            capture,
            Arc::new(JpegEncoder::new()),
            settings.capture.clone(),
        );

        Self {
            settings,
            state: AppState::new(Arc::new(engine)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        info!("Starting VR stream server...");

        self.state.engine.start().await?;
        self.start_metrics_loop();

        Ok(())
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serves HTTP until `signal` resolves, then ends open streams so the
    /// graceful shutdown can complete.
    pub async fn serve<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.settings.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("🚀 VR stream server is running!");
        info!("   Listening on http://{}", addr);
        info!("   Open http://{}:{} in the headset browser (same network)",
              local_ip().await, addr.port());
        info!("   Press Ctrl+C to stop");

        let shutdown_tx = self.state.shutdown_tx.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                signal.await;
                let _ = shutdown_tx.send(());
            })
            .await
            .context("HTTP server failed")?;

        Ok(())
    }

    fn start_metrics_loop(&self) {
        let engine = self.state.engine.clone();
        let metrics = self.state.metrics.clone();
        let mut shutdown_rx = self.state.shutdown_tx.subscribe();
        let period = Duration::from_secs(self.settings.server.metrics_interval_secs);

        tokio::spawn(async move {
            let mut interval = interval(period);
            let mut last = EngineStats::default();

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let stats = engine.get_stats().await;
                        let secs = period.as_secs_f64();

                        let capture_fps = (stats.frames_encoded - last.frames_encoded) as f64 / secs;
                        let errors = stats.capture_errors - last.capture_errors;

                        info!("📊 Metrics: capture={:.1} fps, errors={}, clients={}, stream={:.0} kbps",
                              capture_fps, errors, metrics.active_clients(),
                              metrics.average_stream_bitrate_kbps());

                        last = stats;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping VR stream server...");

        let _ = self.state.shutdown_tx.send(());
        self.state.engine.stop().await?;

        let stats = self.state.engine.get_stats().await;
        let metrics = &self.state.metrics;
        info!("Final statistics:");
        info!("  Frames captured: {}", stats.frames_captured);
        info!("  Frames encoded: {}", stats.frames_encoded);
        info!("  Capture errors: {}", stats.capture_errors);
        info!("  Total bytes encoded: {} MB", stats.bytes_encoded / 1_000_000);
        info!("  Stream frames sent: {}", metrics.stream_frames_sent.load(Ordering::Relaxed));
        info!("  Single frames served: {}", metrics.single_frames_served.load(Ordering::Relaxed));
        info!("  Config updates: {}", metrics.config_updates.load(Ordering::Relaxed));
        info!("  Uptime: {} seconds", metrics.uptime_secs());

        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        .route("/update_config", axum::routing::post(update_config).options(preflight))
        .route("/config", get(current_config).options(preflight))
        .route("/health", get(health).options(preflight))
        .route("/frame.jpg", get(frame_jpg))
        .layer(middleware::map_response(add_cors_headers))
        .with_state(state)
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    response
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn index() -> Html<&'static str> {
    Html(VIEWER_PAGE)
}

async fn video_feed(State(state): State<AppState>) -> Response {
    let subscriber = state.engine.subscribe();
    let shutdown_rx = state.shutdown_tx.subscribe();
    let guard = StreamClientGuard::new(state.metrics.clone());
    let content_type = state.engine.content_type();

    info!("Stream client connected ({} active)", guard.metrics().active_clients());

    // Each part waits for the next publish; the body is dropped (and the
    // guard with it) when the client goes away.
    let parts = stream::unfold(
        (subscriber, shutdown_rx, guard),
        move |(mut subscriber, mut shutdown_rx, guard)| async move {
            let frame = tokio::select! {
                frame = subscriber.next() => frame?,
                _ = shutdown_rx.recv() => return None,
            };

            guard.metrics().record_stream_frame(frame.size());
            let part = mjpeg_part(content_type, &frame.jpeg);
            Some((Ok::<_, Infallible>(part), (subscriber, shutdown_rx, guard)))
        },
    );

    ([(header::CONTENT_TYPE, MJPEG_CONTENT_TYPE)], Body::from_stream(parts)).into_response()
}

fn mjpeg_part(content_type: &str, jpeg: &[u8]) -> Bytes {
    let head = format!("--frame\r\nContent-Type: {}\r\n\r\n", content_type);

    let mut buf = BytesMut::with_capacity(head.len() + jpeg.len() + 2);
    buf.put_slice(head.as_bytes());
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// `None` when the body is not JSON. Falsy JSON values (`null`, `false`,
/// `0`, `""`, `[]`) count as an empty update.
fn parse_payload(body: &[u8]) -> Option<Value> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            debug!("Unparsable config body: {}", e);
            return None;
        }
    };

    let falsy = match &value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    };

    Some(if falsy { Value::Object(Map::new()) } else { value })
}

async fn update_config(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(payload) = parse_payload(&body) else {
        let response = ConfigResponse {
            status: "error",
            message: Some(MSG_INVALID_PAYLOAD),
            config: state.engine.config(),
            monitors: state.engine.monitors().await,
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    };

    let outcome = state.engine.update_config(&payload);

    let status = if outcome.accepted {
        state.metrics.record_config_update();
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    let response = ConfigResponse {
        status: if outcome.accepted { "success" } else { "error" },
        message: Some(outcome.message),
        config: outcome.config,
        monitors: state.engine.monitors().await,
    };

    (status, Json(response)).into_response()
}

async fn current_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        status: "ok",
        message: None,
        config: state.engine.config(),
        monitors: state.engine.monitors().await,
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.engine.config();
    let monitors = state.engine.monitors().await;
    let bbox = vc_core::bbox::resolve(&config, &monitors);

    Json(HealthResponse {
        status: "ok",
        config,
        monitors,
        ip: local_ip().await,
        bbox,
    })
}

async fn frame_jpg(State(state): State<AppState>) -> Response {
    let Some(frame) = state.engine.latest_frame() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    state.metrics.record_single_frame();

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(state.engine.content_type())),
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE)),
            (X_CAPTURE_WIDTH, HeaderValue::from(frame.bbox.width)),
            (X_CAPTURE_HEIGHT, HeaderValue::from(frame.bbox.height)),
        ],
        frame.jpeg.clone(),
    )
        .into_response()
}
