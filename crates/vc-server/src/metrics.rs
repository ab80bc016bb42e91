use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// HTTP-side counters, shared across handler tasks.
#[derive(Debug)]
pub struct MetricsCollector {
    pub stream_clients: AtomicU64,
    pub stream_frames_sent: AtomicU64,
    pub stream_bytes_sent: AtomicU64,
    pub single_frames_served: AtomicU64,
    pub config_updates: AtomicU64,
    pub start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            stream_clients: AtomicU64::new(0),
            stream_frames_sent: AtomicU64::new(0),
            stream_bytes_sent: AtomicU64::new(0),
            single_frames_served: AtomicU64::new(0),
            config_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn record_stream_frame(&self, bytes: usize) {
        self.stream_frames_sent.fetch_add(1, Ordering::Relaxed);
        self.stream_bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_single_frame(&self) {
        self.single_frames_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_config_update(&self) {
        self.config_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_clients(&self) -> u64 {
        self.stream_clients.load(Ordering::Relaxed)
    }

    pub fn average_stream_bitrate_kbps(&self) -> f64 {
        let uptime = self.uptime_secs();
        if uptime > 0 {
            (self.stream_bytes_sent.load(Ordering::Relaxed) * 8) as f64 / uptime as f64 / 1000.0
        } else {
            0.0
        }
    }
}

/// Counts one connected MJPEG client for as long as it is alive.
#[derive(Debug)]
pub struct StreamClientGuard {
    metrics: Arc<MetricsCollector>,
}

impl StreamClientGuard {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        metrics.stream_clients.fetch_add(1, Ordering::Relaxed);
        Self { metrics }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

impl Drop for StreamClientGuard {
    fn drop(&mut self) {
        self.metrics.stream_clients.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_guard_counts() {
        let metrics = Arc::new(MetricsCollector::new());

        let first = StreamClientGuard::new(metrics.clone());
        let second = StreamClientGuard::new(metrics.clone());
        assert_eq!(metrics.active_clients(), 2);

        drop(first);
        assert_eq!(metrics.active_clients(), 1);
        drop(second);
        assert_eq!(metrics.active_clients(), 0);
    }

    #[test]
    fn test_record_stream_frame() {
        let metrics = MetricsCollector::new();
        metrics.record_stream_frame(1000);
        metrics.record_stream_frame(500);

        assert_eq!(metrics.stream_frames_sent.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.stream_bytes_sent.load(Ordering::Relaxed), 1500);
    }
}
