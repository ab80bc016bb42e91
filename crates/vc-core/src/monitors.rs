use std::sync::{PoisonError, RwLock};
use tracing::debug;
use vc_capture::{MonitorInfo, ScreenCapture};

/// Every this many capture ticks the monitor list is re-queried, so
/// display topology changes are noticed without a per-frame query.
pub const MONITOR_REFRESH_TICKS: u64 = 300;

/// Last known monitor layout.
#[derive(Debug, Default)]
pub struct MonitorCache {
    monitors: RwLock<Vec<MonitorInfo>>,
}

impl MonitorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&self, capture: &dyn ScreenCapture) -> vc_capture::Result<Vec<MonitorInfo>> {
        let monitors = capture.monitors()?;
        debug!("Monitor cache refreshed: {} entries", monitors.len());

        *self.monitors.write().unwrap_or_else(PoisonError::into_inner) = monitors.clone();
        Ok(monitors)
    }

    pub fn snapshot(&self) -> Vec<MonitorInfo> {
        self.monitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_capture::{BoundingBox, SyntheticCapture};

    #[test]
    fn test_refresh_populates_cache() {
        let cache = MonitorCache::new();
        let capture = SyntheticCapture::new(vec![BoundingBox::new(0, 0, 800, 600)]);

        assert!(cache.snapshot().is_empty());
        cache.refresh(&capture).unwrap();

        let monitors = cache.snapshot();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[1].width, 800);
    }
}
