use super::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory backend producing a deterministic BGRA test pattern.
///
/// Used by tests and headless runs where no display is attached.
#[derive(Debug)]
pub struct SyntheticCapture {
    physical: RwLock<Vec<BoundingBox>>,
    failing: bool,
    grabs: AtomicU64,
}

impl SyntheticCapture {
    pub fn new(physical: Vec<BoundingBox>) -> Self {
        Self {
            physical: RwLock::new(physical),
            failing: false,
            grabs: AtomicU64::new(0),
        }
    }

    /// A backend whose monitors enumerate fine but every grab errors.
    pub fn failing(physical: Vec<BoundingBox>) -> Self {
        Self {
            failing: true,
            ..Self::new(physical)
        }
    }

    /// Replaces the display layout, as when a monitor is plugged in.
    pub fn set_physical(&self, physical: Vec<BoundingBox>) {
        *self.physical.write().unwrap_or_else(PoisonError::into_inner) = physical;
    }

    fn physical(&self) -> Vec<BoundingBox> {
        self.physical
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn grab_count(&self) -> u64 {
        self.grabs.load(Ordering::Relaxed)
    }
}

impl ScreenCapture for SyntheticCapture {
    fn monitors(&self) -> Result<Vec<MonitorInfo>> {
        Ok(index_monitors(&self.physical()))
    }

    fn grab(&self, bbox: &BoundingBox) -> Result<CapturedFrame> {
        self.grabs.fetch_add(1, Ordering::Relaxed);

        if self.failing {
            return Err(CaptureError::CaptureFailed("synthetic failure".into()));
        }
        if bbox.is_empty() {
            return Err(CaptureError::InvalidRegion(format!("{:?}", bbox)));
        }
        if !self.physical().iter().any(|rect| rect.intersect(bbox).is_some()) {
            return Err(CaptureError::OutOfBounds(*bbox));
        }

        let stride = bbox.width * 4;
        let mut data = vec![0u8; (stride * bbox.height) as usize];

        for y in 0..bbox.height {
            for x in 0..bbox.width {
                let idx = (y * stride + x * 4) as usize;
                data[idx] = (x % 256) as u8; // B
                data[idx + 1] = (y % 256) as u8; // G
                data[idx + 2] = 0x80; // R
                data[idx + 3] = 0xff;
            }
        }

        Ok(CapturedFrame {
            data,
            width: bbox.width,
            height: bbox.height,
            stride,
            format: PixelFormat::BGRA,
            timestamp: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grab_matches_bbox() {
        let capture = SyntheticCapture::new(vec![BoundingBox::new(0, 0, 320, 240)]);
        let frame = capture.grab(&BoundingBox::new(10, 20, 64, 32)).unwrap();

        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 32);
        assert_eq!(frame.data.len(), 64 * 32 * 4);
        assert_eq!(frame.format, PixelFormat::BGRA);
        assert_eq!(capture.grab_count(), 1);
    }

    #[test]
    fn test_grab_outside_monitors_fails() {
        let capture = SyntheticCapture::new(vec![BoundingBox::new(0, 0, 320, 240)]);
        let result = capture.grab(&BoundingBox::new(400, 0, 10, 10));

        assert!(matches!(result, Err(CaptureError::OutOfBounds(_))));
    }

    #[test]
    fn test_failing_backend() {
        let capture = SyntheticCapture::failing(vec![BoundingBox::new(0, 0, 320, 240)]);

        assert!(capture.monitors().is_ok());
        assert!(capture.grab(&BoundingBox::new(0, 0, 10, 10)).is_err());
    }

    #[test]
    fn test_layout_change_visible_to_queries() {
        let capture = SyntheticCapture::new(vec![BoundingBox::new(0, 0, 320, 240)]);

        capture.set_physical(vec![
            BoundingBox::new(0, 0, 320, 240),
            BoundingBox::new(320, 0, 640, 480),
        ]);

        let monitors = capture.monitors().unwrap();
        assert_eq!(monitors.len(), 3);
        assert_eq!(monitors[0].width, 960);
        assert!(capture.grab(&BoundingBox::new(400, 0, 10, 10)).is_ok());
    }
}
