//! Screen capture backed by the `xcap` crate.

use super::*;
use image::{imageops, RgbaImage};
use tracing::info;
use xcap::Monitor;

/// Captures through the OS display APIs that `xcap` wraps.
///
/// Holds no handles: monitors are enumerated per call so topology changes
/// are picked up by the next grab.
#[derive(Debug, Default)]
pub struct XcapCapture;

impl XcapCapture {
    pub fn new() -> Self {
        info!("Creating xcap screen capture backend");
        Self
    }

    fn physical_monitors() -> Result<Vec<(Monitor, BoundingBox)>> {
        let monitors = Monitor::all()
            .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

        monitors
            .into_iter()
            .map(|monitor| {
                let rect = monitor_rect(&monitor)?;
                Ok((monitor, rect))
            })
            .collect()
    }
}

fn monitor_rect(monitor: &Monitor) -> Result<BoundingBox> {
    let enumeration = |e: xcap::XCapError| CaptureError::MonitorEnumeration(e.to_string());

    Ok(BoundingBox {
        top: monitor.y().map_err(enumeration)?,
        left: monitor.x().map_err(enumeration)?,
        width: monitor.width().map_err(enumeration)?,
        height: monitor.height().map_err(enumeration)?,
    })
}

impl ScreenCapture for XcapCapture {
    fn monitors(&self) -> Result<Vec<MonitorInfo>> {
        let rects: Vec<BoundingBox> = Self::physical_monitors()?
            .into_iter()
            .map(|(_, rect)| rect)
            .collect();

        Ok(index_monitors(&rects))
    }

    fn grab(&self, bbox: &BoundingBox) -> Result<CapturedFrame> {
        if bbox.is_empty() {
            return Err(CaptureError::InvalidRegion(format!("{:?}", bbox)));
        }

        // A box may span several displays (virtual desktop), so every
        // overlapping monitor contributes its piece to one canvas.
        let mut canvas = RgbaImage::new(bbox.width, bbox.height);
        let mut covered = false;

        for (monitor, rect) in Self::physical_monitors()? {
            let Some(overlap) = rect.intersect(bbox) else {
                continue;
            };

            let shot = monitor
                .capture_image()
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

            let src_x = (overlap.left - rect.left) as u32;
            let src_y = (overlap.top - rect.top) as u32;
            let width = overlap.width.min(shot.width().saturating_sub(src_x));
            let height = overlap.height.min(shot.height().saturating_sub(src_y));
            if width == 0 || height == 0 {
                continue;
            }

            let piece = imageops::crop_imm(&shot, src_x, src_y, width, height).to_image();
            imageops::replace(
                &mut canvas,
                &piece,
                (overlap.left - bbox.left) as i64,
                (overlap.top - bbox.top) as i64,
            );
            covered = true;
        }

        if !covered {
            return Err(CaptureError::OutOfBounds(*bbox));
        }

        let (width, height) = canvas.dimensions();
        Ok(CapturedFrame {
            data: canvas.into_raw(),
            width,
            height,
            stride: width * 4,
            format: PixelFormat::RGBA,
            timestamp: Instant::now(),
        })
    }
}
