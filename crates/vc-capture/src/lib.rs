mod synthetic;
mod xcap_backend;

use std::time::Instant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use synthetic::SyntheticCapture;
pub use xcap_backend::XcapCapture;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Region {0:?} does not overlap any monitor")]
    OutOfBounds(BoundingBox),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),
}

/// Rectangle in absolute virtual-desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { top, left, width, height }
    }

    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left as i64 || bottom <= top as i64 {
            return None;
        }

        Some(BoundingBox {
            top,
            left,
            width: (right - left as i64) as u32,
            height: (bottom - top as i64) as u32,
        })
    }

    /// Smallest rectangle covering every input rectangle.
    pub fn union_all(rects: &[BoundingBox]) -> Option<BoundingBox> {
        let first = rects.first()?;
        let mut left = first.left as i64;
        let mut top = first.top as i64;
        let mut right = first.right();
        let mut bottom = first.bottom();

        for rect in &rects[1..] {
            left = left.min(rect.left as i64);
            top = top.min(rect.top as i64);
            right = right.max(rect.right());
            bottom = bottom.max(rect.bottom());
        }

        Some(BoundingBox {
            top: top as i32,
            left: left as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}

/// A detected display. Index 0 is the combined virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub index: usize,
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

impl MonitorInfo {
    pub fn rect(&self) -> BoundingBox {
        BoundingBox::new(self.left, self.top, self.width, self.height)
    }
}

/// Builds the indexed monitor list from physical display rectangles,
/// prepending the virtual desktop entry at index 0.
pub fn index_monitors(physical: &[BoundingBox]) -> Vec<MonitorInfo> {
    let Some(desktop) = BoundingBox::union_all(physical) else {
        return Vec::new();
    };

    std::iter::once(desktop)
        .chain(physical.iter().copied())
        .enumerate()
        .map(|(index, rect)| MonitorInfo {
            index,
            top: rect.top,
            left: rect.left,
            width: rect.width,
            height: rect.height,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    BGRA,
    RGBA,
}

/// Trait that every capture backend must provide
pub trait ScreenCapture: Send + Sync {
    fn monitors(&self) -> Result<Vec<MonitorInfo>>;
    fn grab(&self, bbox: &BoundingBox) -> Result<CapturedFrame>;
}
