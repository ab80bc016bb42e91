use std::time::Instant;
use bytes::Bytes;
use thiserror::Error;

pub mod jpeg;

pub use jpeg::JpegEncoder;

pub type Result<T> = std::result::Result<T, EncoderError>;

pub const MIN_QUALITY: u8 = 10;
pub const MAX_QUALITY: u8 = 95;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

#[derive(Debug, Clone)]
pub struct RawFrame {
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

#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub timestamp: Instant,
}

impl EncodedFrame {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Trait for still-image frame encoders
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &RawFrame, quality: u8) -> Result<EncodedFrame>;
    fn mime_type(&self) -> &'static str;
}
