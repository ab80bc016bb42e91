use super::*;
use image::codecs::jpeg;
use image::ExtendedColorType;
use tracing::info;

/// Baseline JPEG encoder built on the `image` crate.
#[derive(Debug, Default)]
pub struct JpegEncoder;

impl JpegEncoder {
    pub fn new() -> Self {
        info!("Initializing JPEG encoder (quality {}-{})", MIN_QUALITY, MAX_QUALITY);
        Self
    }

    /// Packs 4-byte pixels into tightly packed RGB, dropping alpha and
    /// any row padding.
    fn to_rgb(&self, frame: &RawFrame) -> Vec<u8> {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let stride = frame.stride as usize;
        let mut rgb = Vec::with_capacity(width * height * 3);

        let (r, g, b) = match frame.format {
            PixelFormat::BGRA => (2, 1, 0),
            PixelFormat::RGBA => (0, 1, 2),
        };

        for row in frame.data.chunks(stride).take(height) {
            for px in row[..width * 4].chunks_exact(4) {
                rgb.extend_from_slice(&[px[r], px[g], px[b]]);
            }
        }

        rgb
    }

    fn validate(&self, frame: &RawFrame) -> Result<()> {
        if frame.width == 0 || frame.height == 0 {
            return Err(EncoderError::InvalidFrame(format!(
                "zero dimension {}x{}", frame.width, frame.height
            )));
        }

        let row_bytes = frame.width as u64 * 4;
        if (frame.stride as u64) < row_bytes {
            return Err(EncoderError::InvalidFrame(format!(
                "stride {} shorter than row of {} bytes", frame.stride, row_bytes
            )));
        }

        // The last row only needs its pixels, not its padding.
        let needed = frame.stride as u64 * (frame.height as u64 - 1) + row_bytes;
        if (frame.data.len() as u64) < needed {
            return Err(EncoderError::InvalidFrame(format!(
                "buffer holds {} bytes, need {}", frame.data.len(), needed
            )));
        }

        Ok(())
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&self, frame: &RawFrame, quality: u8) -> Result<EncodedFrame> {
        self.validate(frame)?;

        let quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);
        let rgb = self.to_rgb(frame);

        let mut out = Vec::new();
        jpeg::JpegEncoder::new_with_quality(&mut out, quality)
            .encode(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| EncoderError::EncodingFailed(e.to_string()))?;

        Ok(EncodedFrame {
            data: Bytes::from(out),
            width: frame.width,
            height: frame.height,
            quality,
            timestamp: Instant::now(),
        })
    }

    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}
