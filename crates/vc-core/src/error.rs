use thiserror::Error;
use vc_capture::CaptureError;
use vc_encoder::EncoderError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncoderError),

    #[error("Capture task failed: {0}")]
    Task(String),

    #[error("Already running")]
    AlreadyRunning,

    #[error("Not running")]
    NotRunning,
}
