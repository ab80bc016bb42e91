pub mod bbox;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod monitors;
pub mod store;

pub use config::{CaptureConfig, CaptureMode, Region};
pub use engine::{CaptureEngine, EngineStats};
pub use error::{EngineError, Result};
pub use frame::{FrameSlot, FrameSubscriber, LatestFrame};
pub use monitors::MonitorCache;
pub use store::{ConfigStore, UpdateOutcome};

// Re-export for convenience
pub use vc_capture::{BoundingBox, MonitorInfo};
