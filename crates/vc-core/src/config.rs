use serde::{Deserialize, Serialize};

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;
pub const MIN_QUALITY: u8 = vc_encoder::MIN_QUALITY;
pub const MAX_QUALITY: u8 = vc_encoder::MAX_QUALITY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    /// 0 is the virtual desktop, 1 the first physical display.
    pub monitor_index: i64,
    pub region: Region,
    pub fps: u32,
    pub quality: u8,
}

/// Any unrecognised mode string falls back to `Region`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CaptureMode {
    #[default]
    Region,
    Monitor,
}

impl CaptureMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "region" => Some(CaptureMode::Region),
            "monitor" => Some(CaptureMode::Monitor),
            _ => None,
        }
    }
}

impl From<String> for CaptureMode {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or_default()
    }
}

/// Capture rectangle relative to the selected monitor's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub top: i64,
    pub left: i64,
    pub width: i64,
    pub height: i64,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            top: 0,
            left: 0,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Region,
            monitor_index: 1,
            region: Region::default(),
            fps: 30,
            quality: 80,
        }
    }
}

pub fn clamp_fps(value: i64) -> u32 {
    value.clamp(MIN_FPS as i64, MAX_FPS as i64) as u32
}

pub fn clamp_quality(value: i64) -> u8 {
    value.clamp(MIN_QUALITY as i64, MAX_QUALITY as i64) as u8
}

impl CaptureConfig {
    /// Applies the same bounds an update would, for values loaded from disk.
    pub fn normalized(mut self) -> Self {
        self.fps = clamp_fps(self.fps as i64);
        self.quality = clamp_quality(self.quality as i64);
        self.region.top = self.region.top.max(0);
        self.region.left = self.region.left.max(0);
        self.region.width = self.region.width.max(1);
        self.region.height = self.region.height.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();

        assert_eq!(config.mode, CaptureMode::Region);
        assert_eq!(config.monitor_index, 1);
        assert_eq!(config.region.width, 1280);
        assert_eq!(config.fps, 30);
        assert_eq!(config.quality, 80);
    }

    #[test]
    fn test_unknown_mode_deserializes_to_region() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{"mode": "fullscreen", "fps": 10}"#).unwrap();

        assert_eq!(config.mode, CaptureMode::Region);
        assert_eq!(config.fps, 10);
        assert_eq!(config.quality, 80);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        let mut config = CaptureConfig::default();
        config.mode = CaptureMode::Monitor;

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["mode"], "monitor");
        assert_eq!(json["region"]["height"], 720);
    }

    #[test]
    fn test_normalized_clamps() {
        let mut config = CaptureConfig::default();
        config.fps = 500;
        config.quality = 3;
        config.region.width = -4;
        config.region.top = -10;

        let config = config.normalized();
        assert_eq!(config.fps, MAX_FPS);
        assert_eq!(config.quality, MIN_QUALITY);
        assert_eq!(config.region.width, 1);
        assert_eq!(config.region.top, 0);
    }
}
