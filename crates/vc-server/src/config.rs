use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use anyhow::{Context, Result};
use vc_core::CaptureConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    /// Initial capture configuration; the HTTP API changes it at runtime.
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub metrics_interval_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 5000,
            metrics_interval_secs: 10,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context("Failed to read config file")?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(contents)
            .context("Failed to parse config file")?;

        settings.capture = settings.capture.normalized();
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Invalid port");
        }

        if self.server.metrics_interval_secs == 0 {
            anyhow::bail!("Invalid metrics interval (must be at least 1 second)");
        }

        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.bind_address, self.server.port)
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_core::CaptureMode;

    #[test]
    fn test_defaults_bind_all_interfaces() {
        let settings = Settings::default();

        settings.validate().unwrap();
        assert_eq!(settings.bind_addr().unwrap(), "0.0.0.0:5000".parse().unwrap());
        assert_eq!(settings.capture, CaptureConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml(
            r#"
            [server]
            port = 8088

            [capture]
            mode = "Monitor"
            fps = 120

            [capture.region]
            width = 640
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.server.bind_address, "0.0.0.0");
        assert_eq!(settings.capture.mode, CaptureMode::Monitor);
        assert_eq!(settings.capture.fps, 60);
        assert_eq!(settings.capture.region.width, 640);
        assert_eq!(settings.capture.region.height, 720);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.bind_address = "not an address".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        assert!(Settings::from_toml("[server\nport = ").is_err());
    }
}
