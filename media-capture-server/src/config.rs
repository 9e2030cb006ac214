use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use media_capture_core::CaptureConfiguration;

use crate::error::ServerError;

/// Server settings, read from an optional TOML file.
///
/// ```toml
/// address = "127.0.0.1"
/// port = 12345
/// usb_ids_path = "usb.ids"
/// default_output_dir = "captures"
///
/// [capture]
/// duration_secs = 5
/// fps = 30
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub usb_ids_path: Option<PathBuf>,
    /// Base directory for video commands sent without a path.
    pub default_output_dir: Option<PathBuf>,
    pub capture: CaptureConfiguration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 12345,
            usb_ids_path: None,
            default_output_dir: None,
            capture: CaptureConfiguration::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ServerError> {
        toml::from_str(content).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Command-line values win over the file.
    pub fn with_overrides(mut self, address: Option<String>, port: Option<u16>, usb_ids_path: Option<PathBuf>) -> Self {
        if let Some(address) = address {
            self.address = address;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if usb_ids_path.is_some() {
            self.usb_ids_path = usb_ids_path;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.address.trim().is_empty() {
            return Err(ServerError::Config("address must not be empty".into()));
        }
        self.capture.validate().map_err(ServerError::Config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// `default_output_dir`, or the current directory.
    pub fn output_dir(&self) -> PathBuf {
        self.default_output_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_capture_core::Pacing;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:12345");
        assert_eq!(config.capture.duration_secs, 5);
        assert_eq!(config.capture.fps, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ServerConfig::from_toml_str(
            r#"
            port = 4000
            default_output_dir = "captures"

            [capture]
            fps = 15
            pacing = "per_frame"
            "#,
        )
        .unwrap();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 4000);
        assert_eq!(config.output_dir(), PathBuf::from("captures"));
        assert_eq!(config.capture.fps, 15);
        assert_eq!(config.capture.duration_secs, 5);
        assert_eq!(config.capture.pacing, Pacing::PerFrame);
    }

    #[test]
    fn malformed_file_rejected() {
        assert!(matches!(
            ServerConfig::from_toml_str("port = \"many\""),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn overrides_win() {
        let config = ServerConfig::default().with_overrides(Some("0.0.0.0".into()), None, Some("usb.ids".into()));
        assert_eq!(config.bind_address(), "0.0.0.0:12345");
        assert_eq!(config.usb_ids_path, Some(PathBuf::from("usb.ids")));
    }

    #[test]
    fn invalid_capture_settings_rejected() {
        let mut config = ServerConfig::default();
        config.capture.fps = 0;
        assert!(config.validate().is_err());
    }
}
