use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("alert threshold must be at least 1")]
    ZeroThreshold,
    #[error("alert threshold {threshold} exceeds history window {window}")]
    ThresholdExceedsWindow { threshold: usize, window: usize },
    #[error("watched class must not be empty")]
    EmptyWatchedClass,
    #[error("camera fps must be non-zero")]
    ZeroFps,
}

fn default_camera_width() -> u32 {
    640
}

fn default_camera_height() -> u32 {
    480
}

fn default_camera_fps() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
        }
    }
}

fn default_model() -> String {
    "yolov8n.onnx".to_string()
}

fn default_confidence() -> f32 {
    0.5
}

fn default_watched_class() -> String {
    "person".to_string()
}

fn default_history_window() -> usize {
    10
}

fn default_alert_threshold() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default = "default_watched_class")]
    pub watched_class: String,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            confidence: default_confidence(),
            watched_class: default_watched_class(),
            history_window: default_history_window(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

fn default_alert_message() -> String {
    "Sustained {class} activity detected on the watched camera".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub webhook: Option<String>,
    #[serde(default = "default_alert_message")]
    pub message: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            message: default_alert_message(),
        }
    }
}

fn default_http_bind() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_http_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.alert_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.detection.alert_threshold > self.detection.history_window {
            return Err(ConfigError::ThresholdExceedsWindow {
                threshold: self.detection.alert_threshold,
                window: self.detection.history_window,
            });
        }
        if self.detection.watched_class.trim().is_empty() {
            return Err(ConfigError::EmptyWatchedClass);
        }
        if self.camera.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();

        assert_eq!(config.camera.device, 0);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.camera.height, 480);
        assert_eq!(config.camera.fps, 30);
        assert_eq!(config.detection.watched_class, "person");
        assert_eq!(config.detection.history_window, 10);
        assert_eq!(config.detection.alert_threshold, 10);
        assert_eq!(config.http.bind, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(config.http.port, 8000);
        assert!(config.alert.webhook.is_none());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [detection]
            watched_class = "car"
            history_window = 5
            alert_threshold = 3

            [http]
            bind = "127.0.0.1"
            port = 9090
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.detection.watched_class, "car");
        assert_eq!(config.detection.history_window, 5);
        assert_eq!(config.detection.alert_threshold, 3);
        assert_eq!(config.http.bind, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.camera.fps, 30);
    }

    #[test]
    fn test_threshold_must_fit_window() {
        let config: Config = toml::from_str(
            r#"
            [detection]
            history_window = 5
            alert_threshold = 6
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdExceedsWindow {
                threshold: 6,
                window: 5
            })
        ));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config: Config = toml::from_str("[detection]\nalert_threshold = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreshold)));
    }

    #[test]
    fn test_empty_watched_class_rejected() {
        let config: Config = toml::from_str("[detection]\nwatched_class = \"  \"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyWatchedClass)
        ));
    }
}
