use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub video: VideoConfig,
    pub layout: LayoutConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    pub zones: ZoneConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub seed_demo_bookings: bool,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoSourceKind {
    Ffmpeg,
    Images,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    pub source: VideoSourceKind,
    pub path: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    pub path: String,
    #[serde(default = "default_slot_width")]
    pub slot_width: u32,
    #[serde(default = "default_slot_height")]
    pub slot_height: u32,
}

fn default_slot_width() -> u32 { 107 }
fn default_slot_height() -> u32 { 48 }

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: u32,
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            pixel_threshold: default_pixel_threshold(),
            frame_interval_ms: default_frame_interval(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_enabled() -> bool { true }
fn default_pixel_threshold() -> u32 { 900 }
fn default_frame_interval() -> u64 { 40 }
fn default_jpeg_quality() -> u8 { 80 }

#[derive(Debug, Deserialize, Clone)]
pub struct ZoneConfig {
    pub letters: Vec<char>,
    pub slots_per_zone: u32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `PARKWATCH_SERVER__PORT=9000` would set `server.port`
            .add_source(config::Environment::with_prefix("PARKWATCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_keys() {
        let toml = r#"
            [server]
            port = 8800

            [database]
            url = "sqlite::memory:"

            [video]
            source = "ffmpeg"
            path = "carPark.mp4"
            width = 1100
            height = 720

            [layout]
            path = "CarParkPos.json"

            [zones]
            letters = ["A", "B", "C"]
            slots_per_zone = 10
        "#;

        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 8800);
        assert_eq!(cfg.database.max_connections, 5);
        assert!(!cfg.database.seed_demo_bookings);
        assert_eq!(cfg.video.source, VideoSourceKind::Ffmpeg);
        assert_eq!(cfg.layout.slot_width, 107);
        assert_eq!(cfg.layout.slot_height, 48);
        assert!(cfg.detection.enabled);
        assert_eq!(cfg.detection.pixel_threshold, 900);
        assert_eq!(cfg.zones.letters, vec!['A', 'B', 'C']);
    }
}
