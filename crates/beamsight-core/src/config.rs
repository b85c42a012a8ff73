//! Viewer configuration loading

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::signal::DetectionMode;

/// Default configuration file looked up by the native build
pub const DEFAULT_CONFIG_FILE: &str = "beamsight.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Upper bound on retained RSSI samples
pub const MAX_HISTORY_LEN: usize = 100_000;
/// Upper bound on grid lines per axis
const MAX_GRID_LINES: f32 = 1000.0;
/// Plausible RSSI range for the simulated baseline (dBm)
const BASELINE_RANGE: std::ops::RangeInclusive<i32> = -150..=0;

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a positive number, got {}", value)))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Largest dimension of a normalised room scan (meters)
    #[serde(default = "default_room_target_size")]
    pub room_target_size: f32,
    /// Side length of the invisible click plane
    #[serde(default = "default_floor_size")]
    pub floor_size: f32,
    /// Side length of the visible grid
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    #[serde(default = "default_grid_cell")]
    pub grid_cell: f32,
    #[serde(default = "default_grid_section")]
    pub grid_section: f32,
    #[serde(default = "default_camera_position")]
    pub camera_position: [f32; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    /// Room scan to load at startup (path or URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            room_target_size: default_room_target_size(),
            floor_size: default_floor_size(),
            grid_size: default_grid_size(),
            grid_cell: default_grid_cell(),
            grid_section: default_grid_section(),
            camera_position: default_camera_position(),
            fov_degrees: default_fov(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            room: None,
        }
    }
}

fn default_room_target_size() -> f32 {
    3.0
}

fn default_floor_size() -> f32 {
    20.0
}

fn default_grid_size() -> f32 {
    10.0
}

fn default_grid_cell() -> f32 {
    0.5
}

fn default_grid_section() -> f32 {
    2.0
}

fn default_camera_position() -> [f32; 3] {
    [3.0, 3.0, 3.0]
}

fn default_fov() -> f32 {
    50.0
}

fn default_min_distance() -> f32 {
    1.0
}

fn default_max_distance() -> f32 {
    20.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Initial baseline before any calibration (dBm)
    #[serde(default = "default_baseline")]
    pub baseline: i32,
    #[serde(default)]
    pub mode: DetectionMode,
    /// Drop threshold in open air (dB)
    #[serde(default = "default_air_threshold")]
    pub air_threshold: i32,
    /// Drop threshold through a wall (dB)
    #[serde(default = "default_wall_threshold")]
    pub wall_threshold: i32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Samples kept for the history chart
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            mode: DetectionMode::default(),
            air_threshold: default_air_threshold(),
            wall_threshold: default_wall_threshold(),
            poll_interval_ms: default_poll_interval(),
            history_len: default_history_len(),
        }
    }
}

fn default_baseline() -> i32 {
    -45
}

fn default_air_threshold() -> i32 {
    6
}

fn default_wall_threshold() -> i32 {
    10
}

fn default_poll_interval() -> u64 {
    300
}

fn default_history_len() -> usize {
    600 // ~3 minutes at the default poll rate
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Max level for the browser console logger
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Filter directive for the native subscriber (overridden by RUST_LOG)
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_filter() -> String {
    "info,wgpu=warn,naga=warn".to_string()
}

impl ViewerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewer cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scene = &self.scene;
        require_positive("scene.room_target_size", scene.room_target_size)?;
        require_positive("scene.floor_size", scene.floor_size)?;
        require_positive("scene.grid_size", scene.grid_size)?;
        require_positive("scene.grid_cell", scene.grid_cell)?;
        require_positive("scene.grid_section", scene.grid_section)?;
        if scene.grid_size / scene.grid_cell > MAX_GRID_LINES {
            return Err(invalid(
                "scene.grid_cell",
                format!("more than {} grid lines", MAX_GRID_LINES),
            ));
        }
        if scene.camera_position.iter().any(|c| !c.is_finite()) {
            return Err(invalid("scene.camera_position", "must be finite"));
        }
        if !(scene.fov_degrees > 0.0 && scene.fov_degrees < 180.0) {
            return Err(invalid(
                "scene.fov_degrees",
                format!("must be between 0 and 180, got {}", scene.fov_degrees),
            ));
        }
        require_positive("scene.min_distance", scene.min_distance)?;
        require_positive("scene.max_distance", scene.max_distance)?;
        if scene.min_distance > scene.max_distance {
            return Err(invalid(
                "scene.min_distance",
                format!(
                    "{} is greater than max_distance {}",
                    scene.min_distance, scene.max_distance
                ),
            ));
        }

        let signal = &self.signal;
        if !BASELINE_RANGE.contains(&signal.baseline) {
            return Err(invalid(
                "signal.baseline",
                format!("must be within -150..=0 dBm, got {}", signal.baseline),
            ));
        }
        if signal.poll_interval_ms == 0 {
            return Err(invalid("signal.poll_interval_ms", "must be at least 1"));
        }
        if signal.history_len == 0 || signal.history_len > MAX_HISTORY_LEN {
            return Err(invalid(
                "signal.history_len",
                format!("must be within 1..={}, got {}", MAX_HISTORY_LEN, signal.history_len),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = ViewerConfig::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ViewerConfig::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = ViewerConfig::default().to_toml()?;
    std::fs::write(path, content)?;
    Ok(())
}
