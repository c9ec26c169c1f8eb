//! Configuration file support for the viewer.
//!
//! Settings are stored as versioned JSON. Every section has defaults so a
//! partial file (or an older one) still loads.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_HISTORY, MAX_SCALE, MIN_SCALE, WHEEL_DIVISOR};
use crate::history::HistoryConfig;
use crate::overlay::OverlayStyle;
use crate::surface::{Color, Stroke};
use crate::tool::ToolKind;
use crate::viewport::ZoomLimits;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Viewer configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Zoom behaviour
    #[serde(default)]
    pub zoom: ZoomConfig,

    /// History behaviour
    #[serde(default)]
    pub history: HistoryPreferences,

    /// Colors and stroke widths
    #[serde(default)]
    pub style: StyleConfig,

    /// Tool selected at startup
    #[serde(default)]
    pub default_tool: ToolKind,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Zoom section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Smallest scale
    pub min_scale: f64,
    /// Largest scale
    pub max_scale: f64,
    /// Wheel angle units per unit of zoom factor
    pub wheel_divisor: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_divisor: WHEEL_DIVISOR,
        }
    }
}

/// History section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryPreferences {
    /// Number of entries kept before the oldest is dropped
    pub max_entries: usize,
}

impl Default for HistoryPreferences {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Style section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Viewport background
    pub background: Color,
    /// Outline of the shape being dragged
    pub preview: Stroke,
    /// Computed overlay styling
    pub overlay: OverlayStyle,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: Color::LIGHT_GRAY,
            preview: Stroke::new(Color::RED, 3.0),
            overlay: OverlayStyle::default(),
        }
    }
}

impl ViewerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            zoom: ZoomConfig::default(),
            history: HistoryPreferences::default(),
            style: StyleConfig::default(),
            default_tool: ToolKind::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Zoom limits for the viewport transform.
    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min: self.zoom.min_scale,
            max: self.zoom.max_scale,
        }
    }

    /// Settings for the history stack.
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            max_entries: self.history.max_entries,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        if zoom.min_scale <= 0.0 || zoom.min_scale > zoom.max_scale || zoom.max_scale.is_nan() {
            return Err(ConfigError::Invalid(format!(
                "zoom range [{}, {}] must be positive and ordered",
                zoom.min_scale, zoom.max_scale
            )));
        }
        if zoom.wheel_divisor.is_nan() || zoom.wheel_divisor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "wheel divisor {} must be positive",
                zoom.wheel_divisor
            )));
        }
        if self.history.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "history must keep at least one entry".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "pogotrack-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("pogotrack").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("pogotrack")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zoom_limits(), ZoomLimits::default());
        assert_eq!(config.history_config().max_entries, DEFAULT_MAX_HISTORY);
        assert_eq!(config.style.background, Color::rgb(200, 200, 200));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = ViewerConfig::new();
        config.default_tool = ToolKind::Circle;
        config.log_level = LogLevel::Debug;
        config.zoom.max_scale = 4.0;

        let json = config.to_json().expect("serialize");
        assert!(json.contains("\"circle\""));
        assert!(json.contains("\"debug\""));

        let loaded = ViewerConfig::from_json(&json).expect("parse");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ViewerConfig::from_json(r#"{ "version": 1, "zoom": { "max_scale": 3.0 } }"#)
            .expect("parse");
        assert_eq!(config.zoom.max_scale, 3.0);
        assert_eq!(config.zoom.min_scale, MIN_SCALE);
        assert_eq!(config.history.max_entries, DEFAULT_MAX_HISTORY);
        assert_eq!(config.default_tool, ToolKind::Line);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{ "version": {} }}"#, CONFIG_VERSION + 1);
        assert!(matches!(
            ViewerConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for json in [
            r#"{ "version": 1, "zoom": { "min_scale": 0.0 } }"#,
            r#"{ "version": 1, "zoom": { "min_scale": 5.0, "max_scale": 2.0 } }"#,
            r#"{ "version": 1, "zoom": { "wheel_divisor": -1.0 } }"#,
            r#"{ "version": 1, "history": { "max_entries": 0 } }"#,
        ] {
            assert!(
                matches!(ViewerConfig::from_json(json), Err(ConfigError::Invalid(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(ViewerConfig::default_filename());

        let mut config = ViewerConfig::new();
        config.history.max_entries = 7;
        config.save(&path).expect("save");

        let loaded = ViewerConfig::load(&path).expect("load");
        assert_eq!(loaded.history.max_entries, 7);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    }
}
