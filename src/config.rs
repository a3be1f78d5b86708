//! Configuration file support for runview.
//!
//! Settings live in a versioned JSON file under the user's config directory:
//! where the photos are, detection thresholds, cache sizes, brand shortcut
//! keys and the log level.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BIB_THRESHOLD, DEFAULT_COMPONENT_CACHE_CAPACITY, DEFAULT_IMAGE_CACHE_CAPACITY,
    DEFAULT_PRELOAD_RADIUS, DEFAULT_SHOE_THRESHOLD,
};
use crate::model::ConfidenceThresholds;

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
    /// Get all log levels in order from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

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

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,

    /// Detection confidence thresholds applied on import
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Brand labels and their shortcut keys, in display order
    #[serde(default = "default_brands")]
    pub brands: Vec<BrandShortcut>,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Folder the records' image paths are relative to
    #[serde(default)]
    pub base_path: PathBuf,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Decoded images kept in memory
    #[serde(default = "default_image_cache_capacity")]
    pub image_cache_capacity: usize,

    /// Records before/after the selection whose images are read ahead
    #[serde(default = "default_preload_radius")]
    pub preload_radius: usize,

    /// Rendered component sets kept by the display
    #[serde(default = "default_component_cache_capacity")]
    pub component_cache_capacity: usize,
}

fn default_image_cache_capacity() -> usize {
    DEFAULT_IMAGE_CACHE_CAPACITY
}

fn default_preload_radius() -> usize {
    DEFAULT_PRELOAD_RADIUS
}

fn default_component_cache_capacity() -> usize {
    DEFAULT_COMPONENT_CACHE_CAPACITY
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            base_path: PathBuf::new(),
            log_level: LogLevel::default(),
            image_cache_capacity: default_image_cache_capacity(),
            preload_radius: default_preload_radius(),
            component_cache_capacity: default_component_cache_capacity(),
        }
    }
}

/// Threshold section of the config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_bib_threshold")]
    pub bib: f64,
    #[serde(default = "default_shoe_threshold")]
    pub shoes: f64,
}

fn default_bib_threshold() -> f64 {
    DEFAULT_BIB_THRESHOLD
}

fn default_shoe_threshold() -> f64 {
    DEFAULT_SHOE_THRESHOLD
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            bib: default_bib_threshold(),
            shoes: default_shoe_threshold(),
        }
    }
}

impl From<ThresholdConfig> for ConfidenceThresholds {
    fn from(config: ThresholdConfig) -> Self {
        ConfidenceThresholds::new(config.bib, config.shoes)
    }
}

/// A brand label and the key that assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandShortcut {
    pub key: char,
    pub label: String,
}

impl BrandShortcut {
    pub fn new(key: char, label: &str) -> Self {
        Self {
            key,
            label: label.to_string(),
        }
    }
}

/// Default brand list, one shortcut per key on the top letter row.
pub fn default_brands() -> Vec<BrandShortcut> {
    [
        ('q', "Olympikus"),
        ('w', "Nike"),
        ('e', "Adidas"),
        ('r', "Asics"),
        ('t', "Fila"),
        ('y', "Hoka"),
        ('u', "Mizuno"),
        ('i', "New Balance"),
        ('o', "On Running"),
        ('p', "Under Armour"),
        ('z', "Outros"),
    ]
    .into_iter()
    .map(|(key, label)| BrandShortcut::new(key, label))
    .collect()
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            thresholds: ThresholdConfig::default(),
            brands: default_brands(),
        }
    }

    /// Thresholds in the form the record store takes.
    pub fn confidence_thresholds(&self) -> ConfidenceThresholds {
        self.thresholds.into()
    }

    /// Brand labels in display order.
    pub fn brand_labels(&self) -> Vec<&str> {
        self.brands.iter().map(|b| b.label.as_str()).collect()
    }

    /// Brand assigned to a shortcut key (case-insensitive).
    pub fn brand_for_key(&self, key: char) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.brands
            .iter()
            .find(|b| b.key.to_ascii_lowercase() == key)
            .map(|b| b.label.as_str())
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

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "runview-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("runview").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("runview")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from a file.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from(path: &std::path::Path) -> Option<Self> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Try to load configuration from the default path.
    pub fn load_from_default_path() -> Option<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to(&path)
    }
}

impl Default for AppConfig {
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

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
