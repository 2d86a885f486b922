//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the softpwm TOML
//! configuration file and validate it before any line is touched.
//!
//! # Usage
//!
//! ```rust,no_run
//! use softpwm_common::config::{ConfigLoader, SystemConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SystemConfig::load(Path::new("softpwm.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{DEFAULT_SYSFS_ROOT, MAX_CHANNELS, SERVICE_NAME};
use crate::line::LineId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "softpwm-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_service_name() -> String {
    SERVICE_NAME.to_string()
}

/// Line driver selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Registered driver name (`sysfs` or `simulation`).
    #[serde(default = "default_driver_name")]
    pub name: String,

    /// Root of the sysfs GPIO tree.
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Accept sysfs lines that are already exported (e.g. by a boot
    /// script). Off by default: an existing export means another owner.
    #[serde(default)]
    pub adopt_exported: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: default_driver_name(),
            sysfs_root: default_sysfs_root(),
            adopt_exported: false,
        }
    }
}

fn default_driver_name() -> String {
    "sysfs".to_string()
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

/// PWM line assignment. Channel `i` drives `lines[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PwmConfig {
    /// Ordered line ids, one per channel.
    pub lines: Vec<LineId>,

    /// SCHED_FIFO priority requested by each waveform thread.
    #[serde(default)]
    pub realtime_priority: Option<u8>,
}

/// Binary sensor line assignment. Sensor `i` reads `lines[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    /// Ordered line ids, one per sensor.
    #[serde(default)]
    pub lines: Vec<LineId>,
}

/// Servo binding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServoConfig {
    /// PWM channel the servo signal is generated on.
    pub channel: usize,
}

/// Complete softpwm configuration (`softpwm.toml`).
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "softpwm"
///
/// [driver]
/// name = "sysfs"
///
/// [pwm]
/// lines = [529, 530, 531]
///
/// [sensors]
/// lines = [532]
///
/// [servo]
/// channel = 0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// Shared application settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Line driver selection.
    #[serde(default)]
    pub driver: DriverConfig,

    /// PWM channel lines.
    pub pwm: PwmConfig,

    /// Sensor lines.
    #[serde(default)]
    pub sensors: SensorConfig,

    /// Optional servo on one PWM channel.
    #[serde(default)]
    pub servo: Option<ServoConfig>,
}

impl SystemConfig {
    /// Build a configuration for the given PWM lines with every other
    /// section at its default.
    pub fn with_pwm_lines(lines: Vec<LineId>) -> Self {
        Self {
            shared: SharedConfig::default(),
            driver: DriverConfig::default(),
            pwm: PwmConfig {
                lines,
                realtime_priority: None,
            },
            sensors: SensorConfig::default(),
            servo: None,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - the PWM line list is empty or longer than `MAX_CHANNELS`
    /// - the sensor line list is longer than `MAX_CHANNELS`
    /// - a line id appears twice across both lists
    /// - the servo channel is not a configured PWM channel
    /// - the real-time priority is outside `1..=99`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let count = self.pwm.lines.len();
        if count == 0 || count > MAX_CHANNELS {
            return Err(ConfigError::ValidationError(format!(
                "pwm.lines must hold 1..={MAX_CHANNELS} lines, got {count}"
            )));
        }

        if self.sensors.lines.len() > MAX_CHANNELS {
            return Err(ConfigError::ValidationError(format!(
                "sensors.lines must hold at most {MAX_CHANNELS} lines, got {}",
                self.sensors.lines.len()
            )));
        }

        let mut seen = HashSet::new();
        for line in self.pwm.lines.iter().chain(self.sensors.lines.iter()) {
            if !seen.insert(*line) {
                return Err(ConfigError::ValidationError(format!(
                    "line {line} is assigned more than once"
                )));
            }
        }

        if let Some(servo) = self.servo {
            if servo.channel >= count {
                return Err(ConfigError::ValidationError(format!(
                    "servo.channel {} is not one of the {count} PWM channels",
                    servo.channel
                )));
            }
        }

        if let Some(priority) = self.pwm.realtime_priority {
            if !(1..=99).contains(&priority) {
                return Err(ConfigError::ValidationError(format!(
                    "pwm.realtime_priority must be in 1..=99, got {priority}"
                )));
            }
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        let config = toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!("Parsed configuration from {}", path.display());
        Ok(config)
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
