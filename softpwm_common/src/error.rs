//! HAL error type.
//!
//! Every fallible operation of the PWM engine, the sensor bank and the line
//! drivers returns [`HalError`]. Errors are always handed back to the
//! immediate caller; nothing in the engine retries or swallows them.

use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Invalid channel count or line assignment at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A line could not be claimed or a waveform thread could not be spawned.
    #[error("Resource error: {0}")]
    Resource(String),

    /// Channel (or sensor) id outside the configured table.
    #[error("Channel {id} out of range (count {count})")]
    Range {
        /// Requested id
        id: usize,
        /// Number of configured entries
        count: usize,
    },

    /// Malformed control command.
    #[error("Invalid command: {0}")]
    Validation(String),

    /// Line driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

impl HalError {
    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Resource(_) => "resource",
            Self::Range { .. } => "range",
            Self::Validation(_) => "validation",
            Self::DriverNotFound(_) => "driver_not_found",
        }
    }
}

impl From<crate::config::ConfigError> for HalError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_hal_error_display() {
        let err = HalError::Range { id: 9, count: 4 };
        assert_eq!(err.to_string(), "Channel 9 out of range (count 4)");

        let err = HalError::Resource("line 17 busy".to_string());
        assert!(err.to_string().contains("line 17 busy"));
    }

    #[test]
    fn config_error_becomes_configuration() {
        let err: HalError = ConfigError::FileNotFound.into();
        assert_eq!(err.kind(), "configuration");
    }
}
