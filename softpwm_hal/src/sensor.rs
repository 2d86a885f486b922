//! Binary sensor bank.
//!
//! Claims a fixed list of lines as inputs and samples them on request.
//! Sensor `i` reads `lines[i]`. A bank may be empty.

use crate::claims::LineClaims;
use heapless::Vec as FixedVec;
use softpwm_common::consts::MAX_CHANNELS;
use softpwm_common::error::HalError;
use softpwm_common::line::{Direction, Level, LineDriver, LineHandle, LineId};
use std::sync::Arc;
use tracing::info;

/// Input lines sampled on demand.
pub struct SensorBank {
    driver: Arc<dyn LineDriver>,
    sensors: FixedVec<LineHandle, MAX_CHANNELS>,
}

impl SensorBank {
    /// Claim every line in `lines` as an input.
    ///
    /// # Errors
    /// - `HalError::Configuration` if more than `MAX_CHANNELS` lines are given
    /// - `HalError::Resource` if a line cannot be claimed; earlier claims are
    ///   released
    pub fn initialize(driver: Arc<dyn LineDriver>, lines: &[LineId]) -> Result<Self, HalError> {
        if lines.len() > MAX_CHANNELS {
            return Err(HalError::Configuration(format!(
                "sensor count must be at most {MAX_CHANNELS}, got {}",
                lines.len()
            )));
        }

        let handles = LineClaims::acquire(driver.as_ref(), lines, Direction::Input)?;
        let mut sensors = FixedVec::new();
        for handle in handles {
            if sensors.push(handle).is_err() {
                return Err(HalError::Configuration("sensor table full".to_string()));
            }
        }

        if !sensors.is_empty() {
            info!("Sensor bank initialized: {} lines {:?}", sensors.len(), lines);
        }
        Ok(Self { driver, sensors })
    }

    /// Sample sensor `id`.
    ///
    /// # Errors
    /// `HalError::Range` for an unknown id, or the driver's read error.
    pub fn read(&self, id: usize) -> Result<Level, HalError> {
        let handle = self.sensors.get(id).ok_or(HalError::Range {
            id,
            count: self.sensors.len(),
        })?;
        self.driver.get(handle)
    }

    /// Sample sensor `id` as `'1'` or `'0'`.
    pub fn read_char(&self, id: usize) -> Result<char, HalError> {
        self.read(id).map(Level::as_char)
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// True when no sensor is configured (or after shutdown).
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Release every input line. Idempotent.
    pub fn shutdown(&mut self) {
        while let Some(handle) = self.sensors.pop() {
            self.driver.release(handle);
        }
    }
}

impl Drop for SensorBank {
    fn drop(&mut self) {
        self.shutdown();
    }
}
