//! Simulation driver module.
//!
//! This module provides an in-memory line driver for development and
//! testing without physical hardware.

mod driver;
mod io;

pub use driver::SimulationDriver;
pub use io::{LineEvent, EVENT_LOG_CAPACITY};

use softpwm_common::config::DriverConfig;
use softpwm_common::line::LineDriver;
use std::sync::Arc;

/// Factory function to create a simulation driver instance.
pub fn create_driver(_config: &DriverConfig) -> Arc<dyn LineDriver> {
    Arc::new(SimulationDriver::new())
}
