//! Line driver implementations.
//!
//! - [`simulation`] - In-memory lines for development and testing
//! - [`sysfs`] - Linux `/sys/class/gpio` userspace interface
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `LineDriver` trait from `softpwm_common::line`
//! 3. Add a `create_driver(&DriverConfig)` factory
//! 4. Register it in [`register_builtin_drivers`]

pub mod simulation;
pub mod sysfs;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver.
pub fn register_builtin_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
    registry.register("sysfs", sysfs::create_driver);
}
