//! Driver registry for line drivers.
//!
//! Provides a `DriverRegistry` struct for registering line driver factories
//! and instantiating the one named in the configuration. This uses
//! constructor-injection rather than global state.

use crate::drivers::register_builtin_drivers;
use softpwm_common::config::DriverConfig;
use softpwm_common::error::HalError;
use softpwm_common::line::LineDriver;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function type for creating driver instances.
pub type DriverFactory = fn(&DriverConfig) -> Arc<dyn LineDriver>;

/// Registry of available line drivers.
///
/// Constructed at startup, populated via `register()`, and handed to
/// `HalCore::init`. No global state, testable in isolation.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_builtin_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Create the driver named in `config`.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no driver with that name is registered.
    pub fn create_driver(&self, config: &DriverConfig) -> Result<Arc<dyn LineDriver>, HalError> {
        let factory = self
            .factories
            .get(config.name.as_str())
            .ok_or_else(|| HalError::DriverNotFound(config.name.clone()))?;
        Ok(factory(config))
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;

    fn create_test_driver(_config: &DriverConfig) -> Arc<dyn LineDriver> {
        Arc::new(SimulationDriver::with_valid_lines(0..=1))
    }

    fn config_named(name: &str) -> DriverConfig {
        DriverConfig {
            name: name.to_string(),
            ..DriverConfig::default()
        }
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register("test_driver", create_test_driver);

        let driver = reg.create_driver(&config_named("test_driver")).expect("should create");
        assert_eq!(driver.name(), "simulation");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_driver(&config_named("nonexistent"));
        assert!(matches!(result, Err(HalError::DriverNotFound(_))));
    }

    #[test]
    fn registry_builtin_drivers() {
        let reg = DriverRegistry::with_builtin();
        assert_eq!(reg.list_drivers(), vec!["simulation", "sysfs"]);
        assert_eq!(reg.create_driver(&config_named("sysfs")).unwrap().name(), "sysfs");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", create_test_driver);
        reg.register("dup", create_test_driver);
    }
}
