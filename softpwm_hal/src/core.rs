//! HAL Core struct and control loop management.
//!
//! The `HalCore` struct is the single top-level owner of the channel
//! registry and the sensor bank. It creates the line driver, stands both
//! tables up all-or-nothing, feeds control commands to them until shutdown
//! is requested, and tears everything down again.

use crate::control::ControlInterface;
use crate::driver_registry::DriverRegistry;
use crate::registry::ChannelRegistry;
use crate::sensor::SensorBank;
use crate::servo::ServoControl;
use crate::waveform::WaveformOptions;
use softpwm_common::config::{ConfigLoader, SystemConfig};
use softpwm_common::error::HalError;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the control loop re-checks the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// HAL Core owns the PWM channels and sensors for the process lifetime.
pub struct HalCore {
    /// Validated configuration
    config: SystemConfig,
    /// PWM channels (after init)
    registry: Option<ChannelRegistry>,
    /// Sensor lines (after init)
    sensors: Option<SensorBank>,
    /// Cleared by the shutdown signal
    running: Arc<AtomicBool>,
}

impl HalCore {
    /// Create a new HalCore instance with the given configuration.
    ///
    /// # Errors
    /// Returns `HalError::Configuration` if configuration validation fails.
    pub fn new(config: SystemConfig) -> Result<Self, HalError> {
        config.validate()?;

        info!(
            "HalCore created: {} PWM lines, {} sensor lines, driver '{}'",
            config.pwm.lines.len(),
            config.sensors.lines.len(),
            config.driver.name
        );

        Ok(Self {
            config,
            registry: None,
            sensors: None,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Load configuration from a TOML file.
    pub fn load_config(config_path: &Path) -> Result<SystemConfig, HalError> {
        info!("Loading configuration from {:?}", config_path);
        SystemConfig::load(config_path).map_err(|e| {
            HalError::Configuration(format!("{}: {}", config_path.display(), e))
        })
    }

    /// Create the line driver and claim every configured line.
    ///
    /// Either both the channel registry and the sensor bank come up, or
    /// neither does and no line stays claimed.
    ///
    /// # Errors
    /// `HalError::DriverNotFound`, `HalError::Configuration` or
    /// `HalError::Resource` from driver creation and line claims.
    pub fn init(&mut self, drivers: &DriverRegistry) -> Result<(), HalError> {
        info!("Initializing HalCore with driver '{}'...", self.config.driver.name);

        let driver = drivers.create_driver(&self.config.driver)?;

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let options = WaveformOptions {
            realtime_priority: self.config.pwm.realtime_priority,
            ..WaveformOptions::default()
        };
        let registry = ChannelRegistry::initialize(Arc::clone(&driver), &self.config.pwm.lines, options)?;
        // On failure `registry` is dropped here, releasing its lines.
        let sensors = SensorBank::initialize(driver, &self.config.sensors.lines)?;

        self.registry = Some(registry);
        self.sensors = Some(sensors);
        info!("HalCore initialized successfully");
        Ok(())
    }

    /// Control interface over the initialized tables.
    ///
    /// # Errors
    /// Returns `HalError::Configuration` before `init()` or after `shutdown()`.
    pub fn control(&self) -> Result<ControlInterface<'_>, HalError> {
        let registry = self
            .registry
            .as_ref()
            .ok_or_else(|| HalError::Configuration("HalCore not initialized".to_string()))?;

        let mut control = ControlInterface::new(registry).with_service_name(&self.config.shared.service_name);
        if let Some(sensors) = self.sensors.as_ref() {
            control = control.with_sensors(sensors);
        }
        if let Some(servo) = self.config.servo {
            control = control.with_servo(ServoControl::new(servo.channel));
        }
        Ok(control)
    }

    /// Answer control commands from `input` until shutdown is requested.
    ///
    /// `input` is read on a separate thread so the running flag is honoured
    /// while no command arrives. End of input only stops command intake;
    /// running waveforms continue until the shutdown signal.
    pub fn run<R, W>(&self, input: R, out: &mut W) -> Result<(), HalError>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        let control = self.control()?;
        let (tx, rx) = mpsc::channel::<String>();

        // Blocks in read(); left to die with the process.
        thread::Builder::new()
            .name("control_reader".to_string())
            .spawn(move || {
                for line in input.lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Control input read failed: {}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(|e| HalError::Resource(format!("cannot spawn control reader: {e}")))?;

        info!("Control loop started");
        let mut input_open = true;
        while self.running.load(Ordering::SeqCst) {
            if !input_open {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if let Err(e) = control.respond(&line, out) {
                        warn!("Failed to write control reply: {}", e);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Control input closed; waveforms keep running until shutdown");
                    input_open = false;
                }
            }
        }

        debug!("Control loop stopped");
        Ok(())
    }

    /// Stop every waveform and release every line. Idempotent.
    pub fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        if let Some(mut registry) = self.registry.take() {
            registry.shutdown();
        }
        if let Some(mut sensors) = self.sensors.take() {
            sensors.shutdown();
        }
        Ok(())
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Channel registry, once initialized.
    pub fn registry(&self) -> Option<&ChannelRegistry> {
        self.registry.as_ref()
    }

    /// Sensor bank, once initialized.
    pub fn sensors(&self) -> Option<&SensorBank> {
        self.sensors.as_ref()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: queries the calling process's policy; no pointers involved.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softpwm_common::config::ServoConfig;

    fn sim_config(lines: Vec<u32>) -> SystemConfig {
        let mut config = SystemConfig::with_pwm_lines(lines);
        config.driver.name = "simulation".to_string();
        config
    }

    #[test]
    fn invalid_config_rejected() {
        let result = HalCore::new(sim_config(vec![]));
        assert!(matches!(result, Err(HalError::Configuration(_))));
    }

    #[test]
    fn load_config_wraps_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        match HalCore::load_config(&missing) {
            Err(HalError::Configuration(msg)) => assert!(msg.contains("absent.toml"), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }

        let path = dir.path().join("softpwm.toml");
        std::fs::write(&path, "[pwm]\nlines = [3, 4]\n").unwrap();
        assert_eq!(HalCore::load_config(&path).unwrap().pwm.lines, vec![3, 4]);
    }

    #[test]
    fn control_requires_init() {
        let core = HalCore::new(sim_config(vec![1])).unwrap();
        assert!(core.control().is_err());
    }

    #[test]
    fn unknown_driver_rejected() {
        let mut config = sim_config(vec![1]);
        config.driver.name = "ethercat".to_string();
        let mut core = HalCore::new(config).unwrap();
        assert!(matches!(
            core.init(&DriverRegistry::with_builtin()),
            Err(HalError::DriverNotFound(_))
        ));
    }

    #[test]
    fn sensor_failure_releases_pwm_lines() {
        let mut config = sim_config(vec![1, 2]);
        // 5000 is outside the simulated board.
        config.sensors.lines = vec![3, 5000];
        let mut core = HalCore::new(config).unwrap();

        assert!(matches!(
            core.init(&DriverRegistry::with_builtin()),
            Err(HalError::Resource(_))
        ));
        assert!(core.registry().is_none());
        assert!(core.sensors().is_none());
    }

    #[test]
    fn run_serves_until_flag_cleared() {
        let mut config = sim_config(vec![1, 2]);
        config.servo = Some(ServoConfig { channel: 1 });
        let mut core = HalCore::new(config).unwrap();
        core.init(&DriverRegistry::with_builtin()).unwrap();

        let running = core.running_flag();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(400));
            running.store(false, Ordering::SeqCst);
        });

        let mut out = Vec::new();
        core.run(&b"0 1000000 250000 1\nservo 90\n"[..], &mut out).unwrap();
        stopper.join().unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "ok\nok\n");
        let registry = core.registry().unwrap();
        assert!(registry.lookup(0).unwrap().is_active());
        assert_eq!(registry.lookup(1).unwrap().duty_ns(), 1_500_000);

        core.shutdown().unwrap();
        assert!(core.registry().is_none());
        core.shutdown().unwrap();
    }
}
