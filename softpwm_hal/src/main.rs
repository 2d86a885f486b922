//! # softpwm HAL Binary
//!
//! Software PWM service: drives up to eight GPIO lines with independent
//! period and duty, samples binary sensor lines, and takes commands as
//! text lines on stdin.
//!
//! # Usage
//!
//! ```bash
//! # Two simulated channels, no config file needed
//! softpwm_hal --simulate --line 18 --line 19
//!
//! # Board lines from the config file via sysfs
//! softpwm_hal --config /etc/softpwm/softpwm.toml
//!
//! # Verbose JSON logs
//! softpwm_hal -s -l 18 -v --json
//! ```
//!
//! Commands, one per line: `<channel> <period_ns> <duty_ns> <enable>`,
//! `servo <angle>`, `sensor <id>`, `status`.

use clap::Parser;
use softpwm_common::config::{LogLevel, SystemConfig};
use softpwm_common::consts::DEFAULT_CONFIG_PATH;
use softpwm_common::error::HalError;
use softpwm_hal::core::HalCore;
use softpwm_hal::driver_registry::DriverRegistry;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// softpwm - multichannel software PWM over GPIO lines
#[derive(Parser, Debug)]
#[command(name = "softpwm_hal")]
#[command(version)]
#[command(about = "Multichannel software PWM engine with a text control stream")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// Line driver to use (overrides the config file)
    #[arg(short, long)]
    driver: Option<String>,

    /// PWM line, once per channel in channel order (overrides the config
    /// file; the file may then be absent)
    #[arg(short, long = "line", action = clap::ArgAction::Append)]
    lines: Vec<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("softpwm startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = resolve_config(&args);
    let log_level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);
    let config = config?;

    info!("softpwm v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut hal_core = HalCore::new(config)?;

    let running = hal_core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    hal_core.init(&DriverRegistry::with_builtin())?;

    if let Err(e) = hal_core.run(BufReader::new(io::stdin()), &mut io::stdout()) {
        error!("Control loop error: {}", e);
    }

    hal_core.shutdown()?;

    info!("softpwm shutdown complete");
    Ok(())
}

/// Load the config file and apply command-line overrides.
fn resolve_config(args: &Args) -> Result<SystemConfig, HalError> {
    // Lines given on the command line make the file optional.
    let mut config = if !args.lines.is_empty() && !args.config.exists() {
        SystemConfig::with_pwm_lines(Vec::new())
    } else {
        HalCore::load_config(&args.config)?
    };

    if !args.lines.is_empty() {
        config.pwm.lines = args.lines.clone();
    }
    if args.simulate {
        config.driver.name = "simulation".to_string();
    } else if let Some(driver) = &args.driver {
        config.driver.name = driver.clone();
    }
    Ok(config)
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match log_level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr; stdout carries command replies.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}
