//! System-wide constants for the softpwm workspace.
//!
//! Single source of truth for channel limits, default timings and paths.

use static_assertions::const_assert;

/// Canonical service name (used for logging and status reports).
pub const SERVICE_NAME: &str = "softpwm";

/// Maximum number of PWM channels (and of sensor lines).
pub const MAX_CHANNELS: usize = 8;

/// Period assigned to every channel at creation (50 Hz).
pub const DEFAULT_PERIOD_NS: u32 = 20_000_000;

/// High-phase duration assigned to every channel at creation.
pub const DEFAULT_DUTY_NS: u32 = 1_000_000;

/// Longest accepted control command, in bytes.
pub const MAX_COMMAND_LEN: usize = 31;

/// Servo frame period.
pub const SERVO_PERIOD_NS: u32 = 20_000_000;

/// Servo pulse width at 0 degrees.
pub const SERVO_MIN_PULSE_NS: u32 = 1_000_000;

/// Servo pulse width span between 0 and [`SERVO_MAX_ANGLE`].
pub const SERVO_PULSE_SPAN_NS: u32 = 1_000_000;

/// Largest servo angle; larger requests are clamped.
pub const SERVO_MAX_ANGLE: u32 = 180;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/softpwm/softpwm.toml";

/// Default root of the Linux sysfs GPIO interface.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

const_assert!(MAX_CHANNELS > 0);
const_assert!(DEFAULT_DUTY_NS <= DEFAULT_PERIOD_NS);
const_assert!(SERVO_MIN_PULSE_NS + SERVO_PULSE_SPAN_NS <= SERVO_PERIOD_NS);
