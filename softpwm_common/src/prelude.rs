//! Prelude module for common re-exports.
//!
//! ```rust
//! use softpwm_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, SystemConfig};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::HalError;

// ─── Lines ──────────────────────────────────────────────────────────
pub use crate::line::{Direction, Level, LineDriver, LineHandle, LineId};

// ─── Commands ───────────────────────────────────────────────────────
pub use crate::command::{ControlRequest, PwmCommand};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_DUTY_NS, DEFAULT_PERIOD_NS, MAX_CHANNELS};
