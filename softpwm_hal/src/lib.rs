//! # softpwm HAL Library
//!
//! Multichannel software PWM engine and binary sensor bank on top of a
//! pluggable line driver.
//!
//! Drivers implement the `LineDriver` trait defined in
//! `softpwm_common::line`.
//!
//! # Module Structure
//!
//! - [`core`] - HalCore struct, control loop management
//! - [`registry`] - Fixed channel table, line claims, shutdown
//! - [`channel`] - Per-channel timing atomics and lifecycle guard
//! - [`waveform`] - Per-channel waveform threads
//! - [`control`] - Command application and the text control stream
//! - [`sensor`] - Binary input lines
//! - [`servo`] - Angle to pulse-width translation
//! - [`status`] - JSON status report
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Line driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     softpwm_hal (single crate)                    │
//! │  ┌──────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ stdin/stdout │◄──►│   HalCore    │◄──►│  Driver Registry    │  │
//! │  │ command text │    │ (control)    │    │                     │  │
//! │  └──────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                             │                                     │
//! │              ┌──────────────┼───────────────┐                     │
//! │              ▼              ▼               ▼                     │
//! │     ┌────────────────┐ ┌──────────┐ ┌──────────────┐              │
//! │     │ChannelRegistry │ │SensorBank│ │ LineDriver   │ (trait obj)  │
//! │     │ pwm_thread_N.. │ │          │ │              │              │
//! │     └────────────────┘ └──────────┘ └──────────────┘              │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod channel;
mod claims;
pub mod control;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod registry;
pub mod sensor;
pub mod servo;
pub mod status;
pub mod waveform;

// Re-export key types for convenience
pub use crate::channel::{ChannelSnapshot, PwmChannel};
pub use crate::control::{ControlInterface, Reply};
pub use crate::core::HalCore;
pub use crate::driver_registry::DriverRegistry;
pub use crate::registry::ChannelRegistry;
pub use crate::sensor::SensorBank;
pub use crate::servo::ServoControl;
pub use crate::status::StatusReport;
pub use crate::waveform::{CyclePlan, WaveformOptions};
