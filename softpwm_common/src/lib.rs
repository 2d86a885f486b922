//! softpwm Common Library
//!
//! This crate provides the shared vocabulary of the softpwm workspace:
//! limits, the error taxonomy, configuration loading, the line driver
//! contract and the control command grammar.
//!
//! # Module Structure
//!
//! - [`consts`] - Channel limits and default timings
//! - [`error`] - `HalError`, the error type of every fallible HAL operation
//! - [`config`] - Configuration loading traits and types
//! - [`line`] - `LineDriver` trait and line value types
//! - [`command`] - Control command parsing
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use softpwm_common::prelude::*;
//!
//! let request: ControlRequest = "0 20000000 1500000 1".parse().unwrap();
//! assert!(matches!(request, ControlRequest::Configure(_)));
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod error;
pub mod line;
pub mod prelude;
