//! Line driver contract.
//!
//! A *line* is one physical digital I/O signal. The PWM engine and the
//! sensor bank never touch hardware directly; they go through a
//! [`LineDriver`] trait object that can claim, drive, sample and release
//! lines.
//!
//! Ownership of a line is ownership of its [`LineHandle`]: the handle is
//! not `Clone`, and [`LineDriver::release`] consumes it.

use crate::error::HalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a line as understood by the driver (e.g. a GPIO number).
pub type LineId = u32;

/// Logic level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// `'1'` for high, `'0'` for low.
    pub fn as_char(self) -> char {
        match self {
            Self::High => '1',
            Self::Low => '0',
        }
    }

    /// Level for a raw boolean (true = high).
    pub fn from_bool(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }

    /// True for [`Level::High`].
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Direction requested when claiming a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sampled line.
    Input,
    /// Driven line, set to `initial` as part of the claim.
    Output {
        /// Level driven right after the claim
        initial: Level,
    },
}

/// Exclusive token for a claimed line.
///
/// Minted by a [`LineDriver`] implementation on a successful claim and
/// handed back to it on release.
#[derive(Debug, PartialEq, Eq)]
pub struct LineHandle {
    line: LineId,
}

impl LineHandle {
    /// Mint a handle. Only driver implementations should call this, and only
    /// after the line has actually been claimed.
    pub fn new(line: LineId) -> Self {
        Self { line }
    }

    /// Line this handle owns.
    pub fn line(&self) -> LineId {
        self.line
    }
}

/// Capability to claim, drive, sample and release lines.
///
/// # Timing Contracts
///
/// | Operation | Caller | Constraint |
/// |-----------|--------|------------|
/// | `claim()` / `release()` | registry init/shutdown | None |
/// | `set()` | waveform thread, every phase | **HOT**: no locks held across calls, no allocation |
/// | `get()` | sensor reads, tests | None |
pub trait LineDriver: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation", "sysfs").
    fn name(&self) -> &'static str;

    /// Claim `line` for exclusive use in the given direction.
    ///
    /// # Errors
    /// Returns `HalError::Resource` if the line is invalid, already claimed,
    /// or cannot be configured.
    fn claim(&self, line: LineId, direction: Direction) -> Result<LineHandle, HalError>;

    /// Give a claimed line back. Never fails; problems are logged.
    fn release(&self, handle: LineHandle);

    /// Drive a line to `level`.
    fn set(&self, handle: &LineHandle, level: Level);

    /// Sample a line.
    ///
    /// # Errors
    /// Returns `HalError::Resource` if the driver cannot read the line.
    fn get(&self, handle: &LineHandle) -> Result<Level, HalError>;
}
