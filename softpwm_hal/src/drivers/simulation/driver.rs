//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `LineDriver` trait on an in-memory
//! line table. Besides serving as the `--simulate` backend it is the test
//! double for the PWM engine: it rejects invalid or doubly-claimed lines,
//! can be told to refuse a specific claim, and records every output
//! transition.

use super::io::{LineEvent, LineTable};
use parking_lot::Mutex;
use softpwm_common::error::HalError;
use softpwm_common::line::{Direction, Level, LineDriver, LineHandle, LineId};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Lines accepted by [`SimulationDriver::new`].
const DEFAULT_VALID_LINES: RangeInclusive<LineId> = 0..=1023;

/// Simulation driver implementing the LineDriver trait.
pub struct SimulationDriver {
    /// Line ids that exist on the simulated board
    valid: RangeInclusive<LineId>,
    /// Claimed lines and the event log
    table: Mutex<LineTable>,
    /// Lines whose next claims are refused
    failing: Mutex<HashSet<LineId>>,
}

impl SimulationDriver {
    /// Create a driver accepting line ids `0..=1023`.
    pub fn new() -> Self {
        Self::with_valid_lines(DEFAULT_VALID_LINES)
    }

    /// Create a driver accepting only the given line ids.
    pub fn with_valid_lines(valid: RangeInclusive<LineId>) -> Self {
        Self {
            valid,
            table: Mutex::new(LineTable::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Refuse every claim of `line` until [`Self::clear_claim_failures`].
    pub fn fail_claims_on(&self, line: LineId) {
        self.failing.lock().insert(line);
    }

    /// Accept claims on every valid line again.
    pub fn clear_claim_failures(&self) {
        self.failing.lock().clear();
    }

    /// Set the level an input line reads as.
    pub fn set_input(&self, line: LineId, level: Level) {
        self.table.lock().inject(line, level);
    }

    /// Current level of a claimed line.
    pub fn level(&self, line: LineId) -> Option<Level> {
        self.table.lock().level(line)
    }

    /// Whether `line` is currently claimed.
    pub fn is_claimed(&self, line: LineId) -> bool {
        self.table.lock().is_claimed(line)
    }

    /// Claimed lines in ascending order.
    pub fn claimed_lines(&self) -> Vec<LineId> {
        self.table.lock().claimed()
    }

    /// Copy of the transition log, oldest first.
    pub fn events(&self) -> Vec<LineEvent> {
        self.table.lock().events()
    }

    /// Transitions recorded for one line, oldest first.
    pub fn events_for(&self, line: LineId) -> Vec<LineEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.line == line)
            .collect()
    }

    /// Drop every recorded transition.
    pub fn clear_events(&self) {
        self.table.lock().clear_events();
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn claim(&self, line: LineId, direction: Direction) -> Result<LineHandle, HalError> {
        if !self.valid.contains(&line) {
            return Err(HalError::Resource(format!("line {line} does not exist")));
        }
        if self.failing.lock().contains(&line) {
            return Err(HalError::Resource(format!("line {line} refused by driver")));
        }

        let mut table = self.table.lock();
        if table.is_claimed(line) {
            return Err(HalError::Resource(format!("line {line} already claimed")));
        }
        table.claim(line, direction);
        debug!("Simulated line {} claimed as {:?}", line, direction);
        Ok(LineHandle::new(line))
    }

    fn release(&self, handle: LineHandle) {
        if !self.table.lock().release(handle.line()) {
            warn!("Release of unclaimed simulated line {}", handle.line());
        }
    }

    fn set(&self, handle: &LineHandle, level: Level) {
        self.table.lock().drive(handle.line(), level);
    }

    fn get(&self, handle: &LineHandle) -> Result<Level, HalError> {
        self.table
            .lock()
            .level(handle.line())
            .ok_or_else(|| HalError::Resource(format!("line {} not claimed", handle.line())))
    }
}
