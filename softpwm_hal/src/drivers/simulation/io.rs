//! Simulated line table.
//!
//! The `LineTable` tracks:
//! - which lines are claimed and in which direction
//! - the current level of every claimed line
//! - a bounded log of every output transition, stamped with the
//!   writing thread so tests can prove single ownership of a line

use softpwm_common::line::{Direction, Level, LineId};
use std::collections::{HashMap, VecDeque};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// Oldest events are dropped once the log holds this many entries.
pub const EVENT_LOG_CAPACITY: usize = 65_536;

/// One `set` call observed by the simulation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    /// Driven line
    pub line: LineId,
    /// Level written
    pub level: Level,
    /// Time since the driver was created
    pub at: Duration,
    /// Thread that issued the call
    pub thread: ThreadId,
}

/// State of one claimed line.
#[derive(Debug, Clone, Copy)]
struct SimLine {
    direction: Direction,
    level: Level,
}

/// Claimed lines plus the transition log.
#[derive(Debug)]
pub(super) struct LineTable {
    lines: HashMap<LineId, SimLine>,
    /// Levels injected for lines that are not claimed yet
    pending_inputs: HashMap<LineId, Level>,
    events: VecDeque<LineEvent>,
    epoch: Instant,
}

impl LineTable {
    pub(super) fn new() -> Self {
        Self {
            lines: HashMap::new(),
            pending_inputs: HashMap::new(),
            events: VecDeque::new(),
            epoch: Instant::now(),
        }
    }

    pub(super) fn is_claimed(&self, line: LineId) -> bool {
        self.lines.contains_key(&line)
    }

    pub(super) fn claim(&mut self, line: LineId, direction: Direction) {
        let level = match direction {
            Direction::Output { initial } => initial,
            Direction::Input => self.pending_inputs.remove(&line).unwrap_or(Level::Low),
        };
        self.lines.insert(line, SimLine { direction, level });
    }

    pub(super) fn release(&mut self, line: LineId) -> bool {
        self.lines.remove(&line).is_some()
    }

    pub(super) fn drive(&mut self, line: LineId, level: Level) {
        if let Some(state) = self.lines.get_mut(&line) {
            state.level = level;
        }
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(LineEvent {
            line,
            level,
            at: self.epoch.elapsed(),
            thread: std::thread::current().id(),
        });
    }

    /// Inject an input level. Lines not claimed yet pick it up on claim.
    pub(super) fn inject(&mut self, line: LineId, level: Level) {
        match self.lines.get_mut(&line) {
            Some(state) if state.direction == Direction::Input => state.level = level,
            Some(_) => {}
            None => {
                self.pending_inputs.insert(line, level);
            }
        }
    }

    pub(super) fn level(&self, line: LineId) -> Option<Level> {
        self.lines.get(&line).map(|state| state.level)
    }

    pub(super) fn claimed(&self) -> Vec<LineId> {
        let mut lines: Vec<LineId> = self.lines.keys().copied().collect();
        lines.sort_unstable();
        lines
    }

    pub(super) fn events(&self) -> Vec<LineEvent> {
        self.events.iter().copied().collect()
    }

    pub(super) fn clear_events(&mut self) {
        self.events.clear();
    }
}
