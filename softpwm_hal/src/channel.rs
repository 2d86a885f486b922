//! PWM channel state.
//!
//! A channel is split in two halves with different access rules:
//!
//! - [`ChannelShared`] holds the line handle and the timing atomics. It is
//!   shared (via `Arc`) with the channel's waveform thread, which reads the
//!   timing every cycle without taking any lock.
//! - The `guard` mutex holds the optional [`WaveformUnit`]. Every
//!   enable/disable decision is made while holding it, which is what keeps a
//!   channel at one waveform thread at most.
//!
//! `period` and `duty` are two independent atomics: a cycle may combine a
//! duty from one command with the period of the next. Readers must not
//! assume the pair is updated jointly.

use crate::waveform::WaveformUnit;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use softpwm_common::line::{LineHandle, LineId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Channel timing in nanoseconds.
#[derive(Debug)]
pub struct ChannelTiming {
    period_ns: AtomicU32,
    duty_ns: AtomicU32,
}

impl ChannelTiming {
    /// Create timing with the given initial values.
    pub fn new(period_ns: u32, duty_ns: u32) -> Self {
        Self {
            period_ns: AtomicU32::new(period_ns),
            duty_ns: AtomicU32::new(duty_ns),
        }
    }

    /// Store both values. Each store is atomic on its own; the pair is not.
    pub fn store(&self, period_ns: u32, duty_ns: u32) {
        self.period_ns.store(period_ns, Ordering::Relaxed);
        self.duty_ns.store(duty_ns, Ordering::Relaxed);
    }

    /// Current period.
    pub fn period_ns(&self) -> u32 {
        self.period_ns.load(Ordering::Relaxed)
    }

    /// Current duty, unclamped.
    pub fn duty_ns(&self) -> u32 {
        self.duty_ns.load(Ordering::Relaxed)
    }
}

/// The part of a channel its waveform thread can see.
#[derive(Debug)]
pub struct ChannelShared {
    pub(crate) line: LineHandle,
    pub(crate) timing: ChannelTiming,
}

impl ChannelShared {
    /// Bind a claimed line to fresh timing.
    pub(crate) fn new(line: LineHandle, period_ns: u32, duty_ns: u32) -> Self {
        Self {
            line,
            timing: ChannelTiming::new(period_ns, duty_ns),
        }
    }

    /// Channel timing.
    pub fn timing(&self) -> &ChannelTiming {
        &self.timing
    }

    /// Driven line handle.
    pub fn line(&self) -> &LineHandle {
        &self.line
    }
}

/// Guarded lifecycle state: `Some` iff a waveform thread owns the channel.
#[derive(Debug, Default)]
pub(crate) struct ChannelState {
    pub(crate) unit: Option<WaveformUnit>,
}

impl ChannelState {
    pub(crate) fn is_active(&self) -> bool {
        self.unit.is_some()
    }
}

/// One software PWM output.
#[derive(Debug)]
pub struct PwmChannel {
    id: usize,
    line_id: LineId,
    shared: Arc<ChannelShared>,
    guard: Mutex<ChannelState>,
}

impl PwmChannel {
    pub(crate) fn new(id: usize, line: LineHandle, period_ns: u32, duty_ns: u32) -> Self {
        Self {
            id,
            line_id: line.line(),
            shared: Arc::new(ChannelShared::new(line, period_ns, duty_ns)),
            guard: Mutex::new(ChannelState::default()),
        }
    }

    /// Channel id (index into the registry).
    pub fn id(&self) -> usize {
        self.id
    }

    /// Line this channel drives.
    pub fn line(&self) -> LineId {
        self.line_id
    }

    /// Stored period.
    pub fn period_ns(&self) -> u32 {
        self.shared.timing.period_ns()
    }

    /// Stored duty (may exceed the period; clamped only when used).
    pub fn duty_ns(&self) -> u32 {
        self.shared.timing.duty_ns()
    }

    /// Whether a waveform thread currently owns this channel.
    pub fn is_active(&self) -> bool {
        self.guard.lock().is_active()
    }

    /// Point-in-time view for status reports.
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            id: self.id,
            line: self.line_id,
            period_ns: self.period_ns(),
            duty_ns: self.duty_ns(),
            active: self.is_active(),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<ChannelShared> {
        &self.shared
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.guard.lock()
    }

    /// Split into the shared half, for line release at shutdown. The
    /// caller must have stopped the waveform thread first.
    pub(crate) fn into_shared(self) -> Arc<ChannelShared> {
        self.shared
    }
}

/// Serializable channel view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    /// Channel id
    pub id: usize,
    /// Driven line
    pub line: LineId,
    /// Stored period in nanoseconds
    pub period_ns: u32,
    /// Stored duty in nanoseconds
    pub duty_ns: u32,
    /// Whether a waveform thread is running
    pub active: bool,
}
