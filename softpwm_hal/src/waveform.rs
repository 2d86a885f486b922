//! Waveform generator.
//!
//! One OS thread per active channel toggles the channel's line:
//!
//! ```text
//!   ┌── read period, duty (two relaxed loads)
//!   │   clamp duty to period
//!   │   set HIGH, busy-wait duty/1000 µs
//!   │   set LOW,  busy-wait (period-duty)/1000 µs
//!   └── stop requested? ── yes ──▶ exit (line rests LOW)
//! ```
//!
//! The loop takes no lock of its own and never logs per cycle. Waits are
//! busy-waits at microsecond granularity; sub-microsecond remainders are
//! truncated. Cancellation is cooperative and checked once per cycle, so a
//! stop takes effect within one period.

use crate::channel::ChannelShared;
use softpwm_common::error::HalError;
use softpwm_common::line::{Level, LineDriver};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Phase durations of one cycle, in whole microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    /// High-phase hold
    pub high_us: u64,
    /// Low-phase hold
    pub low_us: u64,
}

impl CyclePlan {
    /// Plan a cycle from raw stored values. A duty above the period is
    /// treated as the period for this cycle only.
    pub fn new(period_ns: u32, duty_ns: u32) -> Self {
        let duty_ns = duty_ns.min(period_ns);
        Self {
            high_us: u64::from(duty_ns / 1000),
            low_us: u64::from((period_ns - duty_ns) / 1000),
        }
    }
}

/// Hold the calling thread for `us` microseconds without yielding.
pub fn busy_wait_us(us: u64) {
    if us == 0 {
        return;
    }
    let deadline = Instant::now() + Duration::from_micros(us);
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

/// Spawn-time options shared by every waveform thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveformOptions {
    /// SCHED_FIFO priority each thread requests for itself.
    pub realtime_priority: Option<u8>,
    /// Thread stack size in bytes; platform default when `None`.
    pub stack_size: Option<usize>,
}

/// Handle to a running waveform thread.
///
/// Dropping a unit without calling [`WaveformUnit::stop`] still stops and
/// joins the thread.
#[derive(Debug)]
pub struct WaveformUnit {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WaveformUnit {
    /// Start driving `shared.line` on a new thread named `pwm_thread_<id>`.
    ///
    /// # Errors
    /// Returns `HalError::Resource` if the OS refuses to create the thread.
    pub fn spawn(
        channel_id: usize,
        shared: Arc<ChannelShared>,
        driver: Arc<dyn LineDriver>,
        options: WaveformOptions,
    ) -> Result<Self, HalError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let mut builder = thread::Builder::new().name(format!("pwm_thread_{channel_id}"));
        if let Some(size) = options.stack_size {
            builder = builder.stack_size(size);
        }

        let thread = builder
            .spawn(move || {
                if let Some(priority) = options.realtime_priority {
                    request_fifo_priority(channel_id, priority);
                }
                debug!("Waveform for channel {} started", channel_id);
                let cycles = run_waveform(&shared, driver.as_ref(), &thread_stop);
                debug!(
                    "Waveform for channel {} stopped after {} cycles",
                    channel_id, cycles
                );
            })
            .map_err(|e| {
                HalError::Resource(format!(
                    "cannot spawn waveform thread for channel {channel_id}: {e}"
                ))
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Request cancellation and block until the thread has exited.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let name = thread.thread().name().map(str::to_owned);
            if thread.join().is_err() {
                warn!("Waveform thread {:?} panicked", name);
            }
        }
    }
}

impl Drop for WaveformUnit {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Toggle the line until `stop` is set. Returns the number of cycles run.
fn run_waveform(shared: &ChannelShared, driver: &dyn LineDriver, stop: &AtomicBool) -> u64 {
    let mut cycles: u64 = 0;
    loop {
        let plan = CyclePlan::new(shared.timing.period_ns(), shared.timing.duty_ns());

        driver.set(&shared.line, Level::High);
        busy_wait_us(plan.high_us);

        driver.set(&shared.line, Level::Low);
        busy_wait_us(plan.low_us);

        cycles += 1;
        if stop.load(Ordering::Acquire) {
            return cycles;
        }
    }
}

/// Ask the scheduler to run the calling thread under SCHED_FIFO.
#[cfg(target_os = "linux")]
fn request_fifo_priority(channel_id: usize, priority: u8) {
    // SAFETY: sched_param is plain old data; all-zero is a valid value.
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = libc::c_int::from(priority);
    // SAFETY: pid 0 targets the calling thread; `param` outlives the call.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        warn!(
            "Channel {}: SCHED_FIFO priority {} refused ({}), running at normal priority",
            channel_id,
            priority,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn request_fifo_priority(channel_id: usize, priority: u8) {
    warn!(
        "Channel {}: real-time priority {} unsupported on this platform",
        channel_id, priority
    );
}
