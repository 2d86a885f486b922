//! Channel registry.
//!
//! Fixed-capacity table of [`PwmChannel`]s, built once from an ordered line
//! assignment (channel `i` drives `lines[i]`) and immutable afterwards apart
//! from each channel's own atomics and guard. Lookups need no lock.

use crate::channel::PwmChannel;
use crate::claims::LineClaims;
use crate::waveform::WaveformOptions;
use heapless::Vec as FixedVec;
use softpwm_common::consts::{DEFAULT_DUTY_NS, DEFAULT_PERIOD_NS, MAX_CHANNELS};
use softpwm_common::error::HalError;
use softpwm_common::line::{Direction, Level, LineDriver, LineId};
use std::sync::Arc;
use tracing::{info, warn};

/// Owner of every PWM channel and of the lines they drive.
pub struct ChannelRegistry {
    driver: Arc<dyn LineDriver>,
    channels: FixedVec<PwmChannel, MAX_CHANNELS>,
    options: WaveformOptions,
}

impl ChannelRegistry {
    /// Claim `lines` as low outputs and create one inactive channel per line
    /// with the default period and duty.
    ///
    /// # Errors
    /// - `HalError::Configuration` if `lines` is empty or longer than
    ///   `MAX_CHANNELS`
    /// - `HalError::Resource` if any line cannot be claimed; no line stays
    ///   claimed in that case
    pub fn initialize(
        driver: Arc<dyn LineDriver>,
        lines: &[LineId],
        options: WaveformOptions,
    ) -> Result<Self, HalError> {
        if lines.is_empty() || lines.len() > MAX_CHANNELS {
            return Err(HalError::Configuration(format!(
                "channel count must be 1..={MAX_CHANNELS}, got {}",
                lines.len()
            )));
        }

        let handles = LineClaims::acquire(
            driver.as_ref(),
            lines,
            Direction::Output {
                initial: Level::Low,
            },
        )?;

        let mut channels = FixedVec::new();
        for (id, handle) in handles.into_iter().enumerate() {
            let channel = PwmChannel::new(id, handle, DEFAULT_PERIOD_NS, DEFAULT_DUTY_NS);
            if channels.push(channel).is_err() {
                // Unreachable: the count was checked against the capacity above.
                return Err(HalError::Configuration("channel table full".to_string()));
            }
        }

        info!(
            "Channel registry initialized: {} channels on {:?} via {}",
            channels.len(),
            lines,
            driver.name()
        );

        Ok(Self {
            driver,
            channels,
            options,
        })
    }

    /// Channel `id`.
    ///
    /// # Errors
    /// Returns `HalError::Range` if `id` is not below the channel count.
    pub fn lookup(&self, id: usize) -> Result<&PwmChannel, HalError> {
        self.channels.get(id).ok_or(HalError::Range {
            id,
            count: self.channels.len(),
        })
    }

    /// Number of channels (0 after shutdown).
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True once shut down.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PwmChannel> {
        self.channels.iter()
    }

    /// Driver the channels' lines belong to.
    pub fn driver(&self) -> &Arc<dyn LineDriver> {
        &self.driver
    }

    /// Options every waveform thread is spawned with.
    pub fn options(&self) -> WaveformOptions {
        self.options
    }

    /// Stop every running waveform and release every line.
    ///
    /// Safe to call more than once; later calls find an empty table.
    pub fn shutdown(&mut self) {
        if self.channels.is_empty() {
            return;
        }
        info!("Shutting down {} channels", self.channels.len());

        // Reverse order, mirroring acquisition.
        while let Some(channel) = self.channels.pop() {
            let id = channel.id();
            let unit = channel.lock().unit.take();
            if let Some(unit) = unit {
                unit.stop();
                info!("Channel {} stopped", id);
            }

            match Arc::try_unwrap(channel.into_shared()) {
                Ok(shared) => self.driver.release(shared.line),
                Err(_) => warn!("Channel {} line still referenced, not released", id),
            }
        }
    }
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
