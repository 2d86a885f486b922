//! Control command grammar.
//!
//! Commands arrive as whitespace-separated text, one per line:
//!
//! | Text | Request |
//! |------|---------|
//! | `<channel> <period_ns> <duty_ns> <enable>` | [`ControlRequest::Configure`] |
//! | `servo <angle>` | [`ControlRequest::Servo`] |
//! | `sensor <id>` | [`ControlRequest::Sensor`] |
//! | `status` | [`ControlRequest::Status`] |
//!
//! `enable` is a signed integer; any non-zero value enables the channel.
//! Parsing never touches channel state, so a rejected command cannot
//! mutate anything.

use crate::consts::MAX_COMMAND_LEN;
use crate::error::HalError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Per-channel PWM configuration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmCommand {
    /// Target channel id
    pub channel: usize,
    /// Full cycle duration in nanoseconds
    pub period_ns: u32,
    /// High-phase duration in nanoseconds (may exceed the period)
    pub duty_ns: u32,
    /// Start (true) or stop (false) the waveform
    pub enable: bool,
}

impl PwmCommand {
    /// Command that enables `channel` with the given timing.
    pub fn enable(channel: usize, period_ns: u32, duty_ns: u32) -> Self {
        Self {
            channel,
            period_ns,
            duty_ns,
            enable: true,
        }
    }

    /// Command that disables `channel`, storing the given timing.
    pub fn disable(channel: usize, period_ns: u32, duty_ns: u32) -> Self {
        Self {
            channel,
            period_ns,
            duty_ns,
            enable: false,
        }
    }
}

impl FromStr for PwmCommand {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let channel = next_field::<usize>(&mut fields, "channel")?;
        let period_ns = next_field::<u32>(&mut fields, "period")?;
        let duty_ns = next_field::<u32>(&mut fields, "duty")?;
        let enable = next_field::<i32>(&mut fields, "enable")? != 0;
        reject_trailing(&mut fields)?;

        Ok(Self {
            channel,
            period_ns,
            duty_ns,
            enable,
        })
    }
}

/// One parsed line of the control stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Apply a PWM command
    Configure(PwmCommand),
    /// Move the configured servo to an angle in degrees
    Servo(u32),
    /// Sample a sensor line
    Sensor(usize),
    /// Report every channel's state
    Status,
}

impl FromStr for ControlRequest {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() > MAX_COMMAND_LEN {
            return Err(HalError::Validation(format!(
                "command longer than {MAX_COMMAND_LEN} bytes"
            )));
        }

        let mut fields = s.split_whitespace();
        match fields.next() {
            None => Err(HalError::Validation("empty command".to_string())),
            Some("status") => {
                reject_trailing(&mut fields)?;
                Ok(Self::Status)
            }
            Some("servo") => {
                let angle = next_field::<u32>(&mut fields, "angle")?;
                reject_trailing(&mut fields)?;
                Ok(Self::Servo(angle))
            }
            Some("sensor") => {
                let id = next_field::<usize>(&mut fields, "sensor id")?;
                reject_trailing(&mut fields)?;
                Ok(Self::Sensor(id))
            }
            Some(_) => s.parse::<PwmCommand>().map(Self::Configure),
        }
    }
}

fn next_field<'a, T: FromStr>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &str,
) -> Result<T, HalError> {
    let raw = fields
        .next()
        .ok_or_else(|| HalError::Validation(format!("missing {name}")))?;
    raw.parse::<T>()
        .map_err(|_| HalError::Validation(format!("bad {name} '{raw}'")))
}

fn reject_trailing<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Result<(), HalError> {
    match fields.next() {
        Some(extra) => Err(HalError::Validation(format!("unexpected field '{extra}'"))),
        None => Ok(()),
    }
}
