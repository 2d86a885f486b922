//! Control interface.
//!
//! Applies configuration commands to channels. For a [`PwmCommand`]:
//!
//! 1. Look the channel up (`HalError::Range` if unknown, nothing mutated).
//! 2. Take the channel guard.
//! 3. Store period and duty, whether or not the channel is running.
//! 4. Enable: spawn a waveform thread unless one already runs.
//!    Disable: stop and join the running thread, if any.
//! 5. Release the guard.
//!
//! This is the only writer of a channel's waveform unit. Since a disable
//! joins under the guard, a following enable on the same channel can only
//! start after the previous thread has fully exited.
//!
//! The text front end ([`ControlInterface::respond`],
//! [`ControlInterface::serve`]) parses one command per line and writes one
//! reply line: `ok`, a query result, or `error: <message>`.

use crate::registry::ChannelRegistry;
use crate::sensor::SensorBank;
use crate::servo::ServoControl;
use crate::status::StatusReport;
use crate::waveform::WaveformUnit;
use softpwm_common::command::{ControlRequest, PwmCommand};
use softpwm_common::consts::SERVICE_NAME;
use softpwm_common::error::HalError;
use softpwm_common::line::Level;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Successful outcome of a control request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Command applied
    Done,
    /// Sensor sample
    Level(Level),
    /// Status report
    Status(StatusReport),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "ok"),
            Self::Level(level) => write!(f, "{level}"),
            Self::Status(report) => write!(f, "{}", report.to_json()),
        }
    }
}

/// Command front end over a channel registry.
pub struct ControlInterface<'a> {
    service: &'a str,
    registry: &'a ChannelRegistry,
    sensors: Option<&'a SensorBank>,
    servo: Option<ServoControl>,
}

impl<'a> ControlInterface<'a> {
    /// Control PWM channels only.
    pub fn new(registry: &'a ChannelRegistry) -> Self {
        Self {
            service: SERVICE_NAME,
            registry,
            sensors: None,
            servo: None,
        }
    }

    /// Name reported in status replies.
    pub fn with_service_name(mut self, service: &'a str) -> Self {
        self.service = service;
        self
    }

    /// Answer `sensor <id>` from `sensors`.
    pub fn with_sensors(mut self, sensors: &'a SensorBank) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Accept `servo <angle>` for `servo`.
    pub fn with_servo(mut self, servo: ServoControl) -> Self {
        self.servo = Some(servo);
        self
    }

    /// Apply one PWM command.
    ///
    /// # Errors
    /// - `HalError::Range` for an unknown channel (nothing mutated)
    /// - `HalError::Resource` if a waveform thread cannot be spawned; the
    ///   channel stays inactive, the new timing stays stored
    pub fn apply(&self, cmd: &PwmCommand) -> Result<(), HalError> {
        let channel = self.registry.lookup(cmd.channel)?;
        let mut state = channel.lock();

        channel.shared().timing.store(cmd.period_ns, cmd.duty_ns);
        debug!(
            "Channel {}: period={}ns duty={}ns enable={}",
            cmd.channel, cmd.period_ns, cmd.duty_ns, cmd.enable
        );

        if cmd.enable {
            if state.is_active() {
                return Ok(());
            }
            let unit = WaveformUnit::spawn(
                channel.id(),
                Arc::clone(channel.shared()),
                Arc::clone(self.registry.driver()),
                self.registry.options(),
            )?;
            state.unit = Some(unit);
            info!("Channel {} enabled on line {}", channel.id(), channel.line());
        } else if let Some(unit) = state.unit.take() {
            unit.stop();
            info!("Channel {} disabled", channel.id());
        }
        Ok(())
    }

    /// Execute a parsed request.
    pub fn handle(&self, request: ControlRequest) -> Result<Reply, HalError> {
        match request {
            ControlRequest::Configure(cmd) => self.apply(&cmd).map(|()| Reply::Done),
            ControlRequest::Servo(angle) => {
                let servo = self
                    .servo
                    .ok_or_else(|| HalError::Validation("no servo configured".to_string()))?;
                self.apply(&servo.command(angle)).map(|()| Reply::Done)
            }
            ControlRequest::Sensor(id) => match self.sensors {
                Some(sensors) => sensors.read(id).map(Reply::Level),
                None => Err(HalError::Range { id, count: 0 }),
            },
            ControlRequest::Status => Ok(Reply::Status(StatusReport::collect(
                self.service,
                self.registry,
                self.sensors,
            ))),
        }
    }

    /// Parse and execute one line of text.
    pub fn handle_line(&self, line: &str) -> Result<Reply, HalError> {
        let request: ControlRequest = line.parse()?;
        self.handle(request)
    }

    /// Execute `line` and write the reply line to `out`. Blank lines are
    /// ignored.
    pub fn respond<W: Write>(&self, line: &str, out: &mut W) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        match self.handle_line(line) {
            Ok(reply) => writeln!(out, "{reply}")?,
            Err(e) => {
                warn!("Command {:?} rejected: {}", line.trim(), e);
                writeln!(out, "error: {e}")?;
            }
        }
        out.flush()
    }

    /// Answer every line of `input` until end of stream. Returns the number
    /// of lines read.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut out: W) -> io::Result<u64> {
        let mut count = 0;
        for line in input.lines() {
            self.respond(&line?, &mut out)?;
            count += 1;
        }
        Ok(count)
    }
}
