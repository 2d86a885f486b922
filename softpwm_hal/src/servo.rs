//! Hobby servo angle translation.
//!
//! Maps 0..=180 degrees onto a 1 ms..2 ms pulse in a 20 ms frame and turns
//! it into an ordinary PWM command for one channel.

use softpwm_common::command::PwmCommand;
use softpwm_common::consts::{
    SERVO_MAX_ANGLE, SERVO_MIN_PULSE_NS, SERVO_PERIOD_NS, SERVO_PULSE_SPAN_NS,
};

/// Pulse width for `angle` degrees; angles above 180 are clamped.
pub fn angle_to_duty_ns(angle: u32) -> u32 {
    let angle = angle.min(SERVO_MAX_ANGLE);
    SERVO_MIN_PULSE_NS + angle * SERVO_PULSE_SPAN_NS / SERVO_MAX_ANGLE
}

/// A servo wired to one PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoControl {
    channel: usize,
}

impl ServoControl {
    /// Bind a servo to `channel`.
    pub fn new(channel: usize) -> Self {
        Self { channel }
    }

    /// Channel carrying the servo signal.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Enable command holding the servo at `angle`.
    pub fn command(&self, angle: u32) -> PwmCommand {
        PwmCommand::enable(self.channel, SERVO_PERIOD_NS, angle_to_duty_ns(angle))
    }
}
