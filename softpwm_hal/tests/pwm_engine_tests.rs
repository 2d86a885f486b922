//! PWM engine integration tests.
//!
//! Drive the channel registry through the control interface on top of the
//! simulation driver, using sub-millisecond periods so waveform threads
//! produce plenty of transitions quickly.

use softpwm_common::command::PwmCommand;
use softpwm_common::consts::{DEFAULT_DUTY_NS, DEFAULT_PERIOD_NS};
use softpwm_common::error::HalError;
use softpwm_common::line::{Level, LineDriver, LineId};
use softpwm_hal::drivers::simulation::{LineEvent, SimulationDriver};
use softpwm_hal::{ChannelRegistry, ControlInterface, DriverRegistry, HalCore, WaveformOptions};
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

const FAST_PERIOD_NS: u32 = 200_000;
const FAST_DUTY_NS: u32 = 50_000;

fn setup(lines: &[LineId]) -> (Arc<SimulationDriver>, ChannelRegistry) {
    let sim = Arc::new(SimulationDriver::new());
    let driver: Arc<dyn LineDriver> = sim.clone();
    let registry = ChannelRegistry::initialize(driver, lines, WaveformOptions::default()).unwrap();
    (sim, registry)
}

/// Distinct writer threads in order of first appearance; panics if a
/// thread reappears after another one took over the line.
fn writer_sequence(events: &[LineEvent]) -> Vec<ThreadId> {
    let mut writers: Vec<ThreadId> = Vec::new();
    for event in events {
        match writers.last() {
            Some(last) if *last == event.thread => {}
            _ => {
                assert!(
                    !writers.contains(&event.thread),
                    "line {} driven by an earlier thread again",
                    event.line
                );
                writers.push(event.thread);
            }
        }
    }
    writers
}

/// High and low phase lengths, measured between consecutive transitions.
fn phase_durations(events: &[LineEvent]) -> (Vec<Duration>, Vec<Duration>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for pair in events.windows(2) {
        let span = pair[1].at - pair[0].at;
        match (pair[0].level, pair[1].level) {
            (Level::High, Level::Low) => highs.push(span),
            (Level::Low, Level::High) => lows.push(span),
            _ => {}
        }
    }
    (highs, lows)
}

#[test]
fn one_ms_pulse_every_twenty_ms() {
    let (sim, registry) = setup(&[12]);
    let control = ControlInterface::new(&registry);

    control
        .apply(&PwmCommand::enable(0, 20_000_000, 1_000_000))
        .unwrap();
    thread::sleep(Duration::from_millis(105));
    control
        .apply(&PwmCommand::disable(0, 20_000_000, 1_000_000))
        .unwrap();

    let (highs, lows) = phase_durations(&sim.events_for(12));
    assert!(highs.len() >= 4, "got {} high phases", highs.len());
    assert!(lows.len() >= 3, "got {} low phases", lows.len());
    for high in &highs {
        assert!(*high >= Duration::from_millis(1), "high phase {high:?}");
        assert!(*high < Duration::from_millis(20), "high phase {high:?}");
    }
    for low in &lows {
        assert!(*low >= Duration::from_millis(19), "low phase {low:?}");
    }
}

#[test]
fn clamped_duty_holds_line_high_for_whole_period() {
    let (sim, registry) = setup(&[13]);
    let control = ControlInterface::new(&registry);

    control
        .apply(&PwmCommand::enable(0, 20_000_000, 25_000_000))
        .unwrap();
    thread::sleep(Duration::from_millis(85));
    control
        .apply(&PwmCommand::disable(0, 20_000_000, 25_000_000))
        .unwrap();

    assert_eq!(registry.lookup(0).unwrap().duty_ns(), 25_000_000);

    let (highs, lows) = phase_durations(&sim.events_for(13));
    assert!(highs.len() >= 3, "got {} high phases", highs.len());
    for high in &highs {
        assert!(*high >= Duration::from_millis(20), "high phase {high:?}");
    }
    // No hold between LOW and the next HIGH, only loop overhead.
    for low in &lows {
        assert!(*low < Duration::from_millis(5), "low phase {low:?}");
    }
}

#[test]
fn duty_above_period_is_clamped_per_cycle_only() {
    let (sim, registry) = setup(&[17]);
    let control = ControlInterface::new(&registry);

    control.handle_line("0 200000 900000 1").unwrap();
    thread::sleep(Duration::from_millis(10));

    let channel = registry.lookup(0).unwrap();
    assert!(channel.is_active());
    assert_eq!(channel.duty_ns(), 900_000);

    control.apply(&PwmCommand::disable(0, 200_000, 900_000)).unwrap();
    let events = sim.events_for(17);
    assert!(!events.is_empty());
    // Full-duty cycles still end every cycle with a LOW write.
    assert_eq!(events.last().unwrap().level, Level::Low);
    assert_eq!(sim.level(17), Some(Level::Low));
}

#[test]
fn repeated_enable_keeps_one_thread() {
    let (sim, registry) = setup(&[4]);
    let control = ControlInterface::new(&registry);

    for _ in 0..5 {
        control
            .apply(&PwmCommand::enable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
            .unwrap();
    }
    thread::sleep(Duration::from_millis(10));
    control
        .apply(&PwmCommand::disable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
        .unwrap();

    let writers = writer_sequence(&sim.events_for(4));
    assert_eq!(writers.len(), 1);
}

#[test]
fn disable_of_inactive_channel_is_noop() {
    let (sim, registry) = setup(&[4, 5]);
    let control = ControlInterface::new(&registry);

    control.apply(&PwmCommand::disable(1, 3_000_000, 1_000_000)).unwrap();
    control.apply(&PwmCommand::disable(1, 3_000_000, 1_000_000)).unwrap();

    let channel = registry.lookup(1).unwrap();
    assert!(!channel.is_active());
    assert_eq!(channel.period_ns(), 3_000_000);
    assert!(sim.events().is_empty());
}

#[test]
fn out_of_range_command_mutates_nothing() {
    let (sim, registry) = setup(&[1, 2, 3, 4]);
    let control = ControlInterface::new(&registry);

    let err = control.handle_line("4 1000000 500000 1").unwrap_err();
    assert_eq!(err, HalError::Range { id: 4, count: 4 });

    for channel in registry.iter() {
        assert_eq!(channel.period_ns(), DEFAULT_PERIOD_NS);
        assert_eq!(channel.duty_ns(), DEFAULT_DUTY_NS);
        assert!(!channel.is_active());
    }
    assert!(sim.events().is_empty());
}

#[test]
fn malformed_commands_mutate_nothing() {
    let (_sim, registry) = setup(&[1, 2]);
    let control = ControlInterface::new(&registry);

    for line in [
        "0 1000",
        "0 1000 500 1 extra",
        "x 1000 500 1",
        "0 -1000 500 1",
        "0 1000 500 on",
        "0 5000000000 500 1",
        "0 20000000 1000000 0000000000001",
    ] {
        let err = control.handle_line(line).unwrap_err();
        assert!(matches!(err, HalError::Validation(_)), "{line}: {err:?}");
    }

    let channel = registry.lookup(0).unwrap();
    assert_eq!(channel.period_ns(), DEFAULT_PERIOD_NS);
    assert_eq!(channel.duty_ns(), DEFAULT_DUTY_NS);
    assert!(!channel.is_active());
}

#[test]
fn disable_joins_before_returning() {
    let (sim, registry) = setup(&[9]);
    let control = ControlInterface::new(&registry);

    control
        .apply(&PwmCommand::enable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
        .unwrap();
    thread::sleep(Duration::from_millis(5));
    control
        .apply(&PwmCommand::disable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
        .unwrap();

    let settled = sim.events_for(9);
    thread::sleep(Duration::from_millis(5));
    assert_eq!(sim.events_for(9).len(), settled.len());
    assert_eq!(sim.level(9), Some(Level::Low));

    control
        .apply(&PwmCommand::enable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
        .unwrap();
    thread::sleep(Duration::from_millis(5));
    control
        .apply(&PwmCommand::disable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
        .unwrap();

    let writers = writer_sequence(&sim.events_for(9));
    assert_eq!(writers.len(), 2, "re-enable must start a fresh thread");
}

#[test]
fn timing_update_applies_to_running_waveform() {
    let (sim, registry) = setup(&[11]);
    let control = ControlInterface::new(&registry);

    control.apply(&PwmCommand::enable(0, 1_000_000, 100_000)).unwrap();
    thread::sleep(Duration::from_millis(5));

    control.apply(&PwmCommand::enable(0, 1_000_000, 900_000)).unwrap();
    assert_eq!(registry.lookup(0).unwrap().duty_ns(), 900_000);
    sim.clear_events();
    thread::sleep(Duration::from_millis(10));
    control.apply(&PwmCommand::disable(0, 1_000_000, 900_000)).unwrap();

    let events = sim.events_for(11);
    assert_eq!(writer_sequence(&events).len(), 1);

    let highs: Vec<Duration> = events
        .windows(2)
        .filter(|pair| pair[0].level == Level::High && pair[1].level == Level::Low)
        .map(|pair| pair[1].at - pair[0].at)
        .collect();
    // The first cycle may still be running on the old plan.
    assert!(highs.len() >= 3, "got {} complete high phases", highs.len());
    for high in &highs[1..] {
        assert!(*high >= Duration::from_micros(900), "high phase {high:?}");
    }
}

#[test]
fn concurrent_commands_never_double_drive_a_line() {
    let lines = [20, 21, 22, 23];
    let (sim, registry) = setup(&lines);
    let control = ControlInterface::new(&registry);

    thread::scope(|scope| {
        for worker in 0..6 {
            let control = &control;
            scope.spawn(move || {
                for round in 0..20 {
                    let channel = (worker + round) % 4;
                    let cmd = if (worker + round) % 3 == 0 {
                        PwmCommand::disable(channel, FAST_PERIOD_NS, FAST_DUTY_NS)
                    } else {
                        PwmCommand::enable(channel, FAST_PERIOD_NS, FAST_DUTY_NS + round as u32)
                    };
                    control.apply(&cmd).unwrap();
                    thread::sleep(Duration::from_micros(300));
                }
            });
        }
    });

    for id in 0..4 {
        control
            .apply(&PwmCommand::disable(id, FAST_PERIOD_NS, FAST_DUTY_NS))
            .unwrap();
    }

    for line in lines {
        writer_sequence(&sim.events_for(line));
        assert_eq!(sim.level(line), Some(Level::Low));
    }
    assert!(registry.iter().all(|channel| !channel.is_active()));
}

#[test]
fn shutdown_stops_running_channels_and_releases_lines() {
    let (sim, mut registry) = setup(&[30, 31, 32]);
    {
        let control = ControlInterface::new(&registry);
        control
            .apply(&PwmCommand::enable(0, FAST_PERIOD_NS, FAST_DUTY_NS))
            .unwrap();
        control
            .apply(&PwmCommand::enable(2, FAST_PERIOD_NS, FAST_DUTY_NS))
            .unwrap();
    }
    thread::sleep(Duration::from_millis(5));

    registry.shutdown();
    assert!(sim.claimed_lines().is_empty());

    let settled = sim.events().len();
    thread::sleep(Duration::from_millis(5));
    assert_eq!(sim.events().len(), settled);
}

#[test]
fn hal_core_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("softpwm.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
[shared]
service_name = "bench"

[driver]
name = "simulation"

[pwm]
lines = [18, 19, 20]

[sensors]
lines = [5]

[servo]
channel = 2
"#
    )
    .unwrap();

    let config = HalCore::load_config(&path).unwrap();
    let mut core = HalCore::new(config).unwrap();
    core.init(&DriverRegistry::with_builtin()).unwrap();

    {
        let control = core.control().unwrap();
        assert_eq!(control.handle_line("servo 0").unwrap().to_string(), "ok");
        assert_eq!(control.handle_line("sensor 0").unwrap().to_string(), "0");

        let status = control.handle_line("status").unwrap().to_string();
        let value: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(value["service"], "bench");
        assert_eq!(value["sensors"], 1);
        assert_eq!(value["channels"][2]["duty_ns"], 1_000_000);
        assert_eq!(value["channels"][2]["active"], true);
    }

    core.shutdown().unwrap();
    assert!(core.control().is_err());
}
