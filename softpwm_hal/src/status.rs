//! Status reporting.
//!
//! Builds a JSON-serializable view of every channel, answered to the
//! `status` control command.

use crate::channel::ChannelSnapshot;
use crate::registry::ChannelRegistry;
use crate::sensor::SensorBank;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Point-in-time status of the service.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Service instance name
    pub service: String,
    /// Active line driver
    pub driver: &'static str,
    /// Capture time, microseconds since UNIX epoch
    pub timestamp_us: u64,
    /// One entry per channel, in id order
    pub channels: Vec<ChannelSnapshot>,
    /// Number of sensor lines
    pub sensors: usize,
}

impl StatusReport {
    /// Snapshot every channel. Each snapshot takes its channel's guard
    /// briefly; channels are not captured atomically as a set.
    pub fn collect(service: &str, registry: &ChannelRegistry, sensors: Option<&SensorBank>) -> Self {
        Self {
            service: service.to_string(),
            driver: registry.driver().name(),
            timestamp_us: current_timestamp_us(),
            channels: registry.iter().map(|channel| channel.snapshot()).collect(),
            sensors: sensors.map_or(0, SensorBank::len),
        }
    }

    /// Number of channels with a running waveform.
    pub fn active_count(&self) -> usize {
        self.channels.iter().filter(|c| c.active).count()
    }

    /// Compact JSON rendering.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!("{{\"error\":\"status serialization failed: {e}\"}}"))
    }
}

/// Get current timestamp in microseconds since UNIX epoch.
fn current_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;
    use crate::waveform::WaveformOptions;
    use std::sync::Arc;

    #[test]
    fn report_lists_channels_as_json() {
        let sim = Arc::new(SimulationDriver::new());
        let registry =
            ChannelRegistry::initialize(sim.clone(), &[12, 13], WaveformOptions::default()).unwrap();
        let sensors = SensorBank::initialize(sim, &[14]).unwrap();

        let report = StatusReport::collect("bench", &registry, Some(&sensors));
        assert_eq!(report.channels.len(), 2);
        assert_eq!(report.active_count(), 0);
        assert_eq!(report.sensors, 1);

        let value: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(value["service"], "bench");
        assert_eq!(value["driver"], "simulation");
        assert_eq!(value["channels"][1]["line"], 13);
        assert_eq!(value["channels"][0]["period_ns"], 20_000_000);
        assert_eq!(value["channels"][0]["active"], false);
    }
}
