use crate::channel::{ChannelId, ScheduleMode};
use crate::error::{Result, SimError};
use crate::network::{DataRate, MAX_PRIORITY};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single control-channel send made before the service schedule traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlProbe {
    pub at_s: f64,
    pub node: u32,
    pub sequence: u32,
    pub priority: u8,
    pub rate: DataRate,
    pub payload_size: u32,
}

impl Default for ControlProbe {
    fn default() -> Self {
        Self {
            at_s: 1.0,
            node: 0,
            sequence: 1,
            priority: 7,
            rate: DataRate::Ofdm12Mbps,
            payload_size: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub num_nodes: u32,
    pub seed: u64,
    pub area_width_m: f64,
    pub area_height_m: f64,
    pub stop_at_s: f64,
    pub schedule_start_s: f64,
    pub service_channel: ChannelId,
    pub immediate_switch: bool,
    pub mode: ScheduleMode,
    /// Every node sends once at each of these instants.
    pub send_times_s: Vec<f64>,
    /// Indexed by node.
    pub priorities: Vec<u8>,
    /// Indexed by node.
    pub rates: Vec<DataRate>,
    pub payload_size: u32,
    /// Sequence of the first service-channel send; later sends count up in
    /// (time, node) order.
    pub first_sequence: u32,
    pub control_probe: Option<ControlProbe>,
    pub results_dir: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "wsmp".to_string(),
            num_nodes: 3,
            seed: 1,
            area_width_m: 20.0,
            area_height_m: 20.0,
            stop_at_s: 20.0,
            schedule_start_s: 0.0,
            service_channel: ChannelId::Service(1),
            immediate_switch: false,
            mode: ScheduleMode::ExtendedAlternating,
            send_times_s: vec![5.0, 10.0, 15.0, 20.0],
            priorities: vec![0, 5, 7],
            rates: vec![DataRate::Ofdm27Mbps, DataRate::Ofdm9Mbps, DataRate::Ofdm6Mbps],
            payload_size: 1000,
            first_sequence: 2,
            control_probe: Some(ControlProbe::default()),
            results_dir: "results".to_string(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_mode(mut self, mode: ScheduleMode, immediate_switch: bool) -> Self {
        self.mode = mode;
        self.immediate_switch = immediate_switch;
        self
    }

    pub fn with_send_times(mut self, times: Vec<f64>) -> Self {
        self.send_times_s = times;
        self
    }

    pub fn without_control_probe(mut self) -> Self {
        self.control_probe = None;
        self
    }

    /// Number of service-channel sends the scenario schedules.
    pub fn total_sends(&self) -> usize {
        self.send_times_s.len() * self.num_nodes as usize
    }

    /// Sequence number for the send of `node` at the `round`-th send time.
    pub fn sequence_for(&self, round: usize, node: u32) -> u32 {
        self.first_sequence + (round * self.num_nodes as usize) as u32 + node
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));
        let nodes = self.num_nodes as usize;

        if nodes == 0 {
            return invalid("num_nodes must be at least 1".into());
        }
        if self.priorities.len() < nodes {
            return invalid(format!("{} priorities for {} nodes", self.priorities.len(), nodes));
        }
        if self.rates.len() < nodes {
            return invalid(format!("{} rates for {} nodes", self.rates.len(), nodes));
        }
        if let Some(p) = self.priorities.iter().find(|&&p| p > MAX_PRIORITY) {
            return invalid(format!("priority {} out of range 0..={}", p, MAX_PRIORITY));
        }
        if self.service_channel.is_control() || !self.service_channel.is_valid() {
            return invalid(format!("{} is not a service channel", self.service_channel));
        }
        let bad_time = |t: &f64| !t.is_finite() || *t < 0.0;
        if bad_time(&self.stop_at_s) || bad_time(&self.schedule_start_s) {
            return invalid("stop and schedule start times must be finite and non-negative".into());
        }
        if let Some(t) = self.send_times_s.iter().find(|t| bad_time(t)) {
            return invalid(format!("send time {} must be finite and non-negative", t));
        }
        if !(self.area_width_m >= 0.0 && self.area_height_m >= 0.0) {
            return invalid("area bounds must be non-negative".into());
        }
        let last_sequence = u64::from(self.first_sequence) + self.total_sends() as u64;
        if last_sequence > u64::from(u32::MAX) {
            return invalid("sequence numbers would overflow 32 bits".into());
        }
        if let Some(probe) = &self.control_probe {
            if probe.node >= self.num_nodes {
                return invalid(format!("control probe node {} does not exist", probe.node));
            }
            if probe.priority > MAX_PRIORITY || bad_time(&probe.at_s) {
                return invalid("control probe priority or time out of range".into());
            }
        }
        Ok(())
    }
}
