pub mod config;
pub mod network;

pub use config::{ControlProbe, ScenarioConfig};
pub use network::{NetworkQueue, WaveNetwork};

use crate::channel::{ChannelId, SchInfo};
use crate::error::Result;
use crate::gate::SendRequest;
use crate::metrics::logger::ObservationLogger;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::network::{BroadcastMedium, NodeId, Topology};
use crate::receiver::{Observation, ObservationLog};
use crate::scheduler::{EventQueue, RunSummary};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

type ScenarioNetwork = WaveNetwork<BroadcastMedium, ObservationLog>;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub name: String,
    pub seed: u64,
    pub events_fired: u64,
    pub end_time_s: f64,
    /// Events still pending at the stop bound, discarded at teardown.
    pub discarded_events: usize,
    pub malformed_frames: usize,
    pub metrics: MetricsSnapshot,
    #[serde(skip)]
    pub observations: Vec<Observation>,
}

pub struct Simulation {
    config: ScenarioConfig,
    pub metrics: MetricsCollector,
}

impl Simulation {
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            config,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Builds the nodes, schedules the scenario, runs it to the stop bound and
    /// tears the queue down.
    /// Every call starts from fresh metrics, so repeated runs report the same
    /// counts as a single one.
    pub fn run(&mut self) -> Result<SimulationReport> {
        self.config.validate()?;
        self.metrics = MetricsCollector::new();
        let config = &self.config;

        info!("Starting simulation: {}", config.name);
        info!(
            "Nodes: {}, schedule: {} on {} (immediate switch: {})",
            config.num_nodes, config.mode, config.service_channel, config.immediate_switch
        );
        info!("Stop at: {:.3}s, seed: {}", config.stop_at_s, config.seed);

        let topology = Topology::random(config.num_nodes, config.area_width_m, config.area_height_m, config.seed);
        let mut network = WaveNetwork::new(
            BroadcastMedium::new(topology.clone()),
            ObservationLog::new(),
            self.metrics.clone(),
        );
        let nodes = network.create_nodes(&topology);

        let mut queue = EventQueue::new();
        self.populate(&mut queue, &nodes)?;
        queue.stop(config.stop_at_s)?;

        let summary: RunSummary = queue.run(&mut network);
        let discarded_events = queue.clear();

        let log = network.into_sink();
        let report = SimulationReport {
            name: config.name.clone(),
            seed: config.seed,
            events_fired: summary.events_fired,
            end_time_s: summary.end_time.as_secs_f64(),
            discarded_events,
            malformed_frames: log.malformed(),
            metrics: self.metrics.snapshot(),
            observations: log.into_observations(),
        };

        info!(
            "Simulation finished at {:.3}s: {} events, {} observations, {} discarded",
            report.end_time_s,
            report.events_fired,
            report.observations.len(),
            report.discarded_events
        );
        Ok(report)
    }

    fn populate(&self, queue: &mut EventQueue<ScenarioNetwork>, nodes: &[NodeId]) -> Result<()> {
        let config = &self.config;

        if let Some(probe) = &config.control_probe {
            let request = SendRequest {
                channel: ChannelId::Control,
                priority: probe.priority,
                rate: probe.rate,
                payload_size: probe.payload_size,
                sequence: probe.sequence,
            };
            queue.schedule(probe.at_s, ScenarioNetwork::send_action(NodeId(probe.node), request))?;
        }

        let info = SchInfo::new(config.service_channel, config.immediate_switch, config.mode);
        for &node in nodes {
            queue.schedule(config.schedule_start_s, ScenarioNetwork::start_schedule_action(node, info))?;
        }

        for (round, &at) in config.send_times_s.iter().enumerate() {
            for &node in nodes {
                let request = SendRequest {
                    channel: config.service_channel,
                    priority: config.priorities[node.index()],
                    rate: config.rates[node.index()],
                    payload_size: config.payload_size,
                    sequence: config.sequence_for(round, node.0),
                };
                queue.schedule(at, ScenarioNetwork::send_action(node, request))?;
            }
        }
        Ok(())
    }

    /// Writes the observation log as CSV and the report as JSON under the
    /// configured results directory. Returns the paths written.
    pub fn save_results(&self, report: &SimulationReport) -> anyhow::Result<Vec<PathBuf>> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = PathBuf::from(&self.config.results_dir);
        std::fs::create_dir_all(&dir)?;

        let csv_path = dir.join(format!("{}_{}_observations.csv", self.config.name, timestamp));
        let mut logger = ObservationLogger::new(&csv_path)?;
        logger.log_batch(&report.observations)?;
        info!("Observations saved to: {}", csv_path.display());

        let json_path = dir.join(format!("{}_{}_summary.json", self.config.name, timestamp));
        std::fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
        info!("Summary saved to: {}", json_path.display());

        info!("Dispatched: {}, deferred: {}", report.metrics.dispatched, report.metrics.deferred);
        info!("Avg latency: {:.3} ms", report.metrics.avg_latency_ms);

        Ok(vec![csv_path, json_path])
    }
}

