use std::collections::BTreeSet;
use std::time::Duration;
use tempfile::tempdir;
use wavesim::network::{Position, TxInfo};
use wavesim::prelude::*;
use wavesim::time::FixedClock;

fn quiet_scenario() -> ScenarioConfig {
    ScenarioConfig::default().without_control_probe()
}

#[test]
fn default_scenario_dispatches_every_send() {
    let config = quiet_scenario();
    let mut sim = Simulation::new(config.clone());
    let report = sim.run().unwrap();

    let m = &report.metrics;
    assert_eq!(m.dispatch_attempts, 12);
    assert_eq!(m.dispatched, 12);
    assert_eq!(m.deferred, 0);
    assert_eq!(m.send_errors, 0);
    for node in 0u32..3 {
        assert_eq!(m.attempts_per_node[&node], 4);
    }

    // Arrivals of the 20 s round fall past the stop bound and are discarded.
    assert_eq!(report.observations.len(), 9 * 2);
    assert_eq!(report.discarded_events, 3 * 2);
    assert_eq!(report.malformed_frames, 0);
    assert!((report.end_time_s - 20.0).abs() < 1e-9);

    let expected: BTreeSet<u32> = (0..3)
        .flat_map(|round| (0..3).map(move |node| (round, node)))
        .map(|(round, node)| config.sequence_for(round, node))
        .collect();
    let seen: BTreeSet<u32> = report.observations.iter().map(|o| o.sequence).collect();
    assert_eq!(seen, expected);

    for obs in &report.observations {
        assert!(obs.recv_timestamp >= obs.send_timestamp);
        assert_ne!(obs.sender, MacAddress::for_node(obs.receiver));
        assert!(obs.latency() < Duration::from_millis(10));
    }
}

#[test]
fn sequences_start_at_two_and_are_unique() {
    let config = quiet_scenario();
    let all: Vec<u32> = (0..4)
        .flat_map(|round| (0..3).map(move |node| (round, node)))
        .map(|(round, node)| config.sequence_for(round, node))
        .collect();
    assert_eq!(all, (2..14).collect::<Vec<_>>());
}

#[test]
fn control_probe_is_observed_with_sequence_one() {
    let report = Simulation::new(ScenarioConfig::default()).run().unwrap();
    let probes: Vec<&Observation> = report.observations.iter().filter(|o| o.sequence == 1).collect();

    assert_eq!(probes.len(), 2);
    for obs in probes {
        assert_eq!(obs.send_timestamp, SimTime::from_secs(1));
        assert_eq!(obs.sender, MacAddress::for_node(NodeId(0)));
    }
    assert_eq!(report.metrics.dispatch_attempts, 13);
}

#[test]
fn alternating_schedule_defers_sends_on_cch_boundaries() {
    let config = quiet_scenario().with_mode(ScheduleMode::Alternating, false);
    let report = Simulation::new(config).run().unwrap();

    assert_eq!(report.metrics.dispatch_attempts, 12);
    assert_eq!(report.metrics.deferred, 12);
    assert_eq!(report.metrics.dispatched, 0);
    assert!(report.observations.is_empty());
}

#[test]
fn alternating_schedule_dispatches_inside_sch_intervals() {
    let config = quiet_scenario()
        .with_mode(ScheduleMode::Alternating, false)
        .with_send_times(vec![5.06, 10.07, 15.08]);
    let report = Simulation::new(config).run().unwrap();

    assert_eq!(report.metrics.dispatched, 9);
    assert_eq!(report.observations.len(), 18);
}

#[test]
fn seeded_runs_are_reproducible() {
    let a = Simulation::new(quiet_scenario().with_seed(7)).run().unwrap();
    let b = Simulation::new(quiet_scenario().with_seed(7)).run().unwrap();
    assert_eq!(a.observations, b.observations);
}

#[test]
fn rerunning_a_simulation_reports_only_its_own_run() {
    let mut sim = Simulation::new(quiet_scenario());
    let first = sim.run().unwrap();
    let second = sim.run().unwrap();

    assert_eq!(second.metrics.dispatch_attempts, 12);
    assert_eq!(second.metrics.received, second.observations.len() as u64);
    assert_eq!(second.metrics, first.metrics);
    assert_eq!(sim.metrics.snapshot(), second.metrics);
}

#[test]
fn negative_send_time_is_rejected_before_running() {
    let config = quiet_scenario().with_send_times(vec![5.0, -1.0]);
    let err = Simulation::new(config).run().unwrap_err();
    assert!(matches!(err, SimError::InvalidConfig(_)));
}

#[test]
fn stamped_packet_keeps_its_timestamp_until_dispatch() {
    let topology = Topology {
        positions: vec![Position::new(0.0, 0.0), Position::new(30.0, 40.0)],
    };
    let mut medium = BroadcastMedium::new(topology);
    let mut node = Node::wave(NodeId(0), Position::new(0.0, 0.0));
    let info = SchInfo::new(ChannelId::Service(2), false, ScheduleMode::Immediate);
    node.channel_access_mut().unwrap().start_schedule(SimTime::ZERO, info).unwrap();

    let stamped_at = SimTime::from_secs(1);
    let packet = Packet::stamp(&FixedClock(stamped_at), node.id(), 42, 200);

    let sent_at = FixedClock(SimTime::from_secs(3));
    let tx = TxInfo::new(ChannelId::Service(2), 3, DataRate::Ofdm6Mbps);
    let outcome = TransmissionGate::new()
        .dispatch(&sent_at, &mut node, &mut medium, packet, tx)
        .unwrap();
    assert!(outcome.is_dispatched());
    assert_eq!(outcome.packet().send_timestamp(), stamped_at);

    let deliveries = medium.drain_deliveries();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];

    let arrival = FixedClock(sent_at.0 + delivery.delay);
    let obs = ReceiveValidator::on_arrival(&arrival, delivery.receiver, delivery.sender, delivery.mode, &delivery.frame)
        .unwrap();
    assert_eq!(obs.sequence, 42);
    assert_eq!(obs.send_timestamp, stamped_at);
    assert!(obs.latency() > Duration::from_secs(2));
}

#[test]
fn scenario_config_round_trips_through_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenario.json");
    let config = quiet_scenario()
        .with_seed(99)
        .with_mode(ScheduleMode::Immediate, true);
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = ScenarioConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.seed, 99);
    assert_eq!(loaded.mode, ScheduleMode::Immediate);
    assert!(loaded.immediate_switch);
    assert!(loaded.control_probe.is_none());
    assert_eq!(loaded.send_times_s, config.send_times_s);
}

#[test]
fn partial_json_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{ "num_nodes": 2, "stop_at_s": 12.5 }"#).unwrap();

    let loaded = ScenarioConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.num_nodes, 2);
    assert_eq!(loaded.stop_at_s, 12.5);
    assert_eq!(loaded.service_channel, ChannelId::Service(1));
    assert!(loaded.validate().is_ok());
}

#[test]
fn results_are_written_as_csv_and_json() {
    let dir = tempdir().unwrap();
    let mut config = quiet_scenario();
    config.results_dir = dir.path().to_string_lossy().into_owned();

    let mut sim = Simulation::new(config);
    let report = sim.run().unwrap();
    let paths = sim.save_results(&report).unwrap();
    assert_eq!(paths.len(), 2);

    let records = wavesim::metrics::logger::read_records(&paths[0]).unwrap();
    assert_eq!(records.len(), report.observations.len());
    assert!(records.iter().all(|r| r.latency_ms >= 0.0));

    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&paths[1]).unwrap()).unwrap();
    assert_eq!(summary["metrics"]["dispatched"], 12);
    assert_eq!(summary["seed"], 1);
}
