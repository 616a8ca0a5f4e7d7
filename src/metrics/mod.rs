pub mod logger;

use crate::network::NodeId;
use crate::time::SimTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub sim_time_s: f64,
    pub dispatch_attempts: u64,
    pub dispatched: u64,
    pub rejected: u64,
    pub deferred: u64,
    pub send_errors: u64,
    pub schedule_errors: u64,
    pub received: u64,
    pub malformed: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub attempts_per_node: BTreeMap<u32, u64>,
}

/// Shared counters for one run. Cheap to clone; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    dispatched: u64,
    rejected: u64,
    deferred: u64,
    send_errors: u64,
    schedule_errors: u64,
    received: u64,
    malformed: u64,
    total_latency_ms: f64,
    max_latency_ms: f64,
    latency_samples: u64,
    attempts_per_node: BTreeMap<u32, u64>,
    last_event: SimTime,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn attempt(inner: &mut MetricsInner, node: NodeId, now: SimTime) {
        *inner.attempts_per_node.entry(node.0).or_default() += 1;
        inner.last_event = inner.last_event.max(now);
    }

    pub fn packet_dispatched(&self, node: NodeId, accepted: bool, now: SimTime) {
        let mut inner = self.inner.write();
        Self::attempt(&mut inner, node, now);
        if accepted {
            inner.dispatched += 1;
        } else {
            inner.rejected += 1;
        }
    }

    pub fn packet_deferred(&self, node: NodeId, now: SimTime) {
        let mut inner = self.inner.write();
        Self::attempt(&mut inner, node, now);
        inner.deferred += 1;
    }

    pub fn send_failed(&self) {
        self.inner.write().send_errors += 1;
    }

    pub fn schedule_failed(&self) {
        self.inner.write().schedule_errors += 1;
    }

    pub fn packet_received(&self, latency: Duration, now: SimTime) {
        let mut inner = self.inner.write();
        inner.received += 1;
        inner.last_event = inner.last_event.max(now);

        let latency_ms = latency.as_secs_f64() * 1000.0;
        inner.total_latency_ms += latency_ms;
        inner.max_latency_ms = inner.max_latency_ms.max(latency_ms);
        inner.latency_samples += 1;
    }

    pub fn packet_malformed(&self) {
        let mut inner = self.inner.write();
        inner.malformed += 1;
        if inner.malformed == 1 {
            warn!("First malformed frame seen; the run continues");
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();

        let avg_latency_ms = if inner.latency_samples > 0 {
            inner.total_latency_ms / inner.latency_samples as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            sim_time_s: inner.last_event.as_secs_f64(),
            dispatch_attempts: inner.attempts_per_node.values().sum(),
            dispatched: inner.dispatched,
            rejected: inner.rejected,
            deferred: inner.deferred,
            send_errors: inner.send_errors,
            schedule_errors: inner.schedule_errors,
            received: inner.received,
            malformed: inner.malformed,
            avg_latency_ms,
            max_latency_ms: inner.max_latency_ms,
            attempts_per_node: inner.attempts_per_node.clone(),
        }
    }
}

/// Averages snapshots of repeated runs. Per-node attempts are summed.
pub fn average(snapshots: &[MetricsSnapshot]) -> MetricsSnapshot {
    let Some(first) = snapshots.first() else {
        return MetricsSnapshot::default();
    };
    let n = snapshots.len() as f64;
    let mean_u64 = |f: fn(&MetricsSnapshot) -> u64| (snapshots.iter().map(f).sum::<u64>() as f64 / n).round() as u64;

    let mut attempts_per_node = BTreeMap::new();
    for snapshot in snapshots {
        for (node, count) in &snapshot.attempts_per_node {
            *attempts_per_node.entry(*node).or_default() += count;
        }
    }

    MetricsSnapshot {
        sim_time_s: first.sim_time_s,
        dispatch_attempts: mean_u64(|s| s.dispatch_attempts),
        dispatched: mean_u64(|s| s.dispatched),
        rejected: mean_u64(|s| s.rejected),
        deferred: mean_u64(|s| s.deferred),
        send_errors: mean_u64(|s| s.send_errors),
        schedule_errors: mean_u64(|s| s.schedule_errors),
        received: mean_u64(|s| s.received),
        malformed: mean_u64(|s| s.malformed),
        avg_latency_ms: snapshots.iter().map(|s| s.avg_latency_ms).sum::<f64>() / n,
        max_latency_ms: snapshots.iter().map(|s| s.max_latency_ms).fold(0.0, f64::max),
        attempts_per_node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_attempts_per_node() {
        let metrics = MetricsCollector::new();
        metrics.packet_dispatched(NodeId(0), true, SimTime::from_secs(5));
        metrics.packet_deferred(NodeId(0), SimTime::from_secs(10));
        metrics.packet_dispatched(NodeId(1), false, SimTime::from_secs(10));
        metrics.packet_received(Duration::from_millis(2), SimTime::from_secs(11));
        metrics.packet_received(Duration::from_millis(4), SimTime::from_secs(11));

        let snapshot = metrics.clone().snapshot();
        assert_eq!(snapshot.dispatch_attempts, 3);
        assert_eq!(snapshot.attempts_per_node[&0u32], 2);
        assert_eq!(snapshot.rejected, 1);
        assert!((snapshot.avg_latency_ms - 3.0).abs() < 1e-9);
        assert_eq!(snapshot.max_latency_ms, 4.0);
        assert_eq!(snapshot.sim_time_s, 11.0);
    }

    #[test]
    fn average_of_nothing_is_default() {
        assert_eq!(average(&[]), MetricsSnapshot::default());
    }
}
