use crate::error::{Result, SimError};
use crate::network::{MacAddress, NodeId, SeqTsHeader};
use crate::time::{Clock, SimTime};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// What a receiver learned from one arriving frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub receiver: NodeId,
    pub sender: MacAddress,
    pub sequence: u32,
    pub send_timestamp: SimTime,
    pub recv_timestamp: SimTime,
    pub mode: u16,
}

impl Observation {
    pub fn latency(&self) -> Duration {
        self.recv_timestamp - self.send_timestamp
    }
}

/// Where arrival results go. Malformed frames are reported here as errors.
pub trait ObservationSink {
    fn record(&mut self, outcome: Result<Observation>);
}

impl ObservationSink for Vec<Result<Observation>> {
    fn record(&mut self, outcome: Result<Observation>) {
        self.push(outcome);
    }
}

/// Keeps every observation of a run and logs each arrival as it happens.
#[derive(Debug, Clone, Default)]
pub struct ObservationLog {
    observations: Vec<Observation>,
    malformed: usize,
}

impl ObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }
}

impl ObservationSink for ObservationLog {
    fn record(&mut self, outcome: Result<Observation>) {
        match outcome {
            Ok(obs) => {
                info!(
                    "Received packet: receiver = {}, sender = {}, sequence = {}, sendTime = {:.6}s, recvTime = {:.6}s, protocol = 0x{:x}",
                    obs.receiver,
                    obs.sender,
                    obs.sequence,
                    obs.send_timestamp.as_secs_f64(),
                    obs.recv_timestamp.as_secs_f64(),
                    obs.mode
                );
                self.observations.push(obs);
            }
            Err(e) => {
                warn!("Dropped arriving frame: {}", e);
                self.malformed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiveValidator;

impl ReceiveValidator {
    /// Parses the sequence/timestamp header and stamps the receive time.
    /// Touches nothing but the clock.
    pub fn on_arrival(
        clock: &impl Clock,
        receiver: NodeId,
        sender: MacAddress,
        mode: u16,
        frame: &[u8],
    ) -> Result<Observation> {
        let header = SeqTsHeader::peek(frame)?;
        let recv_timestamp = clock.now();

        if recv_timestamp < header.send_timestamp {
            return Err(SimError::TimestampAhead {
                sent: header.send_timestamp,
                received: recv_timestamp,
            });
        }

        Ok(Observation {
            receiver,
            sender,
            sequence: header.sequence,
            send_timestamp: header.send_timestamp,
            recv_timestamp,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Packet, WSMP_PROTOCOL};
    use crate::time::FixedClock;

    #[test]
    fn observation_carries_both_timestamps() {
        let packet = Packet::stamp(&FixedClock(SimTime::from_secs(5)), NodeId(1), 9, 1000);
        let sender = MacAddress::for_node(NodeId(1));

        let obs = ReceiveValidator::on_arrival(
            &FixedClock(SimTime::from_millis(5_002)),
            NodeId(2),
            sender,
            WSMP_PROTOCOL,
            &packet.to_bytes(),
        )
        .unwrap();

        assert_eq!(obs.sequence, 9);
        assert_eq!(obs.sender, sender);
        assert_eq!(obs.latency(), Duration::from_millis(2));
        assert_eq!(obs.mode, 0x88DC);
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let result = ReceiveValidator::on_arrival(
            &FixedClock(SimTime::ZERO),
            NodeId(0),
            MacAddress::BROADCAST,
            WSMP_PROTOCOL,
            &[1, 2, 3],
        );
        assert!(matches!(result, Err(SimError::MalformedHeader { len: 3, .. })));
    }

    #[test]
    fn log_keeps_good_frames_and_counts_bad_ones() {
        let mut log = ObservationLog::new();
        let packet = Packet::stamp(&FixedClock(SimTime::from_secs(1)), NodeId(0), 3, 10);
        log.record(ReceiveValidator::on_arrival(
            &FixedClock(SimTime::from_secs(2)),
            NodeId(1),
            MacAddress::for_node(NodeId(0)),
            WSMP_PROTOCOL,
            &packet.to_bytes(),
        ));
        log.record(Err(SimError::MalformedHeader { len: 0, expected: 12 }));

        assert_eq!(log.observations().len(), 1);
        assert_eq!(log.observations()[0].sequence, 3);
        assert_eq!(log.malformed(), 1);
    }

    #[test]
    fn future_timestamp_is_rejected() {
        let packet = Packet::stamp(&FixedClock(SimTime::from_secs(9)), NodeId(1), 1, 0);
        let result = ReceiveValidator::on_arrival(
            &FixedClock(SimTime::from_secs(1)),
            NodeId(0),
            MacAddress::BROADCAST,
            WSMP_PROTOCOL,
            &packet.to_bytes(),
        );
        assert_eq!(
            result,
            Err(SimError::TimestampAhead {
                sent: SimTime::from_secs(9),
                received: SimTime::from_secs(1),
            })
        );
    }
}
