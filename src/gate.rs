use crate::channel::ChannelId;
use crate::error::{Result, SimError};
use crate::network::{
    DataRate, MacAddress, Node, Packet, Transport, TxInfo, DEFAULT_TX_POWER_LEVEL, MAX_PRIORITY, WSMP_PROTOCOL,
};
use crate::time::Clock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendRequest {
    pub channel: ChannelId,
    pub priority: u8,
    pub rate: DataRate,
    pub payload_size: u32,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the transport exactly once. `accepted` is the transport's answer.
    Dispatched { packet: Packet, accepted: bool },
    /// The requested service channel was not active; nothing was sent.
    Deferred { packet: Packet },
}

impl SendOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, SendOutcome::Dispatched { .. })
    }

    pub fn packet(&self) -> &Packet {
        match self {
            SendOutcome::Dispatched { packet, .. } | SendOutcome::Deferred { packet } => packet,
        }
    }
}

/// Decides per send whether the node's channel state lets a packet out, and
/// hands eligible packets to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionGate {
    pub destination: MacAddress,
    pub protocol: u16,
    pub tx_power_level: u8,
}

impl Default for TransmissionGate {
    fn default() -> Self {
        Self {
            destination: MacAddress::BROADCAST,
            protocol: WSMP_PROTOCOL,
            tx_power_level: DEFAULT_TX_POWER_LEVEL,
        }
    }
}

impl TransmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, destination: MacAddress) -> Self {
        self.destination = destination;
        self
    }

    pub fn send<T: Transport + ?Sized>(
        &self,
        clock: &impl Clock,
        node: &mut Node,
        transport: &mut T,
        request: SendRequest,
    ) -> Result<SendOutcome> {
        if request.priority > MAX_PRIORITY {
            return Err(SimError::InvalidPriority(request.priority));
        }
        if node.channel_access().is_none() {
            return Err(SimError::UnsupportedDevice(node.id()));
        }

        let packet = Packet::stamp(clock, node.id(), request.sequence, request.payload_size);
        let tx = TxInfo {
            tx_power_level: self.tx_power_level,
            ..TxInfo::new(request.channel, request.priority, request.rate)
        };
        self.dispatch(clock, node, transport, packet, tx)
    }

    /// Sends an already stamped packet. Its timestamp is left untouched, so
    /// the time between stamping and now counts as latency.
    pub fn dispatch<T: Transport + ?Sized>(
        &self,
        clock: &impl Clock,
        node: &mut Node,
        transport: &mut T,
        packet: Packet,
        tx: TxInfo,
    ) -> Result<SendOutcome> {
        if tx.priority > MAX_PRIORITY {
            return Err(SimError::InvalidPriority(tx.priority));
        }
        let node_id = node.id();
        let access = node.channel_access_mut().ok_or(SimError::UnsupportedDevice(node_id))?;

        access.sync(clock.now());
        if !access.is_channel_active(tx.channel) {
            debug!(
                "Node {} deferred seq {} on {} (active: {})",
                node_id,
                packet.sequence(),
                tx.channel,
                access.active_channel()
            );
            return Ok(SendOutcome::Deferred { packet });
        }

        let accepted = transport.try_send(node_id, self.destination, self.protocol, tx, packet.to_bytes());
        debug!(
            "Node {} dispatched seq {} on {} at {} (prio {}, {}, accepted: {})",
            node_id,
            packet.sequence(),
            tx.channel,
            clock.now(),
            tx.priority,
            tx.rate,
            accepted
        );
        Ok(SendOutcome::Dispatched { packet, accepted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{SchInfo, ScheduleMode};
    use crate::network::{Delivery, NodeId, Position};
    use crate::time::{FixedClock, SimTime};

    #[derive(Default)]
    struct CountingTransport {
        calls: Vec<(NodeId, TxInfo, Vec<u8>)>,
    }

    impl Transport for CountingTransport {
        fn try_send(&mut self, sender: NodeId, _: MacAddress, _: u16, tx: TxInfo, frame: Vec<u8>) -> bool {
            self.calls.push((sender, tx, frame));
            true
        }

        fn drain_deliveries(&mut self) -> Vec<Delivery> {
            Vec::new()
        }
    }

    fn request(channel: ChannelId, priority: u8) -> SendRequest {
        SendRequest {
            channel,
            priority,
            rate: DataRate::Ofdm12Mbps,
            payload_size: 500,
            sequence: 1,
        }
    }

    #[test]
    fn control_channel_is_never_gated() {
        let mut node = Node::wave(NodeId(0), Position::default());
        let mut transport = CountingTransport::default();
        let outcome = TransmissionGate::new()
            .send(&FixedClock(SimTime::from_secs(1)), &mut node, &mut transport, request(ChannelId::Control, 7))
            .unwrap();

        assert!(outcome.is_dispatched());
        assert_eq!(transport.calls.len(), 1);
        assert_eq!(transport.calls[0].1.tx_power_level, DEFAULT_TX_POWER_LEVEL);
    }

    #[test]
    fn inactive_service_channel_defers_without_transport_call() {
        let mut node = Node::wave(NodeId(0), Position::default());
        let mut transport = CountingTransport::default();
        let outcome = TransmissionGate::new()
            .send(&FixedClock(SimTime::ZERO), &mut node, &mut transport, request(ChannelId::Service(1), 0))
            .unwrap();

        assert!(matches!(outcome, SendOutcome::Deferred { .. }));
        assert!(transport.calls.is_empty());
    }

    #[test]
    fn priority_out_of_range_is_rejected() {
        let mut node = Node::wave(NodeId(0), Position::default());
        let mut transport = CountingTransport::default();
        let err = TransmissionGate::new()
            .send(&FixedClock(SimTime::ZERO), &mut node, &mut transport, request(ChannelId::Control, 8))
            .unwrap_err();
        assert_eq!(err, SimError::InvalidPriority(8));
        assert!(transport.calls.is_empty());
    }

    #[test]
    fn basic_device_cannot_use_gate() {
        let mut node = Node::basic(NodeId(3), Position::default());
        let err = TransmissionGate::new()
            .send(
                &FixedClock(SimTime::ZERO),
                &mut node,
                &mut CountingTransport::default(),
                request(ChannelId::Control, 0),
            )
            .unwrap_err();
        assert_eq!(err, SimError::UnsupportedDevice(NodeId(3)));
    }

    #[test]
    fn gate_syncs_channel_state_before_checking() {
        let mut node = Node::wave(NodeId(0), Position::default());
        node.channel_access_mut()
            .unwrap()
            .start_schedule(SimTime::ZERO, SchInfo::new(ChannelId::Service(1), false, ScheduleMode::Alternating))
            .unwrap();
        let mut transport = CountingTransport::default();
        let gate = TransmissionGate::new();

        let in_sch = gate
            .send(&FixedClock(SimTime::from_millis(60)), &mut node, &mut transport, request(ChannelId::Service(1), 3))
            .unwrap();
        let in_cch = gate
            .send(&FixedClock(SimTime::from_millis(110)), &mut node, &mut transport, request(ChannelId::Service(1), 3))
            .unwrap();

        assert!(in_sch.is_dispatched());
        assert!(!in_cch.is_dispatched());
        assert_eq!(transport.calls.len(), 1);
    }
}
