use super::{MacAddress, NodeId, Topology, TxInfo};
use std::time::Duration;
use tracing::debug;

const SPEED_OF_LIGHT_M_PER_S: f64 = 299_792_458.0;

/// A frame the transport has committed to deliver after `delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub receiver: NodeId,
    pub sender: MacAddress,
    pub mode: u16,
    pub frame: Vec<u8>,
    pub delay: Duration,
}

/// The radio medium, seen from the simulation core.
///
/// Acceptance of a frame implies that every delivery it produces is handed
/// back through [`Transport::drain_deliveries`], which the driver turns into
/// arrival events.
pub trait Transport {
    fn try_send(
        &mut self,
        sender: NodeId,
        destination: MacAddress,
        protocol: u16,
        tx: TxInfo,
        frame: Vec<u8>,
    ) -> bool;

    fn drain_deliveries(&mut self) -> Vec<Delivery>;
}

/// Lossless shared medium: every accepted frame reaches each addressed node
/// after its airtime at the selected rate plus line-of-sight propagation.
#[derive(Debug, Clone)]
pub struct BroadcastMedium {
    topology: Topology,
    pending: Vec<Delivery>,
    frames_accepted: u64,
}

impl BroadcastMedium {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            pending: Vec::new(),
            frames_accepted: 0,
        }
    }

    pub fn frames_accepted(&self) -> u64 {
        self.frames_accepted
    }

    fn airtime(tx: &TxInfo, frame_len: usize) -> Duration {
        let bits = frame_len as f64 * 8.0;
        Duration::from_secs_f64(bits / tx.rate.bits_per_second() as f64)
    }
}

impl Transport for BroadcastMedium {
    fn try_send(
        &mut self,
        sender: NodeId,
        destination: MacAddress,
        protocol: u16,
        tx: TxInfo,
        frame: Vec<u8>,
    ) -> bool {
        let Some(origin) = self.topology.position(sender) else {
            return false;
        };

        let airtime = Self::airtime(&tx, frame.len());
        let sender_addr = MacAddress::for_node(sender);

        let receivers: Vec<NodeId> = (0..self.topology.len() as u32)
            .map(NodeId)
            .filter(|&id| id != sender)
            .filter(|&id| destination.is_broadcast() || MacAddress::for_node(id) == destination)
            .collect();

        for receiver in receivers {
            let distance = self
                .topology
                .position(receiver)
                .map(|p| origin.distance_to(&p))
                .unwrap_or(0.0);
            let propagation = Duration::from_secs_f64(distance / SPEED_OF_LIGHT_M_PER_S);

            self.pending.push(Delivery {
                receiver,
                sender: sender_addr,
                mode: protocol,
                frame: frame.clone(),
                delay: airtime + propagation,
            });
        }

        self.frames_accepted += 1;
        debug!(
            "Medium accepted {} bytes from node {} on {} ({} receivers pending)",
            frame.len(),
            sender,
            tx.channel,
            self.pending.len()
        );
        true
    }

    fn drain_deliveries(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.pending)
    }
}
