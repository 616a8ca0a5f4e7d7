use crate::channel::{ChannelId, SchInfo};
use crate::error::{Result, SimError};
use crate::gate::{SendOutcome, SendRequest, TransmissionGate};
use crate::metrics::MetricsCollector;
use crate::network::{Delivery, Node, NodeId, Topology, Transport};
use crate::receiver::{ObservationSink, ReceiveValidator};
use crate::scheduler::EventQueue;
use crate::time::{Clock, SimTime};
use tracing::warn;

pub type NetworkQueue<T, S> = EventQueue<WaveNetwork<T, S>>;

/// The simulated world: nodes, the medium between them, and where arrivals
/// are reported. Scheduled actions receive it mutably, one at a time.
pub struct WaveNetwork<T, S> {
    nodes: Vec<Node>,
    transport: T,
    sink: S,
    gate: TransmissionGate,
    metrics: MetricsCollector,
}

impl<T, S> WaveNetwork<T, S>
where
    T: Transport + 'static,
    S: ObservationSink + 'static,
{
    pub fn new(transport: T, sink: S, metrics: MetricsCollector) -> Self {
        Self {
            nodes: Vec::new(),
            transport,
            sink,
            gate: TransmissionGate::default(),
            metrics,
        }
    }

    pub fn with_gate(mut self, gate: TransmissionGate) -> Self {
        self.gate = gate;
        self
    }

    /// Adds one WAVE node per topology position and returns their ids.
    pub fn create_nodes(&mut self, topology: &Topology) -> Vec<NodeId> {
        topology
            .positions
            .iter()
            .map(|&position| {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(Node::wave(id, position));
                id
            })
            .collect()
    }

    /// Adds a node built elsewhere. Its id is reassigned to its table slot.
    pub fn add_node(&mut self, make: impl FnOnce(NodeId) -> Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(make(id));
        id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(SimError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(SimError::UnknownNode(id))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn start_schedule(&mut self, now: SimTime, node: NodeId, info: SchInfo) -> Result<()> {
        let access = self
            .node_mut(node)?
            .channel_access_mut()
            .ok_or(SimError::UnsupportedDevice(node))?;
        access.start_schedule(now, info)
    }

    pub fn stop_schedule(&mut self, now: SimTime, node: NodeId) -> Result<bool> {
        let access = self
            .node_mut(node)?
            .channel_access_mut()
            .ok_or(SimError::UnsupportedDevice(node))?;
        Ok(access.stop_schedule(now))
    }

    /// Channel eligibility of `node` at `now`. A node without channel access
    /// capability only ever has the control channel.
    pub fn is_channel_active(&mut self, now: SimTime, node: NodeId, channel: ChannelId) -> Result<bool> {
        match self.node_mut(node)?.channel_access_mut() {
            Some(access) => {
                access.sync(now);
                Ok(access.is_channel_active(channel))
            }
            None => Ok(channel.is_control()),
        }
    }

    /// Runs one send through the gate and turns whatever the transport
    /// accepted into arrival events.
    pub fn send(&mut self, queue: &mut NetworkQueue<T, S>, node: NodeId, request: SendRequest) -> Result<SendOutcome> {
        let now = queue.now();
        let target = self.nodes.get_mut(node.index()).ok_or(SimError::UnknownNode(node))?;
        let outcome = self.gate.send(&*queue, target, &mut self.transport, request)?;

        match &outcome {
            SendOutcome::Dispatched { accepted, .. } => self.metrics.packet_dispatched(node, *accepted, now),
            SendOutcome::Deferred { .. } => self.metrics.packet_deferred(node, now),
        }

        self.schedule_deliveries(queue);
        Ok(outcome)
    }

    fn schedule_deliveries(&mut self, queue: &mut NetworkQueue<T, S>) {
        for delivery in self.transport.drain_deliveries() {
            queue.schedule_in(delivery.delay, move |net: &mut Self, queue: &mut NetworkQueue<T, S>| {
                net.on_arrival(&*queue, delivery)
            });
        }
    }

    /// Validates an arriving frame and reports the result to the sink. A bad
    /// frame is counted and reported, never fatal.
    pub fn on_arrival(&mut self, clock: &impl Clock, delivery: Delivery) {
        let outcome = ReceiveValidator::on_arrival(
            clock,
            delivery.receiver,
            delivery.sender,
            delivery.mode,
            &delivery.frame,
        );
        match &outcome {
            Ok(obs) => self.metrics.packet_received(obs.latency(), clock.now()),
            Err(_) => self.metrics.packet_malformed(),
        }
        self.sink.record(outcome);
    }

    /// An action that sends on behalf of `node` when it fires. Failures are
    /// logged and counted; they do not stop the run.
    pub fn send_action(node: NodeId, request: SendRequest) -> impl FnOnce(&mut Self, &mut NetworkQueue<T, S>) + 'static {
        move |net: &mut Self, queue: &mut NetworkQueue<T, S>| {
            if let Err(e) = net.send(queue, node, request) {
                warn!("Send of seq {} from node {} failed at {}: {}", request.sequence, node, queue.now(), e);
                net.metrics.send_failed();
            }
        }
    }

    pub fn start_schedule_action(node: NodeId, info: SchInfo) -> impl FnOnce(&mut Self, &mut NetworkQueue<T, S>) + 'static {
        move |net: &mut Self, queue: &mut NetworkQueue<T, S>| {
            if let Err(e) = net.start_schedule(queue.now(), node, info) {
                warn!("Node {} could not start its channel schedule: {}", node, e);
                net.metrics.schedule_failed();
            }
        }
    }
}
