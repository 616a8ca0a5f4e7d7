pub mod channel;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod network;
pub mod receiver;
pub mod scheduler;
pub mod simulation;
pub mod time;

pub use error::{Result, SimError};
pub use metrics::MetricsCollector;
pub use scheduler::EventQueue;
pub use simulation::{ScenarioConfig, Simulation};

pub mod prelude {
    pub use crate::channel::{ChannelAccessState, ChannelId, SchInfo, ScheduleMode};
    pub use crate::error::{Result, SimError};
    pub use crate::gate::{SendOutcome, SendRequest, TransmissionGate};
    pub use crate::metrics::MetricsSnapshot;
    pub use crate::network::{BroadcastMedium, DataRate, MacAddress, Node, NodeId, Packet, Topology, Transport};
    pub use crate::receiver::{Observation, ObservationLog, ObservationSink, ReceiveValidator};
    pub use crate::scheduler::{EventHandle, EventQueue};
    pub use crate::simulation::{ScenarioConfig, Simulation, WaveNetwork};
    pub use crate::time::{Clock, SimTime};
}
