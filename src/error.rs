use crate::channel::ChannelId;
use crate::network::NodeId;
use crate::time::SimTime;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Invalid delay: {0} (must be finite and non-negative)")]
    InvalidDelay(f64),

    #[error("Schedule conflict: node {0} already runs a channel schedule")]
    ScheduleConflict(NodeId),

    #[error("Invalid channel: {0} cannot carry a channel schedule")]
    InvalidChannel(ChannelId),

    #[error("Invalid priority: {0} (expected 0..=7)")]
    InvalidPriority(u8),

    #[error("Malformed header: frame of {len} bytes, need at least {expected}")]
    MalformedHeader { len: usize, expected: usize },

    #[error("Frame stamped at {sent} arrived at {received}, before it was sent")]
    TimestampAhead { sent: SimTime, received: SimTime },

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} has no channel access capability")]
    UnsupportedDevice(NodeId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
