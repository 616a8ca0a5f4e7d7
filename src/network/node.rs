use super::{MacAddress, NodeId};
use crate::channel::ChannelAccessState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Capability set of a node's radio, fixed when the node is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Device {
    /// Multi-channel WAVE radio: channel access and transport.
    Wave { access: ChannelAccessState },
    /// Single-channel radio: transport only.
    Basic,
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: Position,
    device: Device,
}

impl Node {
    pub fn wave(id: NodeId, position: Position) -> Self {
        Self {
            id,
            position,
            device: Device::Wave {
                access: ChannelAccessState::new(id),
            },
        }
    }

    pub fn basic(id: NodeId, position: Position) -> Self {
        Self {
            id,
            position,
            device: Device::Basic,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn address(&self) -> MacAddress {
        MacAddress::for_node(self.id)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Written by the topology collaborator only.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn channel_access(&self) -> Option<&ChannelAccessState> {
        match &self.device {
            Device::Wave { access } => Some(access),
            Device::Basic => None,
        }
    }

    pub fn channel_access_mut(&mut self) -> Option<&mut ChannelAccessState> {
        match &mut self.device {
            Device::Wave { access } => Some(access),
            Device::Basic => None,
        }
    }
}

/// Node count and initial placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub positions: Vec<Position>,
}

impl Topology {
    /// Places `n` nodes uniformly at random inside `[0, width] x [0, height]`.
    pub fn random(n: u32, width: f64, height: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..n)
            .map(|_| Position::new(rng.gen_range(0.0..=width), rng.gen_range(0.0..=height)))
            .collect();
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.positions.get(id.index()).copied()
    }
}
