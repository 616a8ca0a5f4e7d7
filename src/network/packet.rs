use super::NodeId;
use crate::error::{Result, SimError};
use crate::time::{Clock, SimTime};
use serde::{Deserialize, Serialize};

/// Sequence number and send timestamp carried in front of every WSM payload.
///
/// Wire layout (big endian): `sequence: u32` then `send_timestamp: u64`
/// nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqTsHeader {
    pub sequence: u32,
    pub send_timestamp: SimTime,
}

impl SeqTsHeader {
    pub const SIZE: usize = 12;

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.send_timestamp.as_nanos().to_be_bytes());
    }

    /// Reads the header from the front of `frame` without consuming the payload.
    pub fn peek(frame: &[u8]) -> Result<Self> {
        let malformed = || SimError::MalformedHeader {
            len: frame.len(),
            expected: Self::SIZE,
        };
        let seq_bytes: [u8; 4] = frame.get(0..4).and_then(|b| b.try_into().ok()).ok_or_else(malformed)?;
        let ts_bytes: [u8; 8] = frame.get(4..12).and_then(|b| b.try_into().ok()).ok_or_else(malformed)?;

        Ok(Self {
            sequence: u32::from_be_bytes(seq_bytes),
            send_timestamp: SimTime::from_nanos(u64::from_be_bytes(ts_bytes)),
        })
    }
}

/// An outgoing WSM. Immutable once stamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    header: SeqTsHeader,
    sender: NodeId,
    payload_size: u32,
}

impl Packet {
    /// Stamps a packet with the caller's sequence number and the clock's
    /// current time. The timestamp is read here and never again, so any delay
    /// between stamping and dispatch shows up as latency at the receiver.
    pub fn stamp(clock: &impl Clock, sender: NodeId, sequence: u32, payload_size: u32) -> Self {
        Self {
            header: SeqTsHeader {
                sequence,
                send_timestamp: clock.now(),
            },
            sender,
            payload_size,
        }
    }

    pub fn header(&self) -> SeqTsHeader {
        self.header
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    pub fn send_timestamp(&self) -> SimTime {
        self.header.send_timestamp
    }

    pub fn sender(&self) -> NodeId {
        self.sender
    }

    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    /// Header plus a zero-filled payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SeqTsHeader::SIZE + self.payload_size as usize);
        self.header.write_to(&mut buf);
        buf.resize(SeqTsHeader::SIZE + self.payload_size as usize, 0);
        buf
    }
}
