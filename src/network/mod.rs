pub mod node;
pub mod packet;
pub mod transport;

pub use node::{Device, Node, Position, Topology};
pub use packet::{Packet, SeqTsHeader};
pub use transport::{BroadcastMedium, Delivery, Transport};

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WSM frames are carried with this EtherType.
pub const WSMP_PROTOCOL: u16 = 0x88DC;

/// Default transmit power level for WSMP sends.
pub const DEFAULT_TX_POWER_LEVEL: u8 = 8;

pub const MAX_PRIORITY: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index into the node table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    /// Node `n` gets `00:00:00:00:00:(n+1)`, mirroring sequential allocation.
    pub fn for_node(id: NodeId) -> Self {
        let raw = (u64::from(id.0) + 1).to_be_bytes();
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&raw[2..]);
        Self(octets)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// OFDM modes of a 10 MHz channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRate {
    #[serde(rename = "OfdmRate3MbpsBW10MHz")]
    Ofdm3Mbps,
    #[serde(rename = "OfdmRate4_5MbpsBW10MHz")]
    Ofdm4_5Mbps,
    #[serde(rename = "OfdmRate6MbpsBW10MHz")]
    Ofdm6Mbps,
    #[serde(rename = "OfdmRate9MbpsBW10MHz")]
    Ofdm9Mbps,
    #[serde(rename = "OfdmRate12MbpsBW10MHz")]
    Ofdm12Mbps,
    #[serde(rename = "OfdmRate18MbpsBW10MHz")]
    Ofdm18Mbps,
    #[serde(rename = "OfdmRate24MbpsBW10MHz")]
    Ofdm24Mbps,
    #[serde(rename = "OfdmRate27MbpsBW10MHz")]
    Ofdm27Mbps,
}

impl DataRate {
    pub const ALL: [DataRate; 8] = [
        DataRate::Ofdm3Mbps,
        DataRate::Ofdm4_5Mbps,
        DataRate::Ofdm6Mbps,
        DataRate::Ofdm9Mbps,
        DataRate::Ofdm12Mbps,
        DataRate::Ofdm18Mbps,
        DataRate::Ofdm24Mbps,
        DataRate::Ofdm27Mbps,
    ];

    pub fn bits_per_second(self) -> u64 {
        match self {
            DataRate::Ofdm3Mbps => 3_000_000,
            DataRate::Ofdm4_5Mbps => 4_500_000,
            DataRate::Ofdm6Mbps => 6_000_000,
            DataRate::Ofdm9Mbps => 9_000_000,
            DataRate::Ofdm12Mbps => 12_000_000,
            DataRate::Ofdm18Mbps => 18_000_000,
            DataRate::Ofdm24Mbps => 24_000_000,
            DataRate::Ofdm27Mbps => 27_000_000,
        }
    }

    pub fn mode_name(self) -> &'static str {
        match self {
            DataRate::Ofdm3Mbps => "OfdmRate3MbpsBW10MHz",
            DataRate::Ofdm4_5Mbps => "OfdmRate4_5MbpsBW10MHz",
            DataRate::Ofdm6Mbps => "OfdmRate6MbpsBW10MHz",
            DataRate::Ofdm9Mbps => "OfdmRate9MbpsBW10MHz",
            DataRate::Ofdm12Mbps => "OfdmRate12MbpsBW10MHz",
            DataRate::Ofdm18Mbps => "OfdmRate18MbpsBW10MHz",
            DataRate::Ofdm24Mbps => "OfdmRate24MbpsBW10MHz",
            DataRate::Ofdm27Mbps => "OfdmRate27MbpsBW10MHz",
        }
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode_name())
    }
}

impl FromStr for DataRate {
    type Err = String;

    /// Accepts the full mode name or the bare rate, e.g. `12` or `4.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        DataRate::ALL
            .into_iter()
            .find(|rate| {
                rate.mode_name().eq_ignore_ascii_case(s)
                    || (rate.bits_per_second() as f64 / 1e6).to_string() == s
            })
            .ok_or_else(|| format!("Unknown data rate: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preamble {
    #[default]
    Long,
    Short,
}

/// Per-packet transmit parameters handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    pub channel: ChannelId,
    pub priority: u8,
    pub rate: DataRate,
    pub preamble: Preamble,
    pub tx_power_level: u8,
}

impl TxInfo {
    pub fn new(channel: ChannelId, priority: u8, rate: DataRate) -> Self {
        Self {
            channel,
            priority,
            rate,
            preamble: Preamble::Long,
            tx_power_level: DEFAULT_TX_POWER_LEVEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_addresses_are_sequential() {
        assert_eq!(MacAddress::for_node(NodeId(0)).to_string(), "00:00:00:00:00:01");
        assert_eq!(MacAddress::for_node(NodeId(255)).to_string(), "00:00:00:00:01:00");
        assert!(MacAddress::BROADCAST.is_broadcast());
    }

    #[test]
    fn rates_parse_from_mode_name_or_number() {
        assert_eq!("OfdmRate27MbpsBW10MHz".parse::<DataRate>(), Ok(DataRate::Ofdm27Mbps));
        assert_eq!("4.5".parse::<DataRate>(), Ok(DataRate::Ofdm4_5Mbps));
        assert_eq!("6".parse::<DataRate>(), Ok(DataRate::Ofdm6Mbps));
        assert!("11".parse::<DataRate>().is_err());
    }
}
