//! Multi-channel alternating access (IEEE 1609.4 style).
//!
//! Time is cut into sync intervals aligned to simulated zero. Each sync
//! interval starts with a control channel (CCH) interval followed by a service
//! channel (SCH) interval. A node's [`ChannelAccessState`] decides which
//! logical channel is active at any instant.

pub mod access;

pub use access::ChannelAccessState;

use crate::error::SimError;
use crate::time::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const CCH_NUMBER: u16 = 178;
pub const SCH_NUMBERS: [u16; 6] = [172, 174, 176, 180, 182, 184];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    Control,
    /// Service channel `k`, 1-based (SCH1..SCH6).
    Service(u8),
}

impl ChannelId {
    pub fn is_control(self) -> bool {
        matches!(self, ChannelId::Control)
    }

    /// The 802.11p channel number, or `None` for an out-of-range service index.
    pub fn number(self) -> Option<u16> {
        match self {
            ChannelId::Control => Some(CCH_NUMBER),
            ChannelId::Service(k) => SCH_NUMBERS.get((k as usize).checked_sub(1)?).copied(),
        }
    }

    pub fn is_valid(self) -> bool {
        self.number().is_some()
    }

    pub fn from_number(number: u16) -> Option<Self> {
        if number == CCH_NUMBER {
            return Some(ChannelId::Control);
        }
        SCH_NUMBERS
            .iter()
            .position(|&n| n == number)
            .map(|i| ChannelId::Service(i as u8 + 1))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Control => write!(f, "CCH"),
            ChannelId::Service(k) => write!(f, "SCH{}", k),
        }
    }
}

impl FromStr for ChannelId {
    type Err = String;

    /// `CCH`, `SCH1`..`SCH6` or a channel number such as `172`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let parsed = if upper == "CCH" {
            Some(ChannelId::Control)
        } else if let Some(k) = upper.strip_prefix("SCH") {
            k.parse::<u8>().ok().map(ChannelId::Service).filter(|c| c.is_valid())
        } else {
            upper.parse::<u16>().ok().and_then(ChannelId::from_number)
        };
        parsed.ok_or_else(|| format!("Unknown channel: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScheduleMode {
    /// CCH during CCH intervals, the service channel during SCH intervals.
    #[default]
    Alternating,
    /// Control until the first switch, then the service channel for every
    /// later interval. The extension is unbounded: it lasts until the schedule
    /// is stopped, with no extension count.
    ExtendedAlternating,
    /// Continuous service channel access from the moment the schedule starts.
    Immediate,
}

impl ScheduleMode {
    pub const ALL: [ScheduleMode; 3] = [
        ScheduleMode::Alternating,
        ScheduleMode::ExtendedAlternating,
        ScheduleMode::Immediate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScheduleMode::Alternating => "alternating",
            ScheduleMode::ExtendedAlternating => "extended-alternating",
            ScheduleMode::Immediate => "immediate",
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScheduleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "alternating" => Ok(ScheduleMode::Alternating),
            "extended-alternating" | "extended" => Ok(ScheduleMode::ExtendedAlternating),
            "immediate" | "continuous" => Ok(ScheduleMode::Immediate),
            other => Err(format!("Unknown schedule mode: {}", other)),
        }
    }
}

/// A channel schedule request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchInfo {
    pub channel: ChannelId,
    /// Switch to the service channel right away instead of waiting for the
    /// next SCH interval.
    pub immediate_switch: bool,
    pub mode: ScheduleMode,
}

impl SchInfo {
    pub fn new(channel: ChannelId, immediate_switch: bool, mode: ScheduleMode) -> Self {
        Self {
            channel,
            immediate_switch,
            mode,
        }
    }
}

/// Interval lengths of the alternating cadence. Both are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelTiming {
    cch_interval: Duration,
    sch_interval: Duration,
}

impl Default for ChannelTiming {
    fn default() -> Self {
        Self {
            cch_interval: Duration::from_millis(50),
            sch_interval: Duration::from_millis(50),
        }
    }
}

impl ChannelTiming {
    pub fn new(cch_interval: Duration, sch_interval: Duration) -> crate::error::Result<Self> {
        if cch_interval.is_zero() || sch_interval.is_zero() {
            return Err(SimError::InvalidConfig(format!(
                "channel intervals must be non-zero (CCH {:?}, SCH {:?})",
                cch_interval, sch_interval
            )));
        }
        let sync = cch_interval + sch_interval;
        if u64::try_from(sync.as_nanos()).is_err() {
            return Err(SimError::InvalidConfig(format!("sync interval {:?} is too long", sync)));
        }
        Ok(Self {
            cch_interval,
            sch_interval,
        })
    }

    pub fn cch_interval(&self) -> Duration {
        self.cch_interval
    }

    pub fn sch_interval(&self) -> Duration {
        self.sch_interval
    }

    fn cch_nanos(&self) -> u64 {
        self.cch_interval.as_nanos() as u64
    }

    fn sync_nanos(&self) -> u64 {
        (self.cch_interval + self.sch_interval).as_nanos() as u64
    }

    pub fn sync_interval(&self) -> Duration {
        self.cch_interval + self.sch_interval
    }

    /// Whether `t` falls in a CCH interval.
    pub fn is_cch_interval(&self, t: SimTime) -> bool {
        t.as_nanos() % self.sync_nanos() < self.cch_nanos()
    }

    fn sync_start(&self, t: SimTime) -> u64 {
        let n = t.as_nanos();
        n - n % self.sync_nanos()
    }

    /// Start of the first SCH interval at or after `t`.
    pub fn next_sch_start(&self, t: SimTime) -> SimTime {
        let candidate = self.sync_start(t) + self.cch_nanos();
        if candidate >= t.as_nanos() {
            SimTime::from_nanos(candidate)
        } else {
            SimTime::from_nanos(candidate + self.sync_nanos())
        }
    }

    /// Start of the first CCH interval strictly after `t`.
    pub fn next_cch_start(&self, t: SimTime) -> SimTime {
        SimTime::from_nanos(self.sync_start(t) + self.sync_nanos())
    }

    /// First interval boundary strictly after `t`.
    pub fn next_boundary(&self, t: SimTime) -> SimTime {
        if self.is_cch_interval(t) {
            SimTime::from_nanos(self.sync_start(t) + self.cch_nanos())
        } else {
            self.next_cch_start(t)
        }
    }
}
