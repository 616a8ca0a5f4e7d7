use super::{ChannelId, ChannelTiming, SchInfo, ScheduleMode};
use crate::error::{Result, SimError};
use crate::network::NodeId;
use crate::time::SimTime;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSchedule {
    pub info: SchInfo,
    pub started_at: SimTime,
    /// When the node first moves to the service channel.
    first_switch: SimTime,
}

impl ActiveSchedule {
    fn new(info: SchInfo, started_at: SimTime, timing: &ChannelTiming) -> Self {
        let first_switch = if info.immediate_switch || info.mode == ScheduleMode::Immediate {
            started_at
        } else {
            timing.next_sch_start(started_at)
        };
        Self {
            info,
            started_at,
            first_switch,
        }
    }

    /// End of the service window opened by the first switch. An immediate
    /// switch inside a CCH interval holds the service channel until the next
    /// CCH interval begins.
    fn first_window_end(&self, timing: &ChannelTiming) -> SimTime {
        timing.next_cch_start(self.first_switch)
    }

    fn channel_at(&self, t: SimTime, timing: &ChannelTiming) -> ChannelId {
        if t < self.first_switch {
            return ChannelId::Control;
        }
        match self.info.mode {
            ScheduleMode::ExtendedAlternating | ScheduleMode::Immediate => self.info.channel,
            ScheduleMode::Alternating => {
                if t < self.first_window_end(timing) || !timing.is_cch_interval(t) {
                    self.info.channel
                } else {
                    ChannelId::Control
                }
            }
        }
    }

    /// Next instant after `t` at which the active channel changes, if any.
    fn next_change_after(&self, t: SimTime, timing: &ChannelTiming) -> Option<SimTime> {
        if t < self.first_switch {
            return Some(self.first_switch);
        }
        match self.info.mode {
            ScheduleMode::ExtendedAlternating | ScheduleMode::Immediate => None,
            ScheduleMode::Alternating => {
                let window_end = self.first_window_end(timing);
                if t < window_end {
                    Some(window_end)
                } else {
                    Some(timing.next_boundary(t))
                }
            }
        }
    }
}

/// Channel state of one WAVE node.
///
/// Mutated only through [`start_schedule`](Self::start_schedule),
/// [`stop_schedule`](Self::stop_schedule) and [`sync`](Self::sync); at most one
/// schedule drives it at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAccessState {
    node: NodeId,
    timing: ChannelTiming,
    active_channel: ChannelId,
    schedule: Option<ActiveSchedule>,
    switch_deadline: Option<SimTime>,
    switches: u64,
}

impl ChannelAccessState {
    pub fn new(node: NodeId) -> Self {
        Self::with_timing(node, ChannelTiming::default())
    }

    pub fn with_timing(node: NodeId, timing: ChannelTiming) -> Self {
        Self {
            node,
            timing,
            active_channel: ChannelId::Control,
            schedule: None,
            switch_deadline: None,
            switches: 0,
        }
    }

    pub fn active_channel(&self) -> ChannelId {
        self.active_channel
    }

    pub fn schedule(&self) -> Option<&ActiveSchedule> {
        self.schedule.as_ref()
    }

    pub fn has_schedule(&self) -> bool {
        self.schedule.is_some()
    }

    /// Next instant the state is due to transition. Strictly increases across
    /// the transitions of one schedule.
    pub fn switch_deadline(&self) -> Option<SimTime> {
        self.switch_deadline
    }

    /// Number of channel changes observed so far.
    pub fn switches(&self) -> u64 {
        self.switches
    }

    pub fn timing(&self) -> &ChannelTiming {
        &self.timing
    }

    pub fn start_schedule(&mut self, now: SimTime, info: SchInfo) -> Result<()> {
        if self.schedule.is_some() {
            return Err(SimError::ScheduleConflict(self.node));
        }
        if info.channel.is_control() || !info.channel.is_valid() {
            return Err(SimError::InvalidChannel(info.channel));
        }

        let schedule = ActiveSchedule::new(info, now, &self.timing);
        self.schedule = Some(schedule);
        self.apply(now, schedule);

        debug!(
            "Node {} started {} schedule on {} at {} (immediate: {}, first switch {})",
            self.node, info.mode, info.channel, now, info.immediate_switch, schedule.first_switch
        );
        Ok(())
    }

    /// Releases the current schedule and returns to the control channel.
    /// Returns false when no schedule was running.
    pub fn stop_schedule(&mut self, now: SimTime) -> bool {
        if self.schedule.take().is_none() {
            return false;
        }
        self.set_active(ChannelId::Control);
        self.switch_deadline = None;
        debug!("Node {} stopped its channel schedule at {}", self.node, now);
        true
    }

    /// Brings the state up to `now`, applying every transition that is due.
    pub fn sync(&mut self, now: SimTime) {
        let (Some(schedule), Some(deadline)) = (self.schedule, self.switch_deadline) else {
            return;
        };
        if now < deadline {
            return;
        }
        self.apply(now, schedule);
    }

    fn apply(&mut self, now: SimTime, schedule: ActiveSchedule) {
        self.set_active(schedule.channel_at(now, &self.timing));
        self.switch_deadline = schedule.next_change_after(now, &self.timing);
    }

    fn set_active(&mut self, channel: ChannelId) {
        if channel != self.active_channel {
            self.switches += 1;
            debug!("Node {} switched {} -> {}", self.node, self.active_channel, channel);
            self.active_channel = channel;
        }
    }

    /// Whether a send on `channel` is eligible right now. The control channel
    /// is never gated; a service channel only while it is the active one.
    pub fn is_channel_active(&self, channel: ChannelId) -> bool {
        channel.is_control() || channel == self.active_channel
    }

    /// Earliest instant at or after `now` when the scheduled service channel
    /// is active. `None` without a schedule.
    pub fn next_service_window(&self, now: SimTime) -> Option<SimTime> {
        let schedule = self.schedule?;
        if schedule.channel_at(now, &self.timing) == schedule.info.channel {
            return Some(now);
        }
        schedule.next_change_after(now, &self.timing)
    }
}
