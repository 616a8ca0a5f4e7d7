//! Discrete-event queue and the simulated clock it owns.
//!
//! Events fire in `(fire_time, sequence_id)` order: earlier times first, and
//! insertion order among events sharing a fire time. The clock only moves
//! between firings.

mod event;

pub use event::EventHandle;

use crate::error::{Result, SimError};
use crate::time::{Clock, SimTime};
use event::EventKey;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A scheduled action. It receives the world and the queue so it can mutate
/// state and schedule follow-up events.
pub type Action<W> = Box<dyn FnOnce(&mut W, &mut EventQueue<W>)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events_fired: u64,
    pub placeholders_skipped: u64,
    pub end_time: SimTime,
    /// True when the stop bound cut the run short with events still pending.
    pub hit_stop_bound: bool,
}

pub struct EventQueue<W> {
    now: SimTime,
    next_sequence: u64,
    heap: BinaryHeap<EventKey>,
    actions: HashMap<u64, Action<W>>,
    stop_at: Option<SimTime>,
}

impl<W> EventQueue<W> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_sequence: 0,
            heap: BinaryHeap::new(),
            actions: HashMap::new(),
            stop_at: None,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of live (scheduled, not cancelled, not fired) events.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn stop_bound(&self) -> Option<SimTime> {
        self.stop_at
    }

    /// Fire time of the earliest live event.
    pub fn next_fire_time(&self) -> Option<SimTime> {
        self.heap
            .iter()
            .filter(|key| self.actions.contains_key(&key.sequence_id))
            .map(|key| key.fire_time)
            .min()
    }

    /// Schedules `action` to fire `delay_secs` seconds after `now()`.
    ///
    /// Negative or non-finite delays are rejected and leave the queue untouched.
    pub fn schedule<F>(&mut self, delay_secs: f64, action: F) -> Result<EventHandle>
    where
        F: FnOnce(&mut W, &mut EventQueue<W>) + 'static,
    {
        let delay = SimTime::try_from_secs_f64(delay_secs).ok_or(SimError::InvalidDelay(delay_secs))?;
        let fire_time = SimTime::from_nanos(self.now.as_nanos().saturating_add(delay.as_nanos()));
        Ok(self.push(fire_time, Box::new(action)))
    }

    pub fn schedule_in<F>(&mut self, delay: Duration, action: F) -> EventHandle
    where
        F: FnOnce(&mut W, &mut EventQueue<W>) + 'static,
    {
        let fire_time = self.now + delay;
        self.push(fire_time, Box::new(action))
    }

    /// Schedules at an absolute instant, which must not lie in the past.
    pub fn schedule_at<F>(&mut self, at: SimTime, action: F) -> Result<EventHandle>
    where
        F: FnOnce(&mut W, &mut EventQueue<W>) + 'static,
    {
        if at < self.now {
            let behind = (self.now - at).as_secs_f64();
            return Err(SimError::InvalidDelay(-behind));
        }
        Ok(self.push(at, Box::new(action)))
    }

    fn push(&mut self, fire_time: SimTime, action: Action<W>) -> EventHandle {
        let key = EventKey {
            fire_time,
            sequence_id: self.next_sequence,
        };
        self.next_sequence += 1;
        self.heap.push(key);
        self.actions.insert(key.sequence_id, action);
        key.into()
    }

    /// Cancels a pending event. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        // The heap key stays behind and is skipped when popped.
        self.actions.remove(&handle.sequence_id).is_some()
    }

    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.actions.contains_key(&handle.sequence_id)
    }

    /// Sets the absolute instant after which `run` returns. Events scheduled
    /// exactly at the bound still fire.
    pub fn stop_at(&mut self, at: SimTime) {
        self.stop_at = Some(at);
    }

    /// Relative form of [`EventQueue::stop_at`].
    pub fn stop(&mut self, delay_secs: f64) -> Result<()> {
        let delay = SimTime::try_from_secs_f64(delay_secs).ok_or(SimError::InvalidDelay(delay_secs))?;
        self.stop_at(SimTime::from_nanos(self.now.as_nanos().saturating_add(delay.as_nanos())));
        Ok(())
    }

    /// Drains the queue in time order until it is empty or the stop bound is
    /// reached. A panicking action aborts the run.
    pub fn run(&mut self, world: &mut W) -> RunSummary {
        let mut summary = RunSummary::default();

        while let Some(key) = self.heap.peek().copied() {
            if self.stop_at.is_some_and(|bound| key.fire_time > bound) {
                summary.hit_stop_bound = !self.actions.is_empty();
                break;
            }
            self.heap.pop();

            let Some(action) = self.actions.remove(&key.sequence_id) else {
                summary.placeholders_skipped += 1;
                continue;
            };

            debug_assert!(key.fire_time >= self.now, "clock must never move backward");
            self.now = key.fire_time;
            action(world, self);
            summary.events_fired += 1;
        }

        if summary.hit_stop_bound {
            if let Some(bound) = self.stop_at {
                self.now = self.now.max(bound);
            }
        }

        summary.end_time = self.now;
        debug!(
            "Event queue returned at {} after {} events ({} pending)",
            self.now,
            summary.events_fired,
            self.len()
        );
        summary
    }

    /// Teardown: discards every unfired event without running it.
    pub fn clear(&mut self) -> usize {
        let discarded = self.actions.len();
        self.actions.clear();
        self.heap.clear();
        discarded
    }
}

impl<W> Default for EventQueue<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Clock for EventQueue<W> {
    fn now(&self) -> SimTime {
        self.now
    }
}

impl<W> fmt::Debug for EventQueue<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("now", &self.now)
            .field("pending", &self.actions.len())
            .field("stop_at", &self.stop_at)
            .finish()
    }
}
