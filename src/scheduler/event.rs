use crate::time::SimTime;
use std::cmp::Ordering;

/// Identifies one scheduled event. Handles stay valid after the event fires;
/// cancelling a fired handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub(crate) fire_time: SimTime,
    pub(crate) sequence_id: u64,
}

impl EventHandle {
    pub fn fire_time(&self) -> SimTime {
        self.fire_time
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }
}

/// Heap entry. The action itself lives in a side table so a cancelled entry
/// stays in the heap as an inert placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EventKey {
    pub fire_time: SimTime,
    pub sequence_id: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap pops the earliest time, then the
        // earliest insertion.
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.sequence_id.cmp(&self.sequence_id))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<EventKey> for EventHandle {
    fn from(key: EventKey) -> Self {
        Self {
            fire_time: key.fire_time,
            sequence_id: key.sequence_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn heap_pops_by_time_then_insertion() {
        let mut heap = BinaryHeap::new();
        heap.push(EventKey { fire_time: SimTime::from_secs(2), sequence_id: 0 });
        heap.push(EventKey { fire_time: SimTime::from_secs(1), sequence_id: 2 });
        heap.push(EventKey { fire_time: SimTime::from_secs(1), sequence_id: 1 });

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop()).map(|k| k.sequence_id).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
