use proptest::prelude::*;
use wavesim::prelude::*;

type Fired = Vec<(usize, SimTime)>;

fn schedule_all(delays_ms: &[u16]) -> (EventQueue<Fired>, Vec<EventHandle>) {
    let mut queue = EventQueue::new();
    let handles = delays_ms
        .iter()
        .enumerate()
        .map(|(tag, &ms)| {
            queue
                .schedule(f64::from(ms) / 1000.0, move |fired: &mut Fired, q: &mut EventQueue<Fired>| {
                    fired.push((tag, q.now()))
                })
                .unwrap()
        })
        .collect();
    (queue, handles)
}

proptest! {
    #[test]
    fn fires_by_time_then_fifo(delays in prop::collection::vec(0u16..50, 0..200)) {
        let (mut queue, _) = schedule_all(&delays);
        let mut fired = Fired::new();
        let summary = queue.run(&mut fired);

        prop_assert_eq!(fired.len(), delays.len());
        prop_assert_eq!(summary.events_fired as usize, delays.len());
        for pair in fired.windows(2) {
            let ((a_tag, a_time), (b_tag, b_time)) = (pair[0], pair[1]);
            prop_assert!(a_time <= b_time);
            if a_time == b_time {
                prop_assert!(a_tag < b_tag);
            }
        }
        for (tag, time) in &fired {
            prop_assert_eq!(*time, SimTime::from_millis(u64::from(delays[*tag])));
        }
    }

    #[test]
    fn cancelled_events_are_skipped(
        delays in prop::collection::vec(0u16..1000, 1..100),
        cancel_mask in prop::collection::vec(any::<bool>(), 100),
    ) {
        let (mut queue, handles) = schedule_all(&delays);
        let mut expected = 0;
        for (handle, &cancel) in handles.iter().zip(&cancel_mask) {
            if cancel {
                prop_assert!(queue.cancel(*handle));
            } else {
                expected += 1;
            }
        }
        prop_assert_eq!(queue.len(), expected);

        let mut fired = Fired::new();
        queue.run(&mut fired);
        prop_assert_eq!(fired.len(), expected);
        prop_assert!(fired.iter().all(|(tag, _)| !cancel_mask[*tag]));
    }

    #[test]
    fn stop_bound_never_overrun(delays in prop::collection::vec(0u16..1000, 0..100), stop_ms in 0u64..1000) {
        let (mut queue, _) = schedule_all(&delays);
        queue.stop_at(SimTime::from_millis(stop_ms));
        let mut fired = Fired::new();
        queue.run(&mut fired);

        let within = delays.iter().filter(|&&d| u64::from(d) <= stop_ms).count();
        prop_assert_eq!(fired.len(), within);
        prop_assert_eq!(queue.len(), delays.len() - within);
    }
}

#[test]
fn negative_delay_is_rejected_without_side_effects() {
    let (mut queue, _) = schedule_all(&[10, 20]);
    let before = queue.len();
    let result = queue.schedule(-1.0, |_: &mut Fired, _: &mut EventQueue<Fired>| {});
    assert_eq!(result.unwrap_err(), SimError::InvalidDelay(-1.0));
    assert_eq!(queue.len(), before);
}

#[test]
fn teardown_discards_unfired_events() {
    let (mut queue, _) = schedule_all(&[10, 20, 30]);
    queue.stop_at(SimTime::from_millis(15));
    let mut fired = Fired::new();
    queue.run(&mut fired);
    assert_eq!(queue.clear(), 2);

    queue.stop_at(SimTime::MAX);
    queue.run(&mut fired);
    assert_eq!(fired.len(), 1);
}
