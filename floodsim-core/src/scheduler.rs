use crate::time::SimTime;
use core::cmp::{Ordering, Reverse};
use std::{collections::BinaryHeap, time::Duration};
use thiserror::Error;

/// The global timeline of a simulation run.
///
/// Events are kept in a binary heap ordered by their fire time. Events
/// sharing the same fire time are executed in the order they were
/// scheduled: every event is stamped with a monotonically increasing
/// sequence number used as the tie-break.
///
/// The scheduler is owned by the run and handed by mutable reference to
/// whatever needs to schedule follow-up events. There is no global clock.
///
/// ```
/// # use floodsim_core::{scheduler::Scheduler, time::SimTime};
/// # use std::time::Duration;
/// let mut scheduler = Scheduler::new();
/// scheduler.schedule(Duration::from_millis(10), "late");
/// scheduler.schedule(Duration::from_millis(5), "early");
/// scheduler.schedule(Duration::from_millis(5), "early too");
///
/// let mut fired = Vec::new();
/// scheduler
///     .run_until::<_, std::convert::Infallible>(SimTime::from_secs(1), |scheduler, event| {
///         fired.push((scheduler.now(), event));
///         Ok(())
///     })
///     .unwrap();
///
/// assert_eq!(
///     fired,
///     vec![
///         (SimTime::from_millis(5), "early"),
///         (SimTime::from_millis(5), "early too"),
///         (SimTime::from_millis(10), "late"),
///     ]
/// );
/// ```
pub struct Scheduler<E> {
    now: SimTime,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Scheduled<E>>>,
}

/// What happened during a call to [`Scheduler::run_until`].
#[derive(Debug)]
pub struct RunOutcome<E> {
    /// number of events executed
    pub executed: u64,
    /// events that were due after the end of the run, in fire order
    pub discarded: Vec<E>,
}

/// Runtime invariant violation: the caller attempted to go back in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Cannot schedule an event at {requested}, the simulation is already at {now}")]
    InThePast { now: SimTime, requested: SimTime },
}

struct Scheduled<E> {
    time: SimTime,
    seq: u64,
    event: E,
}

impl<E> Scheduled<E> {
    fn key(&self) -> (SimTime, u64) {
        (self.time, self.seq)
    }
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// current simulation time
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// fire time of the next pending event
    #[inline]
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|Reverse(next)| next.time)
    }

    /// Schedule `event` to fire `delay` after [`Scheduler::now`].
    ///
    /// A [`Duration`] cannot be negative, so this never fails.
    pub fn schedule(&mut self, delay: Duration, event: E) {
        let time = self.now + delay;
        self.push(time, event);
    }

    /// Schedule `event` to fire at the absolute time `time`.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::InThePast`] if `time` is before [`Scheduler::now`].
    /// This is a bug in the caller, the event is not queued.
    pub fn schedule_at(&mut self, time: SimTime, event: E) -> Result<(), ScheduleError> {
        if time < self.now {
            return Err(ScheduleError::InThePast {
                now: self.now,
                requested: time,
            });
        }
        self.push(time, event);
        Ok(())
    }

    fn push(&mut self, time: SimTime, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { time, seq, event }));
    }

    /// Pop the earliest event if it is due at or before `horizon`, moving
    /// the clock to its fire time.
    pub fn pop_until(&mut self, horizon: SimTime) -> Option<E> {
        if self.peek_time()? > horizon {
            return None;
        }
        let Reverse(next) = self.queue.pop()?;

        debug_assert!(
            next.time >= self.now,
            "event at {} fired after the clock reached {}",
            next.time,
            self.now
        );

        self.now = next.time;
        Some(next.event)
    }

    /// Execute every event due at or before `end`, in time order.
    ///
    /// `handler` receives the scheduler back so it can schedule follow-up
    /// events. Once no event is due before `end` the clock is moved to
    /// `end` and the remaining events are removed from the queue and
    /// returned in [`RunOutcome::discarded`]: they are never executed.
    ///
    /// The run stops at the first error returned by `handler`.
    pub fn run_until<F, Err>(&mut self, end: SimTime, mut handler: F) -> Result<RunOutcome<E>, Err>
    where
        F: FnMut(&mut Self, E) -> Result<(), Err>,
    {
        let mut executed = 0;

        while let Some(event) = self.pop_until(end) {
            handler(self, event)?;
            executed += 1;
        }

        self.now = self.now.max(end);

        let mut discarded = Vec::with_capacity(self.queue.len());
        while let Some(Reverse(next)) = self.queue.pop() {
            discarded.push(next.event);
        }

        Ok(RunOutcome {
            executed,
            discarded,
        })
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn empty() {
        let mut s = Scheduler::<()>::new();

        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert_eq!(s.now(), SimTime::ZERO);
        assert!(s.peek_time().is_none());
        assert!(s.pop_until(SimTime::MAX).is_none());
    }

    #[test]
    fn time_order() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_millis(30), 3);
        s.schedule(Duration::from_millis(10), 1);
        s.schedule(Duration::from_millis(20), 2);

        assert_eq!(s.peek_time(), Some(SimTime::from_millis(10)));

        let mut fired = Vec::new();
        s.run_until::<_, Infallible>(SimTime::from_secs(1), |s, e| {
            fired.push((s.now(), e));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            fired,
            vec![
                (SimTime::from_millis(10), 1),
                (SimTime::from_millis(20), 2),
                (SimTime::from_millis(30), 3),
            ]
        );
    }

    #[test]
    fn equal_times_fire_in_insertion_order() {
        let mut s = Scheduler::new();
        for i in 0..100 {
            s.schedule(Duration::from_millis(5), i);
        }

        let mut fired = Vec::new();
        s.run_until::<_, Infallible>(SimTime::from_millis(5), |_, e| {
            fired.push(e);
            Ok(())
        })
        .unwrap();

        assert_eq!(fired, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn follow_up_at_same_instant_runs_after_pending_ones() {
        let mut s = Scheduler::new();
        s.schedule(Duration::ZERO, "a");
        s.schedule(Duration::ZERO, "b");

        let mut fired = Vec::new();
        s.run_until::<_, Infallible>(SimTime::ZERO, |s, e| {
            if e == "a" {
                s.schedule(Duration::ZERO, "c");
            }
            fired.push(e);
            Ok(())
        })
        .unwrap();

        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn events_after_end_are_discarded() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(1), 1);
        s.schedule(Duration::from_secs(3), 3);
        s.schedule(Duration::from_secs(2), 2);

        let outcome = s
            .run_until::<_, Infallible>(SimTime::from_secs(1), |_, _| Ok(()))
            .unwrap();

        assert_eq!(outcome.executed, 1);
        assert_eq!(outcome.discarded, vec![2, 3]);
        assert!(s.is_empty());
        assert_eq!(s.now(), SimTime::from_secs(1));
    }

    #[test]
    fn clock_moves_to_end_when_queue_empties() {
        let mut s = Scheduler::<()>::new();
        s.run_until::<_, Infallible>(SimTime::from_secs(60), |_, _| Ok(()))
            .unwrap();
        assert_eq!(s.now(), SimTime::from_secs(60));
    }

    #[test]
    fn schedule_in_the_past_is_rejected() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(2), ());
        s.pop_until(SimTime::MAX).unwrap();

        let error = s.schedule_at(SimTime::from_secs(1), ()).unwrap_err();
        assert_eq!(
            error,
            ScheduleError::InThePast {
                now: SimTime::from_secs(2),
                requested: SimTime::from_secs(1),
            }
        );
        assert!(s.is_empty());

        s.schedule_at(SimTime::from_secs(2), ()).unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn handler_error_stops_the_run() {
        let mut s = Scheduler::new();
        s.schedule(Duration::from_secs(1), 1);
        s.schedule(Duration::from_secs(2), 2);

        let result = s.run_until(SimTime::from_secs(10), |_, e| {
            if e == 1 { Err("boom") } else { Ok(()) }
        });

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(s.len(), 1);
    }
}
