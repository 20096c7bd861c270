//! Tick-driven timer scheduler.
//!
//! Timers run on simulated time that only moves when [`Scheduler::advance`]
//! is called, once per simulation tick. Instead of storing closures, each
//! timer carries a payload that the owner dispatches when it fires. Every
//! timer belongs to an entity so all of an entity's pending work can be
//! dropped at once when it dies or despawns.

use invasion_common::{EntityId, TimerId};

/// Slack applied when comparing deadlines against the clock.
const TIME_EPSILON: f64 = 1e-6;

/// Smallest interval allowed for countdown ticks.
const MIN_INTERVAL: f64 = 1e-3;

/// How a timer fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Firing {
    /// One-shot timer reached its deadline
    Elapsed,
    /// Countdown interval passed; the countdown is still running
    Tick {
        /// Seconds until the countdown completes
        remaining: f32,
    },
    /// Countdown reached zero
    Complete,
}

/// A timer that fired during [`Scheduler::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<P> {
    /// Timer handle
    pub id: TimerId,
    /// Entity the timer belongs to
    pub owner: EntityId,
    /// Payload supplied when scheduling
    pub payload: P,
    /// Kind of firing
    pub firing: Firing,
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Once,
    Countdown { end: f64, interval: f64 },
}

#[derive(Debug, Clone)]
struct Timer<P> {
    id: TimerId,
    owner: EntityId,
    deadline: f64,
    seq: u64,
    kind: TimerKind,
    payload: P,
}

/// Timer queue advanced by simulated time.
#[derive(Debug, Clone)]
pub struct Scheduler<P> {
    now: f64,
    next_id: u64,
    next_seq: u64,
    timers: Vec<Timer<P>>,
}

impl<P> Default for Scheduler<P> {
    fn default() -> Self {
        Self {
            now: 0.0,
            next_id: 1,
            next_seq: 0,
            timers: Vec::new(),
        }
    }
}

impl<P: Clone> Scheduler<P> {
    /// Creates an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of pending timers owned by `owner`.
    #[must_use]
    pub fn pending_for(&self, owner: EntityId) -> usize {
        self.timers.iter().filter(|t| t.owner == owner).count()
    }

    /// Returns whether the timer is still pending.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Seconds until the timer's next firing.
    #[must_use]
    pub fn remaining(&self, id: TimerId) -> Option<f32> {
        self.timers
            .iter()
            .find(|t| t.id == id)
            .map(|t| (t.deadline - self.now).max(0.0) as f32)
    }

    /// Schedules `payload` to fire once after `duration` seconds.
    ///
    /// A zero or negative duration fires on the next [`advance`](Self::advance).
    pub fn after(&mut self, owner: EntityId, duration: f32, payload: P) -> TimerId {
        let deadline = self.now + f64::from(duration.max(0.0));
        self.push(owner, deadline, TimerKind::Once, payload)
    }

    /// Schedules a countdown lasting `duration` seconds that fires a
    /// [`Firing::Tick`] every `interval` seconds and a final
    /// [`Firing::Complete`].
    pub fn countdown(&mut self, owner: EntityId, duration: f32, interval: f32, payload: P) -> TimerId {
        let end = self.now + f64::from(duration.max(0.0));
        let interval = f64::from(interval).max(MIN_INTERVAL);
        let deadline = (self.now + interval).min(end);
        self.push(owner, deadline, TimerKind::Countdown { end, interval }, payload)
    }

    /// Cancels a timer. Returns whether it was pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Cancels every timer owned by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.owner != owner);
        before - self.timers.len()
    }

    /// Advances the clock by `dt` seconds and returns every firing that came
    /// due, ordered by deadline then by scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<Fired<P>> {
        self.now += f64::from(dt.max(0.0));
        let mut fired = Vec::new();

        while let Some(index) = self.next_due() {
            let timer = &mut self.timers[index];
            match timer.kind {
                TimerKind::Once => {
                    let timer = self.timers.swap_remove(index);
                    fired.push(Fired {
                        id: timer.id,
                        owner: timer.owner,
                        payload: timer.payload,
                        firing: Firing::Elapsed,
                    });
                },
                TimerKind::Countdown { end, interval } => {
                    if timer.deadline + TIME_EPSILON >= end {
                        let timer = self.timers.swap_remove(index);
                        fired.push(Fired {
                            id: timer.id,
                            owner: timer.owner,
                            payload: timer.payload,
                            firing: Firing::Complete,
                        });
                    } else {
                        let remaining = (end - timer.deadline) as f32;
                        fired.push(Fired {
                            id: timer.id,
                            owner: timer.owner,
                            payload: timer.payload.clone(),
                            firing: Firing::Tick { remaining },
                        });
                        timer.deadline = (timer.deadline + interval).min(end);
                        timer.seq = self.next_seq;
                        self.next_seq += 1;
                    }
                },
            }
        }

        fired
    }

    fn push(&mut self, owner: EntityId, deadline: f64, kind: TimerKind, payload: P) -> TimerId {
        let id = TimerId::from_raw(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            id,
            owner,
            deadline,
            seq,
            kind,
            payload,
        });
        id
    }

    fn next_due(&self) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= self.now + TIME_EPSILON)
            .min_by(|(_, a), (_, b)| {
                a.deadline
                    .total_cmp(&b.deadline)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn test_after_fires_at_deadline() {
        let mut scheduler = Scheduler::new();
        scheduler.after(owner(1), 0.5, "cooldown");

        assert!(scheduler.advance(0.25).is_empty());
        let fired = scheduler.advance(0.25);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].payload, "cooldown");
        assert_eq!(fired[0].firing, Firing::Elapsed);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_tenth_second_steps_reach_deadline() {
        let mut scheduler = Scheduler::new();
        scheduler.after(owner(1), 0.5, ());
        let mut ticks = 0;
        loop {
            ticks += 1;
            if !scheduler.advance(0.1).is_empty() {
                break;
            }
        }
        assert_eq!(ticks, 5);
    }

    #[test]
    fn test_zero_duration_fires_next_advance() {
        let mut scheduler = Scheduler::new();
        scheduler.after(owner(1), 0.0, 7);
        assert_eq!(scheduler.advance(0.0).len(), 1);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.after(owner(1), 0.1, ());
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(scheduler.advance(1.0).is_empty());
    }

    #[test]
    fn test_cancel_owner_drops_only_that_owner() {
        let mut scheduler = Scheduler::new();
        scheduler.after(owner(1), 0.1, 'a');
        scheduler.countdown(owner(1), 1.0, 0.2, 'b');
        scheduler.after(owner(2), 0.1, 'c');

        assert_eq!(scheduler.cancel_owner(owner(1)), 2);
        assert_eq!(scheduler.pending_for(owner(1)), 0);

        let fired = scheduler.advance(2.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].payload, 'c');
    }

    #[test]
    fn test_firing_order_is_deadline_then_insertion() {
        let mut scheduler = Scheduler::new();
        scheduler.after(owner(1), 0.3, "late");
        scheduler.after(owner(1), 0.1, "early");
        scheduler.after(owner(2), 0.1, "early-second");

        let order: Vec<_> = scheduler.advance(1.0).into_iter().map(|f| f.payload).collect();
        assert_eq!(order, vec!["early", "early-second", "late"]);
    }

    #[test]
    fn test_countdown_ticks_then_completes() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.countdown(owner(1), 1.0, 0.25, "regen");

        let mut remaining = Vec::new();
        let mut completed = false;
        for _ in 0..8 {
            for fired in scheduler.advance(0.25) {
                assert_eq!(fired.id, id);
                match fired.firing {
                    Firing::Tick { remaining: r } => remaining.push(r),
                    Firing::Complete => completed = true,
                    Firing::Elapsed => panic!("countdown fired as one-shot"),
                }
            }
        }

        assert!(completed);
        assert_eq!(remaining.len(), 3);
        assert!((remaining[0] - 0.75).abs() < 1e-4);
        assert!((remaining[2] - 0.25).abs() < 1e-4);
        assert!(!scheduler.is_pending(id));
    }

    #[test]
    fn test_remaining_reports_time_left() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.after(owner(1), 1.0, ());
        scheduler.advance(0.4);
        let left = scheduler.remaining(id).expect("pending");
        assert!((left - 0.6).abs() < 1e-4);
    }
}
