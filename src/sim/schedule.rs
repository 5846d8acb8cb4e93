//! Scheduled callbacks
//!
//! A min-heap of `(fire time, action)` entries drained once per logic pass.
//! Actions are plain data; anything they refer to is looked up by id when they
//! fire, so an action for an entity that no longer exists is a no-op for the
//! caller to skip.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use super::state::EntityId;

/// Cancellation handle for one scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Delayed gameplay actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timed {
    /// Post-clear delay elapsed
    StartNextWave,
    /// Agent hurt flash over (no-op if the agent is gone)
    AgentHurtEnd(EntityId),
    PlayerHurtEnd,
}

#[derive(Debug)]
struct Entry<A> {
    fire_at: f64,
    seq: u64,
    action: A,
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A> Eq for Entry<A> {}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Entry<A> {
    // Equal fire times keep insertion order
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .total_cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// One-shot timers keyed on simulation time
#[derive(Debug)]
pub struct Scheduler<A> {
    now: f64,
    next_seq: u64,
    heap: BinaryHeap<Reverse<Entry<A>>>,
    pending: HashSet<u64>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
        }
    }

    /// Current simulation time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Fire `action` once, `delay` seconds from now
    pub fn after(&mut self, delay: f32, action: A) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            fire_at: self.now + f64::from(delay.max(0.0)),
            seq,
            action,
        }));
        self.pending.insert(seq);
        TimerHandle(seq)
    }

    /// Cancel a pending action; returns false if it already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&handle.0)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains(&handle.0)
    }

    /// Number of actions still waiting to fire
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advance time by `dt` and return every action now due, earliest first
    pub fn advance(&mut self, dt: f32) -> Vec<A> {
        self.now += f64::from(dt.max(0.0));
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.fire_at > self.now {
                break;
            }
            let Some(Reverse(entry)) = self.heap.pop() else {
                break;
            };
            // Cancelled entries stay in the heap until they surface here
            if self.pending.remove(&entry.seq) {
                due.push(entry.action);
            }
        }
        due
    }

    /// Drop every pending action
    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }
}
