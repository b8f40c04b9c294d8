//! Deadline-ordered timer queue driven by an external clock
//!
//! Nothing here sleeps. The host calls [`TimerQueue::pop_due`] with the
//! current instant and receives the payloads whose deadlines have passed.

use std::time::{Duration, Instant};

/// Handle for cancelling a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    deadline: Instant,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    /// Sorted by deadline, then by scheduling order
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: T) -> TimerId {
        self.schedule_at(now + delay, payload)
    }

    pub fn schedule_at(&mut self, deadline: Instant, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let index = self.entries.partition_point(|e| e.deadline <= deadline);
        self.entries.insert(
            index,
            Entry {
                id,
                deadline,
                payload,
            },
        );
        id
    }

    /// Returns false when the timer already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every timer whose payload matches; returns how many were dropped
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !predicate(&e.payload));
        before - self.entries.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Remove and return every payload due at `now`, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let due = self.entries.partition_point(|e| e.deadline <= now);
        self.entries.drain(..due).map(|e| e.payload).collect()
    }

    /// Remove the earliest timer due at `now`, with the deadline it was set for
    pub fn pop_next_due(&mut self, now: Instant) -> Option<(Instant, T)> {
        match self.entries.first() {
            Some(entry) if entry.deadline <= now => {
                let entry = self.entries.remove(0);
                Some((entry.deadline, entry.payload))
            }
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.deadline)
    }

    pub fn contains(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        self.entries.iter().any(|e| predicate(&e.payload))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(t0, ms(300), "c");
        queue.schedule(t0, ms(100), "a");
        queue.schedule(t0, ms(200), "b");
        queue.schedule(t0, ms(100), "a2");

        assert!(queue.pop_due(t0 + ms(50)).is_empty());
        assert_eq!(queue.pop_due(t0 + ms(200)), vec!["a", "a2", "b"]);
        assert_eq!(queue.next_deadline(), Some(t0 + ms(300)));
        assert_eq!(queue.pop_due(t0 + ms(1000)), vec!["c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_next_due_keeps_deadline() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(t0, ms(100), 'a');
        queue.schedule(t0, ms(250), 'b');

        assert_eq!(queue.pop_next_due(t0 + ms(99)), None);
        assert_eq!(queue.pop_next_due(t0 + ms(900)), Some((t0 + ms(100), 'a')));
        assert_eq!(queue.pop_next_due(t0 + ms(900)), Some((t0 + ms(250), 'b')));
        assert_eq!(queue.pop_next_due(t0 + ms(900)), None);
    }

    #[test]
    fn test_cancellation() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        let a = queue.schedule(t0, ms(10), 1);
        queue.schedule(t0, ms(20), 2);
        queue.schedule(t0, ms(30), 3);
        queue.schedule(t0, ms(40), 4);

        assert!(queue.cancel(a));
        assert!(!queue.cancel(a));
        assert_eq!(queue.cancel_where(|n| n % 2 == 0), 2);
        assert!(queue.contains(|n| *n == 3));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.cancel_all(), 1);
        assert_eq!(queue.next_deadline(), None);
        assert!(queue.pop_due(t0 + ms(100)).is_empty());
    }
}
