//! Timestamp-ordered sample queue with in-flight accounting.

use std::collections::HashSet;

use fmp4::DecodedUnit;
use tracing::trace;

/// Queue of demuxed sample units keyed by timeline start time, plus the set
/// of timestamps currently being fetched. Insertion keeps ascending
/// timestamp order regardless of network completion order; in-flight
/// timestamps are tracked by their `f64` bit pattern so the same timeline
/// entry is never fetched twice.
#[derive(Debug, Default)]
pub struct SampleQueue {
    entries: Vec<(f64, DecodedUnit)>,
    in_flight: HashSet<u64>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in timestamp order, not append order.
    pub fn insert(&mut self, start: f64, unit: DecodedUnit) {
        let index = self
            .entries
            .partition_point(|(existing, _)| *existing < start);
        self.entries.insert(index, (start, unit));
    }

    /// Pop the earliest queued unit.
    pub fn pop_front(&mut self) -> Option<(f64, DecodedUnit)> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Drop queued units whose timeline start precedes `position`; returns
    /// how many were dropped.
    pub fn drop_before(&mut self, position: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(start, _)| *start >= position);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            trace!("dropped {dropped} sample units behind position {position}");
        }
        dropped
    }

    /// Discard queued units. In-flight markers survive; their results are
    /// re-validated against the timeline on arrival.
    pub fn clear_queued(&mut self) {
        self.entries.clear();
    }

    pub fn mark_in_flight(&mut self, start: f64) -> bool {
        self.in_flight.insert(start.to_bits())
    }

    pub fn clear_in_flight(&mut self, start: f64) -> bool {
        self.in_flight.remove(&start.to_bits())
    }

    /// Whether `start` is already queued or being fetched.
    pub fn tracks(&self, start: f64) -> bool {
        self.in_flight.contains(&start.to_bits())
            || self.entries.iter().any(|(s, _)| s.to_bits() == start.to_bits())
    }

    pub fn queued_count(&self) -> usize {
        self.entries.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Queued plus in-flight: the quantity bounded by the back-pressure
    /// ceiling.
    pub fn loaded_count(&self) -> usize {
        self.entries.len() + self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn unit(tag: u8) -> DecodedUnit {
        DecodedUnit {
            payload: Bytes::copy_from_slice(&[tag]),
            sample_sizes: vec![1],
            timings: Vec::new(),
            timescale: 90_000,
        }
    }

    #[test]
    fn insertion_orders_by_timestamp() {
        let mut queue = SampleQueue::new();
        queue.insert(9.0, unit(2));
        queue.insert(0.0, unit(0));
        queue.insert(4.5, unit(1));

        let order: Vec<f64> = std::iter::from_fn(|| queue.pop_front())
            .map(|(start, _)| start)
            .collect();
        assert_eq!(order, vec![0.0, 4.5, 9.0]);
    }

    #[test]
    fn drop_before_removes_passed_units_only() {
        let mut queue = SampleQueue::new();
        queue.insert(0.0, unit(0));
        queue.insert(4.5, unit(1));
        queue.insert(9.0, unit(2));

        assert_eq!(queue.drop_before(4.5), 1);
        assert_eq!(queue.pop_front().unwrap().0, 4.5);
    }

    #[test]
    fn loaded_count_includes_in_flight() {
        let mut queue = SampleQueue::new();
        assert!(queue.mark_in_flight(4.5));
        assert!(!queue.mark_in_flight(4.5));
        queue.insert(0.0, unit(0));

        assert_eq!(queue.loaded_count(), 2);
        assert!(queue.tracks(4.5));
        assert!(queue.tracks(0.0));
        assert!(!queue.tracks(9.0));

        queue.clear_queued();
        assert_eq!(queue.loaded_count(), 1);
        assert!(queue.clear_in_flight(4.5));
        assert_eq!(queue.loaded_count(), 0);
    }
}
