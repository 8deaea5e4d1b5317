//! Fixed-capacity observation windows.

use std::collections::VecDeque;

/// Default number of observations retained per window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Ordered FIFO buffer of recent counts. Appending to a full window evicts
/// the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow {
    values: VecDeque<u32>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append to the tail, returning the evicted head if the window was full.
    pub fn append(&mut self, value: u32) -> Option<u32> {
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    /// Contents in insertion order.
    pub fn contents(&self) -> Vec<u32> {
        self.values.iter().copied().collect()
    }

    /// The last `min(n, len)` values, oldest first.
    pub fn recent(&self, n: usize) -> Vec<u32> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Sum of the contents, widened so a full window of large counts cannot overflow.
    pub fn sum(&self) -> u64 {
        self.values.iter().map(|&v| u64::from(v)).sum()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

/// The two windows fed by ingestion.
///
/// `region_counts` drives the display and the forecaster, `observed_meteors`
/// drives the rate posterior. Accepted observations go to both; startup
/// seeding fills them independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationHistory {
    region_counts: RollingWindow,
    observed_meteors: RollingWindow,
}

impl ObservationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            region_counts: RollingWindow::new(capacity),
            observed_meteors: RollingWindow::new(capacity),
        }
    }

    /// Record one accepted observation in both windows.
    pub fn record(&mut self, count: u32) {
        self.region_counts.append(count);
        self.observed_meteors.append(count);
    }

    /// Load synthetic history; each window gets its own values.
    pub fn seed(
        &mut self,
        region_counts: impl IntoIterator<Item = u32>,
        observed_meteors: impl IntoIterator<Item = u32>,
    ) {
        for v in region_counts {
            self.region_counts.append(v);
        }
        for v in observed_meteors {
            self.observed_meteors.append(v);
        }
    }

    pub fn region_counts(&self) -> &RollingWindow {
        &self.region_counts
    }

    pub fn observed_meteors(&self) -> &RollingWindow {
        &self.observed_meteors
    }
}

impl Default for ObservationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_last_capacity_values_in_order() {
        let mut window = RollingWindow::new(100);
        for v in 0..150u32 {
            window.append(v);
        }
        assert_eq!(window.len(), 100);
        assert!(window.is_full());
        assert_eq!(window.contents(), (50..150).collect::<Vec<u32>>());
    }

    #[test]
    fn append_reports_eviction() {
        let mut window = RollingWindow::new(2);
        assert_eq!(window.append(1), None);
        assert_eq!(window.append(2), None);
        assert_eq!(window.append(3), Some(1));
        assert_eq!(window.contents(), vec![2, 3]);
    }

    #[test]
    fn recent_clamps_to_length() {
        let mut window = RollingWindow::new(10);
        for v in [4, 5, 6] {
            window.append(v);
        }
        assert_eq!(window.recent(2), vec![5, 6]);
        assert_eq!(window.recent(10), vec![4, 5, 6]);
        assert!(window.recent(0).is_empty());
    }

    #[test]
    fn empty_window() {
        let window = RollingWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), DEFAULT_WINDOW_CAPACITY);
        assert_eq!(window.sum(), 0);
        assert!(window.contents().is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        window.append(7);
        window.append(8);
        assert_eq!(window.contents(), vec![8]);
    }

    #[test]
    fn sum_does_not_overflow() {
        let mut window = RollingWindow::new(4);
        for _ in 0..4 {
            window.append(u32::MAX);
        }
        assert_eq!(window.sum(), 4 * u64::from(u32::MAX));
    }

    #[test]
    fn history_records_to_both_windows() {
        let mut history = ObservationHistory::new(3);
        history.record(3);
        history.record(5);
        assert_eq!(history.region_counts().contents(), vec![3, 5]);
        assert_eq!(history.observed_meteors().contents(), vec![3, 5]);
    }

    #[test]
    fn history_seed_is_independent() {
        let mut history = ObservationHistory::new(10);
        history.seed([1, 2], [0, 0, 4]);
        assert_eq!(history.region_counts().contents(), vec![1, 2]);
        assert_eq!(history.observed_meteors().contents(), vec![0, 0, 4]);
    }
}
