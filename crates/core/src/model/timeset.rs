use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum / mean / maximum over a set of duration samples.
///
/// An empty set is valid and reports no statistics rather than dividing by zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSet {
    count: usize,
    total: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
}

impl TimeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: impl IntoIterator<Item = Duration>) -> Self {
        let mut set = Self::new();
        for sample in samples {
            set.add(sample);
        }
        set
    }

    pub fn add(&mut self, sample: Duration) {
        self.count += 1;
        self.total = self.total.saturating_add(sample);
        self.min = Some(self.min.map_or(sample, |m| m.min(sample)));
        self.max = Some(self.max.map_or(sample, |m| m.max(sample)));
    }

    /// Fold another set into this one.
    pub fn merge(&mut self, other: &TimeSet) {
        self.count += other.count;
        self.total = self.total.saturating_add(other.total);
        if let Some(min) = other.min {
            self.min = Some(self.min.map_or(min, |m| m.min(min)));
        }
        if let Some(max) = other.max {
            self.max = Some(self.max.map_or(max, |m| m.max(max)));
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let nanos = self.total.as_nanos() / self.count as u128;
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}
