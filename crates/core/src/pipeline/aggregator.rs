use std::sync::Mutex;

use crate::shared::emotion::{Emotion, EmotionSummary};

/// In-memory per-session emotion counters.
///
/// Single writer (the worker) and many readers: `increment` updates the
/// total and the category under one lock, so `snapshot` always observes a
/// summary whose histogram sums to its total, never a partial update.
pub struct EmotionAggregator {
    summary: Mutex<EmotionSummary>,
}

impl EmotionAggregator {
    pub fn new() -> Self {
        Self {
            summary: Mutex::new(EmotionSummary::new()),
        }
    }

    pub fn increment(&self, emotion: Emotion) {
        self.lock().record(emotion);
    }

    /// A consistent copy, safe to hold while the worker keeps counting.
    pub fn snapshot(&self) -> EmotionSummary {
        self.lock().clone()
    }

    /// Zeroes every counter. Called at session start.
    pub fn reset(&self) {
        *self.lock() = EmotionSummary::new();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EmotionSummary> {
        self.summary.lock().expect("aggregator lock poisoned")
    }
}

impl Default for EmotionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_zero() {
        let aggregator = EmotionAggregator::new();
        assert_eq!(aggregator.snapshot().total_faces(), 0);
    }

    #[test]
    fn test_increment_visible_in_snapshot() {
        let aggregator = EmotionAggregator::new();
        aggregator.increment(Emotion::Fear);
        aggregator.increment(Emotion::Fear);

        let summary = aggregator.snapshot();
        assert_eq!(summary.total_faces(), 2);
        assert_eq!(summary.count(Emotion::Fear), 2);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let aggregator = EmotionAggregator::new();
        aggregator.increment(Emotion::Happy);
        let before = aggregator.snapshot();
        aggregator.increment(Emotion::Happy);
        assert_eq!(before.total_faces(), 1);
        assert_eq!(aggregator.snapshot().total_faces(), 2);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let aggregator = EmotionAggregator::new();
        aggregator.increment(Emotion::Sad);
        aggregator.reset();
        let summary = aggregator.snapshot();
        assert_eq!(summary.total_faces(), 0);
        assert_eq!(summary.count(Emotion::Sad), 0);
    }

    #[test]
    fn test_snapshots_stay_consistent_under_concurrent_increments() {
        let aggregator = Arc::new(EmotionAggregator::new());

        let writer = {
            let aggregator = aggregator.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    aggregator.increment(Emotion::ALL[i % 7]);
                }
            })
        };

        // every observed snapshot must satisfy the histogram invariant
        for _ in 0..200 {
            let summary = aggregator.snapshot();
            let histogram_sum: u64 = summary.iter().map(|(_, n)| n).sum();
            assert_eq!(histogram_sum, summary.total_faces());
        }

        writer.join().unwrap();
        assert_eq!(aggregator.snapshot().total_faces(), 2_000);
    }
}
