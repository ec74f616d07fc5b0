use std::collections::VecDeque;

/// Outcome of feeding one per-frame observation into the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSignal {
    NoAlert,
    Triggered,
}

/// Rolling vote over the last `window` frames.
///
/// A single positive frame is noise; `threshold` positives inside the
/// window means the condition has persisted. The check is
/// `positives >= threshold`, evaluated after eviction and insertion, and
/// does not wait for the window to fill. On a trigger the history and
/// count are cleared before returning, so the next observation starts
/// from an empty window and the same burst cannot fire twice.
///
/// Owned exclusively by the pipeline thread; not synchronized.
pub struct DetectionAggregator {
    history: VecDeque<bool>,
    window: usize,
    threshold: usize,
    positives: usize,
}

impl DetectionAggregator {
    /// Callers must ensure `threshold <= window`; config validation
    /// rejects anything else before the pipeline is built.
    pub fn new(window: usize, threshold: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window),
            window,
            threshold,
            positives: 0,
        }
    }

    pub fn observe(&mut self, condition_present: bool) -> AlertSignal {
        if self.history.len() == self.window {
            if let Some(true) = self.history.pop_front() {
                self.positives -= 1;
            }
        }

        self.history.push_back(condition_present);
        if condition_present {
            self.positives += 1;
        }

        if self.positives >= self.threshold {
            self.history.clear();
            self.positives = 0;
            return AlertSignal::Triggered;
        }

        AlertSignal::NoAlert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_never_exceeds_window() {
        let mut agg = DetectionAggregator::new(4, 4);
        for i in 0..20 {
            agg.observe(i % 3 == 0);
            assert!(agg.history.len() <= 4);

            // the running count always matches the trues actually held
            let held: usize = agg.history.iter().filter(|&&v| v).count();
            assert_eq!(agg.positives, held);
        }
    }

    #[test]
    fn test_eviction_drops_oldest_vote() {
        let mut agg = DetectionAggregator::new(3, 3);
        agg.observe(true);
        agg.observe(false);
        agg.observe(false);
        assert_eq!(agg.positives, 1);

        // fourth observation evicts the original true
        agg.observe(false);
        assert_eq!(agg.positives, 0);
        assert_eq!(agg.history.len(), 3);
    }

    #[test]
    fn test_threshold_boundary_fires_exactly_once() {
        let mut agg = DetectionAggregator::new(10, 10);

        for _ in 0..9 {
            assert_eq!(agg.observe(true), AlertSignal::NoAlert);
        }
        assert_eq!(agg.observe(true), AlertSignal::Triggered);
    }

    #[test]
    fn test_reset_on_trigger() {
        let mut agg = DetectionAggregator::new(5, 3);
        agg.observe(true);
        agg.observe(true);
        assert_eq!(agg.observe(true), AlertSignal::Triggered);

        // the window restarts empty: this observation is the only entry
        assert_eq!(agg.observe(true), AlertSignal::NoAlert);
        assert_eq!(agg.history.len(), 1);
        assert_eq!(agg.positives, 1);
    }

    #[test]
    fn test_no_refire_on_stale_history() {
        let mut agg = DetectionAggregator::new(5, 3);
        for _ in 0..3 {
            agg.observe(true);
        }
        // after the reset, two positives are not enough again
        assert_eq!(agg.observe(true), AlertSignal::NoAlert);
        assert_eq!(agg.observe(true), AlertSignal::NoAlert);
        assert_eq!(agg.observe(true), AlertSignal::Triggered);
    }

    // The documented semantics for the interleaved case: with window 3 and
    // threshold 2, [true, false, true] reaches two positives on the third
    // call and triggers, because the check runs post-insertion and does
    // not require a full window of positives.
    #[test]
    fn test_interleaved_positives_trigger_on_third_call() {
        let mut agg = DetectionAggregator::new(3, 2);
        assert_eq!(agg.observe(true), AlertSignal::NoAlert);
        assert_eq!(agg.observe(false), AlertSignal::NoAlert);
        assert_eq!(agg.observe(true), AlertSignal::Triggered);
    }

    #[test]
    fn test_sparse_positives_never_trigger() {
        let mut agg = DetectionAggregator::new(10, 10);
        for i in 0..100 {
            assert_eq!(agg.observe(i % 2 == 0), AlertSignal::NoAlert);
        }
    }
}
