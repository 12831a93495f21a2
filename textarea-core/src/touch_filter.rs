//! Touch-release jitter filtering.
//!
//! Finger-driven caret placement is noisy right before release: the last few
//! millimetres of a lift-off tend to be involuntary. The filter keeps a short
//! ring of `(offset, timestamp)` samples recorded during the drag and, on
//! release, walks back past the samples younger than [`AFTER_WINDOW`]. If the
//! first sample older than that window is also older than [`BEFORE_WINDOW`],
//! the drag was stable there and the release movement was jitter, so the
//! cursor re-targets that stable offset. Otherwise the raw final offset
//! stands.

use std::time::Duration;

use tracing::debug;

/// Number of drag samples retained.
pub const HISTORY_SIZE: usize = 5;

/// Samples younger than this at release are treated as lift-off jitter.
pub const AFTER_WINDOW: Duration = Duration::from_millis(150);

/// The fallback sample must be at least this old for a correction to apply.
pub const BEFORE_WINDOW: Duration = Duration::from_millis(350);

/// Ring buffer of recent `(offset, timestamp)` drag samples.
#[derive(Debug)]
pub struct TouchUpFilter {
    offsets: [usize; HISTORY_SIZE],
    times: [Duration; HISTORY_SIZE],
    index: usize,
    count: usize,
}

impl Default for TouchUpFilter {
    fn default() -> Self {
        Self {
            offsets: [0; HISTORY_SIZE],
            times: [Duration::ZERO; HISTORY_SIZE],
            index: 0,
            count: 0,
        }
    }
}

impl TouchUpFilter {
    /// Creates an empty sample history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a fresh sampling window with the press-time offset.
    pub fn start(&mut self, offset: usize, now: Duration) {
        self.count = 0;
        self.push(offset, now);
    }

    /// Appends a drag sample. Older samples fall out of the ring.
    pub fn push(&mut self, offset: usize, now: Duration) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.offsets[self.index] = offset;
        self.times[self.index] = now;
        self.count += 1;
    }

    /// Whether the drag recorded any movement past the initial press
    /// sample. A press that never moved is a tap on the handle, not a drag.
    pub fn moved(&self) -> bool {
        self.count > 1
    }

    /// Resolves the intended offset at release time.
    ///
    /// Returns `Some(offset)` when the history shows a stable position the
    /// cursor should be corrected back to; `None` means the final raw offset
    /// stands. With fewer than two samples, or when every sample is recent,
    /// there is no stable fallback and no correction applies.
    pub fn resolve(&self, now: Duration) -> Option<usize> {
        let max = self.count.min(HISTORY_SIZE);
        let mut consumed = 0;
        let mut index = self.index;
        while consumed < max && now.saturating_sub(self.times[index]) < AFTER_WINDOW {
            consumed += 1;
            index = (self.index + HISTORY_SIZE - consumed) % HISTORY_SIZE;
        }
        if consumed > 0
            && consumed < max
            && now.saturating_sub(self.times[index]) > BEFORE_WINDOW
        {
            debug!(offset = self.offsets[index], "touch-up jitter corrected");
            Some(self.offsets[index])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_recent_sample_without_stable_fallback_stands() {
        let mut filter = TouchUpFilter::new();
        filter.start(5, ms(0));
        filter.push(5, ms(200));
        filter.push(9, ms(400));
        // The t=400 sample is lift-off recent, but t=200 is only 220ms old.
        assert_eq!(filter.resolve(ms(420)), None);
    }

    #[test]
    fn test_jitter_corrected_to_stable_offset() {
        let mut filter = TouchUpFilter::new();
        filter.start(3, ms(0));
        filter.push(9, ms(400));
        // t=400 is recent jitter and t=0 is a 420ms-old stable position.
        assert_eq!(filter.resolve(ms(420)), Some(3));
    }

    #[test]
    fn test_single_sample_never_corrects() {
        let mut filter = TouchUpFilter::new();
        filter.start(7, ms(0));
        assert_eq!(filter.resolve(ms(500)), None);
    }

    #[test]
    fn test_all_samples_recent_never_corrects() {
        let mut filter = TouchUpFilter::new();
        filter.start(1, ms(1000));
        filter.push(2, ms(1040));
        filter.push(3, ms(1080));
        assert_eq!(filter.resolve(ms(1100)), None);
    }

    #[test]
    fn test_old_final_sample_stands() {
        let mut filter = TouchUpFilter::new();
        filter.start(2, ms(0));
        filter.push(8, ms(100));
        // Release long after the last movement: nothing is jitter.
        assert_eq!(filter.resolve(ms(1000)), None);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut filter = TouchUpFilter::new();
        filter.start(0, ms(0));
        for i in 1..=6 {
            filter.push(i, ms(i as u64 * 10));
        }
        // Seven samples pushed; only the newest five are considered, all of
        // which are recent at t=70, so no fallback exists.
        assert_eq!(filter.resolve(ms(70)), None);
    }

    #[test]
    fn test_restart_clears_history() {
        let mut filter = TouchUpFilter::new();
        filter.start(3, ms(0));
        filter.push(9, ms(400));
        filter.start(6, ms(410));
        // The stable t=0 sample is gone after the restart.
        assert_eq!(filter.resolve(ms(420)), None);
    }
}
