//! Send-side sliding window with adaptive sizing.
//!
//! [`SendWindow`] tracks which frames in `[base, base + size)` have been
//! acknowledged, slides the base over contiguous acknowledgments, and adapts
//! its size: sustained success doubles it, sustained failure or a high
//! round-trip halves it, always within `[min, max]`.

use std::collections::BTreeSet;

use crate::constants::{
    FAILURE_THRESHOLD, RTT_BACKOFF_MS, SUCCESS_THRESHOLD, WINDOW_INIT, WINDOW_MAX, WINDOW_MIN,
};

/// Window sizing bounds. Defaults are the protocol constants; a harness may
/// narrow them for tuning without changing wire behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub initial: u16,
    pub min: u16,
    pub max: u16,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            initial: WINDOW_INIT,
            min: WINDOW_MIN,
            max: WINDOW_MAX,
        }
    }
}

/// Send window state for one unidirectional data phase.
///
/// All operations are O(1) amortized; the engine shares one instance between
/// its sender and ack-receiver tasks behind a single mutex.
#[derive(Debug, Clone)]
pub struct SendWindow {
    /// First frame number not yet contiguously acknowledged.
    base: u32,
    /// Current window size in frames.
    size: u16,
    /// Total frames in this phase.
    frame_count: u32,
    /// Acknowledged frames within the window; every member is in
    /// `[base, base + size)`.
    acked: BTreeSet<u32>,
    consecutive_successes: u32,
    consecutive_failures: u32,
    params: WindowParams,
}

impl SendWindow {
    pub fn new(frame_count: u32) -> Self {
        Self::with_params(frame_count, WindowParams::default())
    }

    pub fn with_params(frame_count: u32, params: WindowParams) -> Self {
        Self {
            base: 0,
            size: params.initial,
            frame_count,
            acked: BTreeSet::new(),
            consecutive_successes: 0,
            consecutive_failures: 0,
            params,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Whether `frame_number` falls inside the current window.
    pub fn is_in_window(&self, frame_number: u32) -> bool {
        frame_number >= self.base && frame_number < self.base + u32::from(self.size)
    }

    pub fn is_acked(&self, frame_number: u32) -> bool {
        self.acked.contains(&frame_number)
    }

    /// Record an acknowledgment. Idempotent; frames outside the window or
    /// the session range are ignored (stale or corrupt acks).
    ///
    /// Returns `true` when the frame was newly marked.
    pub fn mark_acked(&mut self, frame_number: u32) -> bool {
        if frame_number >= self.frame_count || !self.is_in_window(frame_number) {
            return false;
        }
        self.acked.insert(frame_number)
    }

    /// Advance the base over contiguously acknowledged frames, evicting them.
    ///
    /// Returns the distance advanced. Calling twice in a row is a no-op the
    /// second time.
    pub fn slide(&mut self) -> u32 {
        let mut advanced = 0;
        while self.base < self.frame_count && self.acked.remove(&self.base) {
            self.base += 1;
            advanced += 1;
        }
        if advanced > 0 {
            tracing::trace!(base = self.base, advanced, "window slid");
        }
        advanced
    }

    /// Whether every frame has been acknowledged and evicted.
    pub fn is_complete(&self) -> bool {
        self.base >= self.frame_count
    }

    /// Frame numbers in the window that still need (re)transmission,
    /// in ascending order.
    pub fn frames_to_send(&self) -> Vec<u32> {
        let end = (self.base + u32::from(self.size)).min(self.frame_count);
        (self.base..end).filter(|f| !self.acked.contains(f)).collect()
    }

    /// Adapt the window size after a send outcome.
    ///
    /// Three consecutive successes double the size (up to `max`); three
    /// consecutive failures halve it (down to `min`); a round-trip above
    /// 2000 ms halves it regardless. The two streak counters reset each
    /// other.
    pub fn adjust(&mut self, success: bool, rtt_ms: f64) {
        if success {
            self.consecutive_successes += 1;
            self.consecutive_failures = 0;

            if self.consecutive_successes >= SUCCESS_THRESHOLD {
                let grown = (self.size * 2).min(self.params.max);
                if grown != self.size {
                    tracing::debug!(from = self.size, to = grown, "window grew");
                    self.size = grown;
                }
                self.consecutive_successes = 0;
            }

            if rtt_ms > RTT_BACKOFF_MS {
                let shrunk = self.shrink_floor((self.size / 2).max(self.params.min));
                if shrunk != self.size {
                    tracing::debug!(rtt_ms, from = self.size, to = shrunk, "window shrank on rtt");
                    self.size = shrunk;
                }
                self.consecutive_successes = 0;
            }
        } else {
            self.consecutive_failures += 1;
            self.consecutive_successes = 0;

            if self.consecutive_failures >= FAILURE_THRESHOLD {
                let shrunk = self.shrink_floor((self.size / 2).max(self.params.min));
                if shrunk != self.size {
                    tracing::debug!(from = self.size, to = shrunk, "window shrank on failures");
                    self.size = shrunk;
                }
                self.consecutive_failures = 0;
            }
        }
    }

    /// A shrink may never strand an outstanding acknowledgment outside
    /// `[base, base + size)`.
    fn shrink_floor(&self, candidate: u16) -> u16 {
        match self.acked.iter().next_back() {
            Some(&highest) => {
                let span = (highest - self.base + 1).min(u32::from(self.params.max)) as u16;
                candidate.max(span)
            }
            None => candidate,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn size_stays_bounded(outcomes in proptest::collection::vec(any::<(bool, bool)>(), 0..100)) {
            let mut w = SendWindow::new(10_000);
            for (success, slow) in outcomes {
                let rtt = if slow { 3000.0 } else { 100.0 };
                w.adjust(success, rtt);
                prop_assert!(w.size() >= WINDOW_MIN && w.size() <= WINDOW_MAX,
                    "size {} escaped [{WINDOW_MIN}, {WINDOW_MAX}]", w.size());
            }
        }

        #[test]
        fn base_is_monotone_and_bounded(
            acks in proptest::collection::vec(0u32..200, 0..400),
        ) {
            let mut w = SendWindow::new(150);
            let mut last_base = 0;
            for f in acks {
                w.mark_acked(f);
                w.slide();
                prop_assert!(w.base() >= last_base);
                prop_assert!(w.base() <= w.frame_count());
                // After a slide the base itself is never in the acked set.
                prop_assert!(!w.is_acked(w.base()));
                last_base = w.base();
            }
        }

        #[test]
        fn acked_set_stays_inside_window(
            acks in proptest::collection::vec(0u32..64, 0..200),
        ) {
            let mut w = SendWindow::new(64);
            for f in acks {
                w.mark_acked(f);
                w.slide();
                let end = w.base() + u32::from(w.size());
                for g in w.base()..end.min(64) {
                    // Membership implies window membership by construction;
                    // spot-check via the public queries.
                    if w.is_acked(g) {
                        prop_assert!(w.is_in_window(g));
                    }
                }
            }
        }
    }
}
