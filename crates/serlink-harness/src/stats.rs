//! Local session counters and their derivation into the results image.

use std::time::Duration;

use serlink_core::Results;

/// Counters accumulated across both data phases of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Payload bytes delivered by the reassembler.
    pub total_received_bytes: u64,
    /// Frames delivered in order by the reassembler.
    pub received_count: u32,
    /// Format, checksum, and content failures combined.
    pub error_count: u32,
    /// Frames re-sent after a previous attempt, plus failed-burst credits.
    pub retransmit_count: u32,
}

impl Stats {
    /// Derive the exchangeable results image.
    ///
    /// Throughput is `bytes / (1024² · elapsed)`; CPS is `bytes / elapsed`.
    pub fn into_results(self, elapsed: Duration) -> Results {
        let secs = elapsed.as_secs_f64();
        let (throughput_mb_per_s, chars_per_s) = if secs > 0.0 {
            let bytes = self.total_received_bytes as f64;
            (bytes / (1024.0 * 1024.0) / secs, bytes / secs)
        } else {
            (0.0, 0.0)
        };

        Results {
            total_received_bytes: self.total_received_bytes,
            received_count: self.received_count,
            error_count: self.error_count,
            retransmit_count: self.retransmit_count,
            elapsed_seconds: secs,
            throughput_mb_per_s,
            chars_per_s,
        }
    }
}
