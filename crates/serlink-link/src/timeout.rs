//! Transfer-time based timeout derivation.

use std::time::Duration;

/// Safety multiplier over the nominal transfer time.
const SAFETY_FACTOR: f64 = 2.5;
/// Fixed slack added on top of the scaled transfer time.
const BASE_MS: u64 = 500;
const MIN_MS: u64 = 200;
const MAX_MS: u64 = 60_000;

/// Budget for moving `bytes` over a line running at `baud` bits per second.
///
/// Each byte costs ten bit times on the wire (8 data bits plus start and
/// stop framing). The nominal transfer time is scaled by 2.5 and padded by
/// 500 ms, then clamped to `[200 ms, 60 s]`.
pub fn transfer_timeout(bytes: usize, baud: u32) -> Duration {
    if baud == 0 {
        return Duration::from_millis(5000);
    }
    let transfer_ms = (bytes as f64 * 10.0 / f64::from(baud)) * 1000.0 * SAFETY_FACTOR;
    let total = transfer_ms as u64 + BASE_MS;
    Duration::from_millis(total.clamp(MIN_MS, MAX_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_transfer_hits_base() {
        // 16 bytes at 115200 baud: transfer time is negligible, budget is
        // dominated by the fixed slack.
        assert_eq!(transfer_timeout(16, 115_200), Duration::from_millis(503));
    }

    #[test]
    fn large_transfer_scales() {
        // 100 kB at 9600 baud: 100_000 * 10 / 9600 * 1000 * 2.5 ≈ 260_416 ms,
        // clamped to the 60 s ceiling.
        assert_eq!(transfer_timeout(100_000, 9_600), Duration::from_millis(60_000));
    }

    #[test]
    fn floor_applies() {
        assert!(transfer_timeout(0, 1_000_000) >= Duration::from_millis(200));
    }

    #[test]
    fn zero_baud_fallback() {
        assert_eq!(transfer_timeout(1024, 0), Duration::from_millis(5000));
    }

    #[test]
    fn mid_range_value() {
        // 4096 bytes at 115200: 4096*10/115200*1000*2.5 ≈ 888.9 ms + 500.
        let t = transfer_timeout(4096, 115_200);
        assert!(t > Duration::from_millis(1300) && t < Duration::from_millis(1500));
    }
}
