//! Threaded transmission engine for one unidirectional data phase.
//!
//! The send side runs two tasks inside a [`std::thread::scope`]: a sender
//! that bursts unacknowledged window frames onto the link, and an ack
//! receiver that folds incoming bitmap acknowledgments back into the shared
//! window. The receive side is a single loop: read one frame, ack it
//! immediately on clean parse, validate, offer to the reassembler.
//!
//! Both read loops dispatch on the leading record byte rather than assuming
//! a homogeneous stream. The two data phases overlap across peers — one
//! side enters its send phase while the other may still be retransmitting
//! the previous phase — so an ack stream can carry stale data frames and a
//! data stream can carry stale acks. Dispatching keeps the stream
//! record-aligned through that window.
//!
//! All blocking lives in the link; the shared window sits behind one mutex
//! and every operation under the lock is O(1) amortized.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serlink_core::constants::{ACK_BITMAP_WIDTH, ACK_FRAME_LEN, SOF_CONTROL, SOF_DATA};
use serlink_core::frame::{AckFrame, DataFrame, encode_data_frame};
use serlink_core::{PayloadPattern, xor_rotate};
use serlink_link::{Link, LinkError};
use serlink_protocol::{Offer, Reassembler, SendWindow, WindowParams, burst_cap};

use crate::error::SessionError;

/// Assumed round-trip when none is measured; feeds window adaptation.
const NOMINAL_RTT_MS: f64 = 100.0;
/// Budget for the leading byte of the next record in the ack receiver.
const ACK_READ_BUDGET: Duration = Duration::from_millis(100);
/// Budget for the leading byte of the next record in the receive loop.
const DATA_READ_BUDGET: Duration = Duration::from_millis(3000);
/// Pause after each burst, keeping the receiver ahead of the sender.
const BURST_PAUSE: Duration = Duration::from_micros(100);
/// Pause when every window frame is in flight.
const IDLE_PAUSE: Duration = Duration::from_millis(10);

/// What the ack receiver does with a stale data frame found in its stream.
///
/// During the first send phase incoming data belongs to the peer's next
/// phase: consume to stay aligned, never acknowledge (the real receive loop
/// has not seen it; the peer's pacing will re-send). During the second send
/// phase incoming data can only be a duplicate the peer re-sent because an
/// ack from our completed receive phase was lost: re-acknowledge it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleFrames {
    Discard,
    Reack,
}

/// Send-side phase result.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOutcome {
    pub retransmit_count: u32,
}

/// Receive-side phase result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiveOutcome {
    pub received_count: u32,
    pub total_received_bytes: u64,
    pub error_count: u32,
}

/// Transmit `frame_count` frames of `pattern` and block until every one is
/// acknowledged, the phase stalls, or the session is cancelled.
#[allow(clippy::too_many_arguments)]
pub fn run_send_phase(
    link: &dyn Link,
    pattern: PayloadPattern,
    payload_size: u32,
    frame_count: u32,
    window_params: WindowParams,
    burst_limit: usize,
    stall_budget: Duration,
    stale_frames: StaleFrames,
    cancel: &AtomicBool,
) -> Result<SendOutcome, SessionError> {
    let payload = pattern.fill(payload_size as usize);
    let checksum = xor_rotate(&payload);
    let burst_limit = burst_limit.min(burst_cap(payload.len())).max(1);
    // A frame is only re-sent once it has gone unacknowledged for a full
    // line-rate transfer budget.
    let retransmit_after = link.default_timeout(DataFrame::wire_len(payload.len()));

    let window = Mutex::new(SendWindow::with_params(frame_count, window_params));
    let abort = AtomicBool::new(false);

    tracing::info!(frame_count, payload_size, burst_limit, "send phase starting");

    let (sent_result, ack_result) = std::thread::scope(|scope| {
        let sender = scope.spawn(|| {
            sender_task(
                link,
                &window,
                &payload,
                checksum,
                frame_count,
                burst_limit,
                retransmit_after,
                stall_budget,
                cancel,
                &abort,
            )
        });
        let acker = scope.spawn(|| {
            ack_task(
                link,
                &window,
                frame_count,
                payload_size as usize,
                stale_frames,
                cancel,
                &abort,
            )
        });
        (
            sender.join().expect("sender task panicked"),
            acker.join().expect("ack task panicked"),
        )
    });

    let retransmit_count = sent_result?;
    ack_result?;

    tracing::info!(retransmit_count, "send phase complete");
    Ok(SendOutcome { retransmit_count })
}

#[allow(clippy::too_many_arguments)]
fn sender_task(
    link: &dyn Link,
    window: &Mutex<SendWindow>,
    payload: &[u8],
    checksum: u16,
    frame_count: u32,
    burst_limit: usize,
    retransmit_after: Duration,
    stall_budget: Duration,
    cancel: &AtomicBool,
    abort: &AtomicBool,
) -> Result<u32, SessionError> {
    let mut last_sent: Vec<Option<Instant>> = vec![None; frame_count as usize];
    let mut retransmit_count = 0u32;
    let mut burst = Vec::new();
    let mut last_base = 0u32;
    let mut last_progress = Instant::now();

    loop {
        if cancel.load(Ordering::Relaxed) {
            abort.store(true, Ordering::Relaxed);
            return Err(SessionError::Cancelled);
        }
        if abort.load(Ordering::Relaxed) {
            // The ack task failed; its error wins.
            return Ok(retransmit_count);
        }

        let (pending, window_size, base, complete) = {
            let w = window.lock().expect("window lock poisoned");
            (w.frames_to_send(), w.size(), w.base(), w.is_complete())
        };
        if complete {
            return Ok(retransmit_count);
        }

        if base != last_base {
            last_base = base;
            last_progress = Instant::now();
        } else if last_progress.elapsed() > stall_budget {
            abort.store(true, Ordering::Relaxed);
            return Err(SessionError::Stalled(stall_budget));
        }

        // Unsent frames go out immediately; sent ones wait out the
        // retransmit pacing budget first.
        let now = Instant::now();
        let due: Vec<u32> = pending
            .iter()
            .copied()
            .filter(|&f| match last_sent[f as usize] {
                None => true,
                Some(at) => now.duration_since(at) >= retransmit_after,
            })
            .take(burst_limit)
            .collect();

        if due.is_empty() {
            std::thread::sleep(IDLE_PAUSE);
            continue;
        }

        burst.clear();
        for &f in &due {
            if last_sent[f as usize].is_some() {
                retransmit_count += 1;
                tracing::debug!(frame_number = f, "retransmitting frame");
            }
            last_sent[f as usize] = Some(now);
            encode_data_frame(&mut burst, f, window_size, checksum, payload);
        }

        match link.write(&burst) {
            Ok(()) => {
                tracing::trace!(frames = due.len(), bytes = burst.len(), "burst written");
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(frames = due.len(), "burst write timed out");
                retransmit_count += due.len() as u32;
                window
                    .lock()
                    .expect("window lock poisoned")
                    .adjust(false, 0.0);
            }
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                return Err(SessionError::Transport(e));
            }
        }

        std::thread::sleep(BURST_PAUSE);
    }
}

fn ack_task(
    link: &dyn Link,
    window: &Mutex<SendWindow>,
    frame_count: u32,
    payload_size: usize,
    stale_frames: StaleFrames,
    cancel: &AtomicBool,
    abort: &AtomicBool,
) -> Result<(), SessionError> {
    let frame_len = DataFrame::wire_len(payload_size);
    let mut record = vec![0u8; frame_len.max(ACK_FRAME_LEN)];

    loop {
        if cancel.load(Ordering::Relaxed) || abort.load(Ordering::Relaxed) {
            return Ok(());
        }
        if window.lock().expect("window lock poisoned").is_complete() {
            return Ok(());
        }

        // Leading-byte dispatch keeps the stream record-aligned.
        match link.read_exact_with_timeout(&mut record[..1], ACK_READ_BUDGET) {
            Ok(()) => {}
            Err(e) if e.is_timeout() => continue,
            Err(LinkError::Closed) => {
                if window.lock().expect("window lock poisoned").is_complete() {
                    return Ok(());
                }
                abort.store(true, Ordering::Relaxed);
                return Err(SessionError::Transport(LinkError::Closed));
            }
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                return Err(SessionError::Transport(e));
            }
        }

        match record[0] {
            SOF_CONTROL => {
                if read_record_tail(link, &mut record[1..ACK_FRAME_LEN]).map_abort(abort)? {
                    match AckFrame::parse(&record[..ACK_FRAME_LEN]) {
                        Ok(ack) => apply_ack(window, frame_count, ack),
                        Err(e) => tracing::trace!(error = %e, "discarding unparseable ack"),
                    }
                }
            }
            SOF_DATA => {
                if read_record_tail(link, &mut record[1..frame_len]).map_abort(abort)? {
                    handle_stale_frame(link, &record[..frame_len], frame_count, stale_frames)
                        .map_abort(abort)?;
                }
            }
            other => {
                tracing::trace!(byte = other, "discarding stray byte in ack stream");
            }
        }
    }
}

/// A stale data frame surfaced in the ack stream; see [`StaleFrames`].
fn handle_stale_frame(
    link: &dyn Link,
    record: &[u8],
    frame_count: u32,
    stale_frames: StaleFrames,
) -> Result<(), LinkError> {
    let Ok(frame) = DataFrame::parse(record) else {
        tracing::trace!("discarding unparseable stale data frame");
        return Ok(());
    };
    if frame.frame_number >= frame_count {
        return Ok(());
    }
    match stale_frames {
        StaleFrames::Discard => {
            tracing::debug!(
                frame_number = frame.frame_number,
                "early next-phase frame consumed; peer will re-send"
            );
            Ok(())
        }
        StaleFrames::Reack => {
            tracing::debug!(frame_number = frame.frame_number, "re-acking stale duplicate");
            match link.write(&AckFrame::single(frame.frame_number).serialize()) {
                Ok(()) => Ok(()),
                Err(e) if e.is_timeout() => Ok(()),
                Err(e) => Err(e),
            }
        }
    }
}

/// Read the remainder of a record whose leading byte was just consumed.
///
/// Returns `Ok(false)` when the tail timed out (partial record dropped).
fn read_record_tail(link: &dyn Link, tail: &mut [u8]) -> Result<bool, LinkError> {
    let budget = link.default_timeout(tail.len());
    match link.read_exact_with_timeout(tail, budget) {
        Ok(()) => Ok(true),
        Err(e) if e.is_timeout() => {
            tracing::trace!(expected = tail.len(), "record tail timed out");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Adapter: fatal link errors flip the shared abort flag before propagating.
trait MapAbort<T> {
    fn map_abort(self, abort: &AtomicBool) -> Result<T, SessionError>;
}

impl<T> MapAbort<T> for Result<T, LinkError> {
    fn map_abort(self, abort: &AtomicBool) -> Result<T, SessionError> {
        self.map_err(|e| {
            abort.store(true, Ordering::Relaxed);
            SessionError::Transport(e)
        })
    }
}

fn apply_ack(window: &Mutex<SendWindow>, frame_count: u32, ack: AckFrame) {
    let mut w = window.lock().expect("window lock poisoned");
    let mut newly_acked = 0u32;

    for offset in 0..ACK_BITMAP_WIDTH {
        let Some(frame_number) = ack.base.checked_add(offset) else {
            break;
        };
        if frame_number >= frame_count {
            break;
        }
        if ack.is_acked(frame_number) && w.mark_acked(frame_number) {
            newly_acked += 1;
        }
    }

    if newly_acked > 0 {
        w.slide();
        w.adjust(true, NOMINAL_RTT_MS);
        tracing::trace!(
            base = w.base(),
            newly_acked,
            window_size = w.size(),
            "acks applied"
        );
    }
}

/// Receive `frame_count` frames of `expect`, acknowledging each clean parse
/// immediately, until the delivered prefix is complete.
pub fn run_receive_phase(
    link: &dyn Link,
    expect: PayloadPattern,
    payload_size: u32,
    frame_count: u32,
    stall_budget: Duration,
    cancel: &AtomicBool,
) -> Result<ReceiveOutcome, SessionError> {
    let frame_len = DataFrame::wire_len(payload_size as usize);
    let mut reassembler = Reassembler::new(frame_count);
    let mut outcome = ReceiveOutcome::default();
    let mut record = vec![0u8; frame_len.max(ACK_FRAME_LEN)];
    let mut last_progress = Instant::now();
    // One desync run counts as one format error however many bytes it eats.
    let mut scanning = false;

    tracing::info!(frame_count, payload_size, "receive phase starting");

    while !reassembler.is_complete() {
        if cancel.load(Ordering::Relaxed) {
            return Err(SessionError::Cancelled);
        }
        if last_progress.elapsed() > stall_budget {
            return Err(SessionError::Stalled(stall_budget));
        }

        match link.read_exact_with_timeout(&mut record[..1], DATA_READ_BUDGET) {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                tracing::debug!(
                    next_expected = reassembler.next_expected(),
                    "data read timed out"
                );
                continue;
            }
            Err(e) => return Err(SessionError::Transport(e)),
        }

        match record[0] {
            SOF_DATA => {
                scanning = false;
                match read_record_tail(link, &mut record[1..frame_len]) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => return Err(SessionError::Transport(e)),
                }
                receive_frame(
                    link,
                    &record[..frame_len],
                    expect,
                    payload_size,
                    frame_count,
                    &mut reassembler,
                    &mut outcome,
                    &mut last_progress,
                )?;
            }
            SOF_CONTROL => {
                // A stale ack left over from the previous phase.
                scanning = false;
                match read_record_tail(link, &mut record[1..ACK_FRAME_LEN]) {
                    Ok(_) => tracing::debug!("stale control frame skipped"),
                    Err(e) => return Err(SessionError::Transport(e)),
                }
            }
            other => {
                if !scanning {
                    scanning = true;
                    outcome.error_count += 1;
                    tracing::debug!(byte = other, "stream desync, scanning for frame start");
                }
            }
        }
    }

    tracing::info!(
        received = outcome.received_count,
        errors = outcome.error_count,
        "receive phase complete"
    );
    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
fn receive_frame(
    link: &dyn Link,
    record: &[u8],
    expect: PayloadPattern,
    payload_size: u32,
    frame_count: u32,
    reassembler: &mut Reassembler,
    outcome: &mut ReceiveOutcome,
    last_progress: &mut Instant,
) -> Result<(), SessionError> {
    let frame = match DataFrame::parse(record) {
        Ok(frame) => frame,
        Err(e) => {
            outcome.error_count += 1;
            tracing::debug!(error = %e, "frame parse failed");
            return Ok(());
        }
    };

    if frame.frame_number >= frame_count {
        tracing::debug!(frame_number = frame.frame_number, "frame number out of range");
        return Ok(());
    }

    // Ack immediately on clean parse, before validation: the wire delivered
    // the frame intact, so the sender must not re-send it even if the
    // content turns out to be wrong.
    match link.write(&AckFrame::single(frame.frame_number).serialize()) {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            tracing::debug!(frame_number = frame.frame_number, "ack write timed out");
        }
        Err(e) => return Err(SessionError::Transport(e)),
    }

    let checksum_ok = frame.verify_checksum();
    let content_ok = checksum_ok && expect.matches(&frame.payload);
    if !checksum_ok {
        tracing::warn!(frame_number = frame.frame_number, "checksum mismatch");
    } else if !content_ok {
        tracing::warn!(frame_number = frame.frame_number, "payload pattern mismatch");
    }

    match reassembler.offer(frame.frame_number, frame.payload, content_ok) {
        Offer::Duplicate => {
            tracing::debug!(frame_number = frame.frame_number, "duplicate frame re-acked");
        }
        Offer::Buffered => {
            *last_progress = Instant::now();
        }
        Offer::Delivered { run } => {
            credit_delivery(outcome, run, payload_size, frame_count);
            *last_progress = Instant::now();
        }
        Offer::ContentInvalid { delivered } => {
            outcome.error_count += 1;
            credit_delivery(outcome, delivered, payload_size, frame_count);
            *last_progress = Instant::now();
        }
    }
    Ok(())
}

fn credit_delivery(outcome: &mut ReceiveOutcome, run: u32, payload_size: u32, frame_count: u32) {
    if run == 0 {
        return;
    }
    outcome.received_count += run;
    outcome.total_received_bytes += u64::from(run) * u64::from(payload_size);
    let done = outcome.received_count;
    if done % 100 == 0 || done <= 10 || done == frame_count {
        tracing::info!(received = done, total = frame_count, "progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serlink_link::MemoryLink;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    const STALL: Duration = Duration::from_secs(5);

    /// Scripted peer: reads whole data frames and acks every clean parse,
    /// like the real receive loop but without validation.
    fn echo_acks(link: &MemoryLink, payload_size: usize, frame_count: u32) {
        let frame_len = DataFrame::wire_len(payload_size);
        let mut buf = vec![0u8; frame_len];
        let mut seen = std::collections::BTreeSet::new();
        while (seen.len() as u32) < frame_count {
            if link
                .read_exact_with_timeout(&mut buf, Duration::from_secs(2))
                .is_err()
            {
                return;
            }
            let frame = DataFrame::parse(&buf).expect("test peer got garbage");
            seen.insert(frame.frame_number);
            link.write(&AckFrame::single(frame.frame_number).serialize())
                .expect("ack write failed");
        }
    }

    #[test]
    fn send_phase_completes_against_acking_peer() {
        let (local, remote) = MemoryLink::pair(115_200);
        let cancel = no_cancel();

        let outcome = std::thread::scope(|scope| {
            scope.spawn(|| echo_acks(&remote, 8, 5));
            run_send_phase(
                &local,
                PayloadPattern::Ascending,
                8,
                5,
                WindowParams::default(),
                16,
                STALL,
                StaleFrames::Discard,
                &cancel,
            )
        })
        .unwrap();

        assert_eq!(outcome.retransmit_count, 0);
    }

    #[test]
    fn send_phase_reacks_stale_duplicate_in_second_phase() {
        let (local, remote) = MemoryLink::pair(115_200);
        let cancel = no_cancel();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                // Peer re-sends a duplicate of its own phase-1 frame whose
                // ack was supposedly lost, interleaved with our data burst.
                let dup = DataFrame::new(1, 16, PayloadPattern::Ascending.fill(8));
                remote.write(&dup.serialize()).unwrap();

                // Dispatch on leading bytes: collect both of our data frames
                // and the re-ack, in whatever order they interleave.
                let frame_len = DataFrame::wire_len(8);
                let mut record = vec![0u8; frame_len.max(ACK_FRAME_LEN)];
                let mut frames_seen = std::collections::BTreeSet::new();
                let mut saw_reack = false;
                while !saw_reack || frames_seen.len() < 2 {
                    remote
                        .read_exact_with_timeout(&mut record[..1], Duration::from_secs(2))
                        .unwrap();
                    match record[0] {
                        SOF_DATA => {
                            remote
                                .read_exact_with_timeout(
                                    &mut record[1..frame_len],
                                    Duration::from_secs(2),
                                )
                                .unwrap();
                            let frame = DataFrame::parse(&record[..frame_len]).unwrap();
                            frames_seen.insert(frame.frame_number);
                        }
                        SOF_CONTROL => {
                            remote
                                .read_exact_with_timeout(
                                    &mut record[1..ACK_FRAME_LEN],
                                    Duration::from_secs(2),
                                )
                                .unwrap();
                            let ack = AckFrame::parse(&record[..ACK_FRAME_LEN]).unwrap();
                            assert!(ack.is_acked(1), "re-ack must cover the duplicate");
                            saw_reack = true;
                        }
                        other => panic!("unexpected leading byte {other:#04x}"),
                    }
                }

                for f in [0u32, 1] {
                    remote.write(&AckFrame::single(f).serialize()).unwrap();
                }
            });

            run_send_phase(
                &local,
                PayloadPattern::Descending,
                8,
                2,
                WindowParams::default(),
                16,
                STALL,
                StaleFrames::Reack,
                &cancel,
            )
        })
        .unwrap();
    }

    #[test]
    fn receive_phase_delivers_and_acks() {
        let (local, remote) = MemoryLink::pair(115_200);
        let cancel = no_cancel();
        let payload = PayloadPattern::Ascending.fill(8);

        let outcome = std::thread::scope(|scope| {
            scope.spawn(|| {
                for f in 0..4u32 {
                    let frame = DataFrame::new(f, 16, payload.clone());
                    remote.write(&frame.serialize()).unwrap();
                }
            });
            run_receive_phase(&local, PayloadPattern::Ascending, 8, 4, STALL, &cancel)
        })
        .unwrap();

        assert_eq!(outcome.received_count, 4);
        assert_eq!(outcome.total_received_bytes, 32);
        assert_eq!(outcome.error_count, 0);

        // Every frame was acknowledged exactly once, in arrival order.
        let mut ack_buf = [0u8; ACK_FRAME_LEN];
        for f in 0..4u32 {
            remote
                .read_exact_with_timeout(&mut ack_buf, Duration::from_secs(1))
                .unwrap();
            let ack = AckFrame::parse(&ack_buf).unwrap();
            assert!(ack.is_acked(f));
        }
    }

    #[test]
    fn receive_phase_reacks_duplicates() {
        let (local, remote) = MemoryLink::pair(115_200);
        let cancel = no_cancel();
        let payload = PayloadPattern::Ascending.fill(8);

        let outcome = std::thread::scope(|scope| {
            scope.spawn(|| {
                let zero = DataFrame::new(0, 16, payload.clone());
                remote.write(&zero.serialize()).unwrap();
                remote.write(&zero.serialize()).unwrap(); // duplicate
                let one = DataFrame::new(1, 16, payload.clone());
                remote.write(&one.serialize()).unwrap();
            });
            run_receive_phase(&local, PayloadPattern::Ascending, 8, 2, STALL, &cancel)
        })
        .unwrap();

        assert_eq!(outcome.received_count, 2);
        assert_eq!(outcome.error_count, 0);

        // Three acks: 0, 0 again, 1.
        let mut ack_buf = [0u8; ACK_FRAME_LEN];
        let mut bases = Vec::new();
        for _ in 0..3 {
            remote
                .read_exact_with_timeout(&mut ack_buf, Duration::from_secs(1))
                .unwrap();
            bases.push(AckFrame::parse(&ack_buf).unwrap().base);
        }
        assert_eq!(bases, vec![0, 0, 1]);
    }

    #[test]
    fn receive_phase_skips_stale_ack_records() {
        let (local, remote) = MemoryLink::pair(115_200);
        let cancel = no_cancel();
        let payload = PayloadPattern::Ascending.fill(8);

        let outcome = std::thread::scope(|scope| {
            scope.spawn(|| {
                // A leftover ack from the previous phase precedes the data.
                remote.write(&AckFrame::single(7).serialize()).unwrap();
                remote
                    .write(&DataFrame::new(0, 16, payload.clone()).serialize())
                    .unwrap();
            });
            run_receive_phase(&local, PayloadPattern::Ascending, 8, 1, STALL, &cancel)
        })
        .unwrap();

        assert_eq!(outcome.received_count, 1);
        assert_eq!(outcome.error_count, 0);
    }

    #[test]
    fn cancelled_send_phase_returns_promptly() {
        let (local, _remote) = MemoryLink::pair(115_200);
        let cancel = AtomicBool::new(true);

        let err = run_send_phase(
            &local,
            PayloadPattern::Ascending,
            8,
            100,
            WindowParams::default(),
            16,
            STALL,
            StaleFrames::Discard,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }

    #[test]
    fn receive_phase_counts_corrupt_checksum_but_delivers() {
        let (local, remote) = MemoryLink::pair(115_200);
        let cancel = no_cancel();
        let payload = PayloadPattern::Ascending.fill(8);

        let outcome = std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut frame = DataFrame::new(0, 16, payload.clone());
                frame.payload[3] ^= 0x40; // checksum now stale
                remote.write(&frame.serialize()).unwrap();
                remote
                    .write(&DataFrame::new(1, 16, payload.clone()).serialize())
                    .unwrap();
            });
            run_receive_phase(&local, PayloadPattern::Ascending, 8, 2, STALL, &cancel)
        })
        .unwrap();

        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.received_count, 2);
        assert_eq!(outcome.total_received_bytes, 16);
    }
}
