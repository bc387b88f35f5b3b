//! In-memory paired duplex for deterministic testing.
//!
//! [`MemoryLink::pair`] returns two connected endpoints backed by a pair of
//! byte pipes. Each endpoint can inject faults into its own transmit path —
//! added latency, dropped byte ranges, and single-byte flips addressed by
//! absolute transmit offset — so loss and corruption scenarios replay
//! byte-exact.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::LinkError;
use crate::traits::Link;

#[derive(Default)]
struct PipeState {
    buf: VecDeque<u8>,
    closed: bool,
}

/// One direction of the duplex: a Condvar-signalled byte queue.
struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

impl Pipe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PipeState::default()),
            readable: Condvar::new(),
        })
    }

    fn push(&self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut state = self.state.lock().expect("pipe lock poisoned");
        if state.closed {
            return Err(LinkError::Closed);
        }
        state.buf.extend(bytes);
        self.readable.notify_all();
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock().expect("pipe lock poisoned");
        state.closed = true;
        self.readable.notify_all();
    }

    fn read_some(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("pipe lock poisoned");
        loop {
            if !state.buf.is_empty() {
                let n = buf.len().min(state.buf.len());
                for slot in buf.iter_mut().take(n) {
                    *slot = state.buf.pop_front().expect("length checked");
                }
                return Ok(n);
            }
            if state.closed {
                return Err(LinkError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(LinkError::Timeout {
                    received: 0,
                    expected: buf.len(),
                });
            }
            let (guard, _) = self
                .readable
                .wait_timeout(state, deadline - now)
                .expect("pipe lock poisoned");
            state = guard;
        }
    }
}

/// Deterministic transmit-side fault injection, addressed by the absolute
/// offset of each byte in the link's transmit stream.
#[derive(Default)]
struct Faults {
    latency: Duration,
    /// Half-open `[start, end)` offset ranges to drop.
    drops: Vec<(u64, u64)>,
    /// Offset → XOR mask.
    flips: BTreeMap<u64, u8>,
    /// Absolute offset of the next byte to be written.
    cursor: u64,
}

impl Faults {
    fn apply(&mut self, buf: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(buf.len());
        for (i, &byte) in buf.iter().enumerate() {
            let offset = self.cursor + i as u64;
            if self.drops.iter().any(|&(s, e)| offset >= s && offset < e) {
                continue;
            }
            match self.flips.get(&offset) {
                Some(&mask) => out.push(byte ^ mask),
                None => out.push(byte),
            }
        }
        self.cursor += buf.len() as u64;
        out
    }
}

/// One endpoint of an in-memory duplex.
pub struct MemoryLink {
    rx: Arc<Pipe>,
    tx: Arc<Pipe>,
    baud: u32,
    faults: Mutex<Faults>,
}

impl MemoryLink {
    /// Two connected endpoints sharing a pair of byte pipes.
    pub fn pair(baud: u32) -> (Self, Self) {
        let a_to_b = Pipe::new();
        let b_to_a = Pipe::new();
        let a = Self {
            rx: Arc::clone(&b_to_a),
            tx: Arc::clone(&a_to_b),
            baud,
            faults: Mutex::new(Faults::default()),
        };
        let b = Self {
            rx: a_to_b,
            tx: b_to_a,
            baud,
            faults: Mutex::new(Faults::default()),
        };
        (a, b)
    }

    /// Delay every write by `latency` before the bytes become readable.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.lock().expect("fault lock poisoned").latency = latency;
    }

    /// Drop `len` transmit bytes starting at absolute offset `start`.
    pub fn drop_tx_range(&self, start: u64, len: u64) {
        self.faults
            .lock()
            .expect("fault lock poisoned")
            .drops
            .push((start, start + len));
    }

    /// XOR the transmit byte at absolute offset `offset` with `mask`.
    pub fn flip_tx_byte(&self, offset: u64, mask: u8) {
        self.faults
            .lock()
            .expect("fault lock poisoned")
            .flips
            .insert(offset, mask);
    }

    /// Absolute offset of the next transmit byte; useful for positioning
    /// fault ranges relative to what has already been written.
    pub fn tx_offset(&self) -> u64 {
        self.faults.lock().expect("fault lock poisoned").cursor
    }
}

impl Link for MemoryLink {
    fn write(&self, buf: &[u8]) -> Result<(), LinkError> {
        let (bytes, latency) = {
            let mut faults = self.faults.lock().expect("fault lock poisoned");
            (faults.apply(buf), faults.latency)
        };
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        self.tx.push(&bytes)
    }

    fn read_exact_with_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<(), LinkError> {
        let deadline = Instant::now() + timeout;
        let mut received = 0;
        while received < buf.len() {
            let now = Instant::now();
            if now >= deadline {
                return Err(LinkError::Timeout {
                    received,
                    expected: buf.len(),
                });
            }
            match self.rx.read_some(&mut buf[received..], deadline - now) {
                Ok(n) => received += n,
                Err(LinkError::Timeout { .. }) => {
                    return Err(LinkError::Timeout {
                        received,
                        expected: buf.len(),
                    });
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn read_some_with_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, LinkError> {
        self.rx.read_some(buf, timeout)
    }

    fn flush(&self) -> Result<(), LinkError> {
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        // Wake the peer: its reads drain then report Closed, its writes fail.
        self.rx.close();
        self.tx.close();
    }
}
