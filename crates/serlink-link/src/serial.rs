//! Serial port adapter.
//!
//! A thin [`Link`] over the OS serial driver via the `serialport` crate:
//! 8 data bits, one stop bit, no parity, no flow control, stale RX/TX
//! purged at open. The port handle is cloned so one read and one write can
//! be in flight concurrently; each side is serialized by its own mutex.

use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::LinkError;
use crate::traits::Link;

pub struct SerialLink {
    reader: Mutex<Box<dyn SerialPort>>,
    writer: Mutex<Box<dyn SerialPort>>,
    baud: u32,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("baud", &self.baud).finish()
    }
}

impl SerialLink {
    /// Open and configure `port` at `baud`, purging stale buffers.
    pub fn open(port: &str, baud: u32) -> Result<Self, LinkError> {
        let open_err = |reason: String| LinkError::Open {
            port: port.to_string(),
            reason,
        };

        let handle = serialport::new(port, baud)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| open_err(e.to_string()))?;

        handle
            .clear(ClearBuffer::All)
            .map_err(|e| open_err(format!("failed to purge buffers: {e}")))?;

        let writer = handle
            .try_clone()
            .map_err(|e| open_err(format!("failed to clone handle: {e}")))?;

        tracing::info!(port, baud, "serial port opened and purged");
        Ok(Self {
            reader: Mutex::new(handle),
            writer: Mutex::new(writer),
            baud,
        })
    }
}

impl Link for SerialLink {
    fn write(&self, buf: &[u8]) -> Result<(), LinkError> {
        let mut port = self.writer.lock().expect("writer lock poisoned");
        match port.write_all(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(LinkError::Timeout {
                received: 0,
                expected: buf.len(),
            }),
            Err(e) => Err(LinkError::Io(e)),
        }
    }

    fn read_exact_with_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<(), LinkError> {
        let deadline = Instant::now() + timeout;
        let mut port = self.reader.lock().expect("reader lock poisoned");
        let mut received = 0;

        while received < buf.len() {
            let now = Instant::now();
            if now >= deadline {
                return Err(LinkError::Timeout {
                    received,
                    expected: buf.len(),
                });
            }
            port.set_timeout(deadline - now).map_err(io_from_serial)?;
            match port.read(&mut buf[received..]) {
                Ok(0) => continue,
                Ok(n) => received += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(LinkError::Timeout {
                        received,
                        expected: buf.len(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
        Ok(())
    }

    fn read_some_with_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, LinkError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let deadline = Instant::now() + timeout;
        let mut port = self.reader.lock().expect("reader lock poisoned");

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(LinkError::Timeout {
                    received: 0,
                    expected: buf.len(),
                });
            }
            port.set_timeout(deadline - now).map_err(io_from_serial)?;
            match port.read(buf) {
                Ok(0) => continue,
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(LinkError::Timeout {
                        received: 0,
                        expected: buf.len(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
    }

    fn flush(&self) -> Result<(), LinkError> {
        let mut port = self.writer.lock().expect("writer lock poisoned");
        port.flush().map_err(LinkError::Io)
    }

    fn baud_rate(&self) -> u32 {
        self.baud
    }
}

fn io_from_serial(e: serialport::Error) -> LinkError {
    LinkError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_port_fails() {
        let err = SerialLink::open("/dev/serlink-no-such-port", 115_200).unwrap_err();
        assert!(matches!(err, LinkError::Open { .. }));
    }
}
