//! Byte-level access to a rotator controller.
//!
//! A [`RotatorLink`] only has to provide single `read`/`write` attempts. The
//! framing guarantees the protocol relies on (complete writes, draining stale
//! output, accumulating a response of a minimum length within a deadline) are
//! provided on top of those.

use crate::RotatorError;
use std::{
    collections::VecDeque,
    io,
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, trace};

/// Inactivity timer of a single read attempt.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper bound on how long [`RotatorLink::read_at_least`] waits for a response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 100;

pub trait RotatorLink {
    /// A single write attempt, returning how many bytes were accepted.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// A single read attempt. Returns `Ok(0)` when nothing arrived before the
    /// inactivity timer expired.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Blocks until written bytes have been transmitted.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn response_timeout(&self) -> Duration {
        DEFAULT_RESPONSE_TIMEOUT
    }

    /// Gives the controller time to act on a command.
    fn settle(&mut self, duration: Duration) {
        thread::sleep(duration);
    }

    /// Writes every byte of `bytes`, retrying short and interrupted writes.
    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), RotatorError> {
        trace!(bytes = %String::from_utf8_lossy(bytes).escape_debug(), "Writing to rotator");

        while !bytes.is_empty() {
            match self.write(bytes) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => bytes = &bytes[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.flush()?;

        Ok(())
    }

    /// Performs one read and throws its content away.
    fn drain(&mut self) -> Result<usize, RotatorError> {
        let mut buf = [0u8; READ_CHUNK];

        let n = match self.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => 0,
            Err(e) => return Err(e.into()),
        };

        if n > 0 {
            trace!(stale = %String::from_utf8_lossy(&buf[..n]).escape_debug(), "Discarded stale rotator output");
        }

        Ok(n)
    }

    /// Accumulates reads until at least `n` bytes have arrived.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::Timeout`] if fewer than `n` bytes arrived within
    /// [`response_timeout`](RotatorLink::response_timeout).
    fn read_at_least(&mut self, n: usize) -> Result<Vec<u8>, RotatorError> {
        let timeout = self.response_timeout();
        let started = Instant::now();

        let mut response = Vec::with_capacity(n.max(READ_CHUNK));
        let mut buf = [0u8; READ_CHUNK];

        while response.len() < n {
            if started.elapsed() >= timeout {
                return Err(RotatorError::Timeout {
                    expected: n,
                    received: response.len(),
                    timeout,
                });
            }

            match self.read(&mut buf) {
                Ok(read) => response.extend_from_slice(&buf[..read]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        trace!(response = %String::from_utf8_lossy(&response).escape_debug(), "Read from rotator");

        Ok(response)
    }
}

impl<L: RotatorLink + ?Sized> RotatorLink for Box<L> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn response_timeout(&self) -> Duration {
        (**self).response_timeout()
    }

    fn settle(&mut self, duration: Duration) {
        (**self).settle(duration)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), RotatorError> {
        (**self).write_all(bytes)
    }

    fn drain(&mut self) -> Result<usize, RotatorError> {
        (**self).drain()
    }

    fn read_at_least(&mut self, n: usize) -> Result<Vec<u8>, RotatorError> {
        (**self).read_at_least(n)
    }
}

/// Position report a [`NullLink`] answers every query with.
pub const IDLE_REPORT: &[u8] = b"AZ=000EL=000";

/// A link with no device behind it, used to run without a rotator.
///
/// Commands are logged and discarded. Position queries are answered with
/// [`IDLE_REPORT`].
#[derive(Debug, Default)]
pub struct NullLink {
    line: Vec<u8>,
    pending: VecDeque<u8>,
}

impl NullLink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RotatorLink for NullLink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        for &byte in bytes {
            self.line.push(byte);

            if self.line.ends_with(b"\r\n") {
                let command = String::from_utf8_lossy(&self.line[..self.line.len() - 2]);

                if command == "C2" {
                    self.pending.extend(IDLE_REPORT);
                } else if !command.is_empty() {
                    debug!(%command, "Dummy rotator, command not transmitted");
                }

                self.line.clear();
            }
        }

        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());

        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }

        Ok(n)
    }

    fn settle(&mut self, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedLink;

    #[test]
    fn write_all_retries_short_writes() {
        let mut link = ScriptedLink::new().with_write_chunk(3);

        link.write_all(b"W010 045\r\n").unwrap();

        assert_eq!(link.written(), b"W010 045\r\n");
    }

    #[test]
    fn write_all_fails_when_device_accepts_nothing() {
        let mut link = ScriptedLink::new().with_write_chunk(0);

        let result = link.write_all(b"C2\r\n");

        assert!(matches!(result, Err(RotatorError::Io(e)) if e.kind() == io::ErrorKind::WriteZero));
    }

    #[test]
    fn read_at_least_accumulates_trickled_bytes() {
        let mut link = ScriptedLink::new().with_read_chunk(4);

        link.write_all(b"C2\r\n").unwrap();
        let response = link.read_at_least(12).unwrap();

        assert!(response.len() >= 12);
        assert!(response.starts_with(b"AZ=000EL=000"));
    }

    #[test]
    fn read_at_least_times_out_on_silent_device() {
        let mut link = ScriptedLink::new()
            .silent()
            .with_response_timeout(Duration::from_millis(30));

        link.write_all(b"C2\r\n").unwrap();
        let result = link.read_at_least(12);

        assert!(matches!(
            result,
            Err(RotatorError::Timeout {
                expected: 12,
                received: 0,
                ..
            })
        ));
    }

    #[test]
    fn drain_discards_one_read() {
        let mut link = ScriptedLink::new().with_stale(b"AZ=999EL=999\r\n");

        assert_eq!(link.drain().unwrap(), 14);
        assert_eq!(link.drain().unwrap(), 0);
    }

    #[test]
    fn null_link_answers_queries_with_idle_report() {
        let mut link = NullLink::new();

        link.write_all(b"\r\n").unwrap();
        assert_eq!(link.drain().unwrap(), 0);

        link.write_all(b"C2\r\n").unwrap();
        assert_eq!(link.read_at_least(12).unwrap(), IDLE_REPORT);
    }

    #[test]
    fn null_link_swallows_commands() {
        let mut link = NullLink::new();

        link.write_all(b"W180 090\r\n").unwrap();

        assert_eq!(link.drain().unwrap(), 0);
    }

    #[test]
    fn boxed_links_delegate() {
        let mut link: Box<dyn RotatorLink> = Box::new(NullLink::new());

        link.write_all(b"C2\r\n").unwrap();

        assert_eq!(link.read_at_least(12).unwrap(), IDLE_REPORT);
    }
}
