//! An in-memory GS-232 controller.
//!
//! [`ScriptedLink`] behaves like a rotator on the other end of the serial line:
//! it answers `C2` queries with its current position and moves to wherever a
//! `W` command tells it to. Reports can be overridden to simulate a
//! misbehaving controller.

use crate::{AntennaPosition, link::RotatorLink};
use std::{collections::VecDeque, io, time::Duration};

#[derive(Debug, Clone)]
pub struct ScriptedLink {
    position: AntennaPosition,
    written: Vec<u8>,
    line: Vec<u8>,
    commands: Vec<String>,
    pending: VecDeque<u8>,
    reports: VecDeque<Vec<u8>>,
    settles: Vec<Duration>,
    silent: bool,
    write_chunk: Option<usize>,
    read_chunk: Option<usize>,
    response_timeout: Duration,
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self {
            position: AntennaPosition::default(),
            written: Vec::new(),
            line: Vec::new(),
            commands: Vec::new(),
            pending: VecDeque::new(),
            reports: VecDeque::new(),
            settles: Vec::new(),
            silent: false,
            write_chunk: None,
            read_chunk: None,
            response_timeout: Duration::from_millis(100),
        }
    }
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the simulated rotator at `position`.
    pub fn at(mut self, position: AntennaPosition) -> Self {
        self.position = position;
        self
    }

    /// Leaves `bytes` in the receive buffer, as if the controller had sent them earlier.
    pub fn with_stale(mut self, bytes: &[u8]) -> Self {
        self.pending.extend(bytes);
        self
    }

    /// Accepts at most `n` bytes per write attempt.
    pub fn with_write_chunk(mut self, n: usize) -> Self {
        self.write_chunk = Some(n);
        self
    }

    /// Hands out at most `n` bytes per read attempt.
    pub fn with_read_chunk(mut self, n: usize) -> Self {
        self.read_chunk = Some(n);
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Never answers queries.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Answers the next query with `report` instead of the current position.
    pub fn queue_report(&mut self, report: &[u8]) {
        self.reports.push_back(report.to_vec());
    }

    pub fn position(&self) -> AntennaPosition {
        self.position
    }

    /// Every byte the host wrote.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Complete lines the host sent, without their terminator.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// The `W` commands the host sent.
    pub fn moves(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|command| command.starts_with('W'))
            .map(String::as_str)
            .collect()
    }

    pub fn settles(&self) -> &[Duration] {
        &self.settles
    }

    fn execute(&mut self, command: String) {
        if command == "C2" {
            if !self.silent {
                let report = self.reports.pop_front().unwrap_or_else(|| {
                    format!(
                        "AZ={:03}EL={:03}\r\n",
                        self.position.azimuth, self.position.elevation
                    )
                    .into_bytes()
                });

                self.pending.extend(report);
            }
        } else if let Some(arguments) = command.strip_prefix('W') {
            let mut angles = arguments.split(' ').map(str::parse::<u16>);

            if let (Some(Ok(azimuth)), Some(Ok(elevation))) = (angles.next(), angles.next()) {
                self.position = AntennaPosition::new(azimuth, elevation);
            }
        }

        self.commands.push(command);
    }
}

impl RotatorLink for ScriptedLink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let n = self.write_chunk.map_or(bytes.len(), |chunk| chunk.min(bytes.len()));

        for &byte in &bytes[..n] {
            self.written.push(byte);
            self.line.push(byte);

            if self.line.ends_with(b"\r\n") {
                let command = String::from_utf8_lossy(&self.line[..self.line.len() - 2]).into_owned();
                self.line.clear();
                self.execute(command);
            }
        }

        Ok(n)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.read_chunk.unwrap_or(buf.len()).min(buf.len());
        let n = limit.min(self.pending.len());

        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }

        Ok(n)
    }

    fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    fn settle(&mut self, duration: Duration) {
        self.settles.push(duration);
    }
}
