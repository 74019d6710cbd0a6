use crate::{
    RotatorError,
    link::{DEFAULT_RESPONSE_TIMEOUT, READ_TIMEOUT, RotatorLink},
};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::{
    io::{self, Read, Write},
    time::Duration,
};
use tracing::info;

/// Line speed of the GS-232 controller.
pub const BAUD_RATE: u32 = 9600;

/// A rotator link over a serial port, configured 9600 8N1 without flow control.
pub struct SerialLink {
    pub port: Box<dyn SerialPort>,
    response_timeout: Duration,
}

impl SerialLink {
    /// Opens `port_name` in raw mode, ignoring modem control lines.
    ///
    /// Each read attempt waits at most [`READ_TIMEOUT`] for data.
    pub fn open(port_name: &str) -> Result<Self, RotatorError> {
        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| RotatorError::Open {
                port: port_name.to_owned(),
                source,
            })?;

        info!(port = port_name, baud = BAUD_RATE, "Opened rotator serial port");

        Ok(Self {
            port,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        })
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

impl RotatorLink for SerialLink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.port, bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match Read::read(&mut self.port, buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            result => result,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }

    fn response_timeout(&self) -> Duration {
        self.response_timeout
    }
}
