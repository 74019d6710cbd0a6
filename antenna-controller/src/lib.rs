pub mod gs232;
pub mod link;
pub mod mock;
pub mod serial;

use std::{fmt, io, time::Duration};
use thiserror::Error;

pub use gs232::Gs232;
pub use link::{NullLink, RotatorLink};
pub use serial::SerialLink;

/// Whole-degree antenna pointing, as the rotator reports and accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AntennaPosition {
    /// Azimuth, in degrees. Nominally 0-359, the controller accepts overlap past 359.
    pub azimuth: u16,
    /// Elevation, in degrees, 0-90.
    pub elevation: u16,
}

impl AntennaPosition {
    pub const fn new(azimuth: u16, elevation: u16) -> Self {
        Self {
            azimuth,
            elevation,
        }
    }
}

impl fmt::Display for AntennaPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AZ: {:03}, EL: {:03}", self.azimuth, self.elevation)
    }
}

#[derive(Debug, Error)]
pub enum RotatorError {
    /// The serial device could not be opened or configured.
    #[error("could not open rotator port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    /// A read or write failed for a reason other than a timeout.
    #[error("rotator i/o error: {0}")]
    Io(#[from] io::Error),
    /// The position report did not contain the expected marker.
    #[error("{marker} marker missing from rotator response {response:?}")]
    Protocol {
        marker: &'static str,
        response: String,
    },
    /// The rotator did not answer in time.
    #[error("rotator sent {received} of {expected} bytes within {timeout:?}")]
    Timeout {
        expected: usize,
        received: usize,
        timeout: Duration,
    },
}

pub trait AntennaController {
    /// Reads the position the antenna is currently at.
    fn position(&mut self) -> Result<AntennaPosition, RotatorError>;

    /// Commands the antenna to move to `target`.
    fn point(&mut self, target: AntennaPosition) -> Result<(), RotatorError>;
}
