//! Yaesu GS-232 rotator controller protocol.
//!
//! | Direction   | Bytes                  | Meaning                       |
//! |-------------|------------------------|-------------------------------|
//! | host→device | `\r\n`                 | no-op, clears stale output    |
//! | host→device | `C2\r\n`               | query azimuth and elevation   |
//! | device→host | `AZ=aaaEL=eee`         | position report               |
//! | host→device | `Waaa eee\r\n`         | move to azimuth/elevation     |

use crate::{
    AntennaController, AntennaPosition, RotatorError, link::RotatorLink, serial::SerialLink,
};
use std::time::Duration;
use tracing::{debug, info};

const CLEAR: &[u8] = b"\r\n";
const QUERY_POSITION: &[u8] = b"C2\r\n";

/// Shortest position report, `AZ=aaaEL=eee`.
const REPORT_LEN: usize = 12;

/// Set commands are sent with this fixed width.
const SET_COMMAND_LEN: usize = 10;

/// Time the controller is given to act on a command.
pub const SETTLE: Duration = Duration::from_millis(20);

/// Driver for a GS-232 controller behind a [`RotatorLink`].
///
/// Every operation needs exclusive access to the link, so callers serialise
/// through `&mut self`.
pub struct Gs232<L> {
    link: L,
}

impl Gs232<SerialLink> {
    /// Opens the controller on the serial port at `path`.
    pub fn open(path: &str) -> Result<Self, RotatorError> {
        SerialLink::open(path).map(Self::new)
    }
}

impl<L: RotatorLink> Gs232<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Reads the current antenna position.
    ///
    /// # Errors
    ///
    /// [`RotatorError::Protocol`] if the report lacks its `AZ` or `EL` marker,
    /// [`RotatorError::Timeout`] if the controller does not answer.
    pub fn get_position(&mut self) -> Result<AntennaPosition, RotatorError> {
        self.clear()?;

        self.link.write_all(QUERY_POSITION)?;
        self.link.settle(SETTLE);

        let response = self.link.read_at_least(REPORT_LEN)?;
        let position = parse_position(&response)?;

        debug!(%position, "Rotator reported position");

        Ok(position)
    }

    /// Commands the antenna to `target`. No acknowledgement is read back.
    pub fn set_position(&mut self, target: AntennaPosition) -> Result<(), RotatorError> {
        self.clear()?;

        info!(%target, "Commanding antenna");

        self.link.write_all(&set_command(target))?;
        self.link.settle(SETTLE);

        Ok(())
    }

    fn clear(&mut self) -> Result<(), RotatorError> {
        self.link.write_all(CLEAR)?;
        self.link.drain()?;
        Ok(())
    }
}

impl<L: RotatorLink> AntennaController for Gs232<L> {
    fn position(&mut self) -> Result<AntennaPosition, RotatorError> {
        self.get_position()
    }

    fn point(&mut self, target: AntennaPosition) -> Result<(), RotatorError> {
        self.set_position(target)
    }
}

/// Formats a `W` command, cut to its fixed wire width.
pub fn set_command(target: AntennaPosition) -> Vec<u8> {
    let mut command = format!("W{:03} {:03}\r\n", target.azimuth, target.elevation).into_bytes();
    command.truncate(SET_COMMAND_LEN);
    command
}

/// Extracts the position from a controller response.
///
/// Parsing is loose: the markers may appear anywhere in the response, and an
/// axis whose digits cannot be read is reported as 0.
pub fn parse_position(response: &[u8]) -> Result<AntennaPosition, RotatorError> {
    let text = String::from_utf8_lossy(response);

    Ok(AntennaPosition {
        azimuth: parse_axis(&text, "AZ")?,
        elevation: parse_axis(&text, "EL")?,
    })
}

fn parse_axis(text: &str, marker: &'static str) -> Result<u16, RotatorError> {
    let start = text.find(marker).ok_or_else(|| RotatorError::Protocol {
        marker,
        response: text.to_owned(),
    })?;

    let digits = text[start + marker.len()..]
        .strip_prefix('=')
        .map(|value| {
            let end = value
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(value.len())
                .min(3);
            &value[..end]
        })
        .unwrap_or_default();

    Ok(digits.parse().unwrap_or(0))
}
