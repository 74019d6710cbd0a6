pub mod cli;
pub mod config;
pub mod controller;
pub mod elements;
pub mod pointing;
pub mod time;

use antenna_controller::{Gs232, NullLink, RotatorError, RotatorLink, SerialLink};
use config::RotatorConfig;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// A rotator driver over whichever link the configuration selects.
pub type Rotator = Gs232<Box<dyn RotatorLink + Send>>;

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Opens the rotator described by `config`, or a stand-in in dummy mode.
pub fn connect_rotator(config: &RotatorConfig) -> Result<Rotator, RotatorError> {
    let link: Box<dyn RotatorLink + Send> = if config.dummy {
        warn!("Dummy mode, no rotator attached");
        Box::new(NullLink::new())
    } else {
        Box::new(SerialLink::open(&config.port)?.with_response_timeout(config.response_timeout()))
    };

    Ok(Gs232::new(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use antenna_controller::{AntennaController, AntennaPosition};

    #[test]
    fn dummy_rotator_rests_at_origin() {
        let config = RotatorConfig {
            dummy: true,
            ..RotatorConfig::default()
        };

        let mut rotator = connect_rotator(&config).unwrap();

        assert_eq!(rotator.position().unwrap(), AntennaPosition::new(0, 0));
        assert!(rotator.point(AntennaPosition::new(180, 90)).is_ok());
    }

    #[test]
    fn missing_port_fails_to_open() {
        let config = RotatorConfig {
            port: "/dev/does-not-exist".to_string(),
            ..RotatorConfig::default()
        };

        assert!(matches!(
            connect_rotator(&config),
            Err(RotatorError::Open { .. })
        ));
    }
}
