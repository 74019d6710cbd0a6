use crate::controller::Settings;
use antenna_controller::AntennaPosition;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Configuration file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "pass-tracker";

/// Prefix of environment variables overriding the configuration, e.g.
/// `PASS_TRACKER_ROTATOR__PORT=/dev/ttyUSB0`.
pub const ENV_PREFIX: &str = "PASS_TRACKER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rotator: RotatorConfig,
    pub tracking: TrackingConfig,
    pub observer: ObserverConfig,
    pub elements: ElementsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Serial device the GS-232 controller is attached to.
    pub port: String,
    /// Run without a rotator.
    pub dummy: bool,
    pub response_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Half-width of the dead band, in degrees.
    pub threshold: f64,
    pub poll_interval_ms: u64,
    /// How long before acquisition the antenna is pre-aligned, in seconds.
    pub pre_align_lead_s: i64,
    /// How far ahead to look for the next pass, in hours.
    pub search_window_h: i64,
    pub park_azimuth: u16,
    pub park_elevation: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    /// Two-line element file the tracker propagates from.
    pub file: PathBuf,
    /// Where fresh elements are downloaded from.
    pub url: String,
    /// Download fresh elements at startup.
    pub update: bool,
    /// Download target, copied over `file` once complete.
    pub tmp_file: PathBuf,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            dummy: false,
            response_timeout_ms: 2000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            poll_interval_ms: 800,
            pre_align_lead_s: 60,
            search_window_h: 24,
            park_azimuth: 180,
            park_elevation: 90,
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            latitude: 51.9,
            longitude: -1.39,
            altitude: 0.0,
        }
    }
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("iss.txt"),
            url: "https://hamtv.batc.tv/iss.txt".to_string(),
            update: true,
            tmp_file: PathBuf::from("/tmp/iss.txt"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and the environment.
    ///
    /// An explicit `path` must exist. Without one, `pass-tracker.toml` is read
    /// from the working directory if present.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Rejects values the tracker cannot work with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let tracking = &self.tracking;

        if tracking.threshold.is_nan() || tracking.threshold <= 0.0 {
            return Err(config::ConfigError::Message(format!(
                "tracking.threshold must be positive, got {}",
                tracking.threshold
            )));
        }

        if tracking.poll_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "tracking.poll_interval_ms must be positive".to_string(),
            ));
        }

        if tracking.search_window_h <= 0 {
            return Err(config::ConfigError::Message(
                "tracking.search_window_h must be positive".to_string(),
            ));
        }

        if tracking.park_azimuth > 359 || tracking.park_elevation > 90 {
            return Err(config::ConfigError::Message(format!(
                "park position {} is out of range",
                tracking.park_position()
            )));
        }

        Ok(())
    }

    pub fn observer(&self) -> tracking::Observer {
        tracking::Observer::new(
            self.observer.latitude,
            self.observer.longitude,
            self.observer.altitude,
        )
    }
}

impl RotatorConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl TrackingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn park_position(&self) -> AntennaPosition {
        AntennaPosition::new(self.park_azimuth, self.park_elevation)
    }

    pub fn search_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.search_window_h)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            threshold: self.threshold,
            poll_interval: self.poll_interval(),
            pre_align_lead: chrono::Duration::seconds(self.pre_align_lead_s),
            park: self.park_position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_stock_tracker() {
        let config = Config::default();

        assert_eq!(config.rotator.port, "/dev/ttyACM0");
        assert!(!config.rotator.dummy);
        assert_eq!(config.tracking.threshold, 1.0);
        assert_eq!(config.tracking.poll_interval(), Duration::from_millis(800));
        assert_eq!(config.tracking.park_position(), AntennaPosition::new(180, 90));
        assert!(config.elements.update);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[rotator]\nport = \"/dev/ttyUSB1\"\ndummy = true\n\n[tracking]\nthreshold = 2.5\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.rotator.port, "/dev/ttyUSB1");
        assert!(config.rotator.dummy);
        assert_eq!(config.tracking.threshold, 2.5);
        assert_eq!(config.tracking.poll_interval_ms, 800);
        assert_eq!(config.observer.latitude, 51.9);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = Config::load(Some(std::path::Path::new("/nonexistent/pass-tracker.toml")));

        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let mut config = Config::default();
        config.tracking.threshold = 0.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_park_position_out_of_range() {
        let mut config = Config::default();
        config.tracking.park_elevation = 91;

        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_carry_tracking_parameters() {
        let settings = TrackingConfig::default().settings();

        assert_eq!(settings.threshold, 1.0);
        assert_eq!(settings.pre_align_lead, chrono::Duration::seconds(60));
        assert_eq!(settings.park, AntennaPosition::new(180, 90));
    }
}
