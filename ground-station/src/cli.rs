use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Points a GS-232 rotator at the ISS while it passes overhead
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct TrackArgs {
    /// Configuration file [default: pass-tracker.toml, if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial device of the rotator controller
    #[arg(short, long)]
    pub port: Option<String>,

    /// Two-line element file to track from
    #[arg(short, long = "tle-file")]
    pub tle_file: Option<PathBuf>,

    /// Where to download fresh elements from
    #[arg(short = 'u', long = "tle-url")]
    pub tle_url: Option<String>,

    /// Use the element file as is, without downloading
    #[arg(short, long = "no-tle-update")]
    pub no_tle_update: bool,

    /// Run without a rotator attached
    #[arg(short, long)]
    pub dummy: bool,
}

impl TrackArgs {
    /// Overrides `config` with whatever was given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.rotator.port.clone_from(port);
        }

        if let Some(file) = &self.tle_file {
            config.elements.file.clone_from(file);
        }

        if let Some(url) = &self.tle_url {
            config.elements.url.clone_from(url);
        }

        if self.no_tle_update {
            config.elements.update = false;
        }

        if self.dummy {
            config.rotator.dummy = true;
        }
    }
}

/// Moves a GS-232 rotator to a fixed position
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct RotatorArgs {
    /// Azimuth, in degrees
    #[arg(value_parser = clap::value_parser!(u16).range(0..=450))]
    pub azimuth: u16,

    /// Elevation, in degrees
    #[arg(value_parser = clap::value_parser!(u16).range(0..=180))]
    pub elevation: u16,

    /// Configuration file [default: pass-tracker.toml, if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial device of the rotator controller
    #[arg(short, long)]
    pub port: Option<String>,

    /// Run without a rotator attached
    #[arg(short, long)]
    pub dummy: bool,
}

impl RotatorArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.rotator.port.clone_from(port);
        }

        if self.dummy {
            config.rotator.dummy = true;
        }
    }
}
