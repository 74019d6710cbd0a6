use anyhow::Context;
use antenna_controller::AntennaPosition;
use clap::Parser;
use pass_tracker::{cli::RotatorArgs, config::Config, connect_rotator};
use tracing::info;

fn main() -> anyhow::Result<()> {
    pass_tracker::init_tracing();

    let args = RotatorArgs::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);

    let mut rotator = connect_rotator(&config.rotator)?;

    let current = rotator.get_position()?;
    info!(%current, "Current antenna position");

    let target = AntennaPosition::new(args.azimuth, args.elevation);
    rotator.set_position(target)?;

    Ok(())
}
