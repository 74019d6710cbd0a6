use anyhow::Context;
use clap::Parser;
use pass_tracker::{
    cli::TrackArgs,
    config::Config,
    connect_rotator,
    controller::{Predictor, TrackingController},
    elements,
    time::SystemClock,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{error, info, warn};
use tracking::Tracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pass_tracker::init_tracing();

    let args = TrackArgs::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!(
        port = %config.rotator.port,
        dummy = config.rotator.dummy,
        latitude = config.observer.latitude,
        longitude = config.observer.longitude,
        altitude = config.observer.altitude,
        "Loaded configuration"
    );

    if config.elements.update {
        let elements = &config.elements;

        if let Err(error) = elements::update(&elements.url, &elements.tmp_file, &elements.file).await {
            warn!(%error, "Could not update orbital elements, using the existing file");
        }
    }

    let elements = elements::load(&config.elements.file).with_context(|| {
        format!("failed to load orbital elements from {}", config.elements.file.display())
    })?;

    info!(
        object = elements.object_name.as_deref().unwrap_or("unnamed"),
        epoch = %elements.datetime,
        "Loaded orbital elements"
    );

    let tracker = Tracker::new(&config.observer(), elements)?;
    let predictor = Predictor::new(tracker, config.tracking.search_window());

    let stop = Arc::new(AtomicBool::new(false));

    tokio::spawn({
        let stop = Arc::clone(&stop);

        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupted, stopping");
                    stop.store(true, Ordering::Relaxed);
                }
                Err(error) => error!(%error, "Failed to listen for Ctrl-C"),
            }
        }
    });

    let rotator_config = config.rotator.clone();
    let settings = config.tracking.settings();

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let rotator = connect_rotator(&rotator_config)?;
        let mut controller = TrackingController::connect(predictor, rotator, settings)?;

        controller.run(&SystemClock, &stop)?;

        Ok(())
    })
    .await
    .context("tracking loop panicked")?
}
