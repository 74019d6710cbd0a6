//! The tracking loop.
//!
//! Every tick the controller works out where the antenna should point, reads
//! back where it actually is, and sends a new command only when the target
//! position changed.

use crate::{
    pointing::{self, TrackingState},
    time::TimeProvider,
};
use antenna_controller::{AntennaController, AntennaPosition, RotatorError};
use chrono::{DateTime, Utc};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracking::{Degrees, Observation, Pass, Tracker, TrackerError};

/// Source of look angles and pass predictions for the tracked target.
pub trait Ephemeris {
    fn observe(&self, at: DateTime<Utc>) -> Result<Observation, TrackerError>;

    /// The next pass starting after `from`, if one is predicted.
    fn next_pass(&self, from: DateTime<Utc>) -> Result<Option<Pass>, TrackerError>;
}

/// An [`Ephemeris`] that propagates orbital elements, looking for passes
/// within a fixed window.
pub struct Predictor {
    tracker: Tracker,
    search_window: chrono::Duration,
}

impl Predictor {
    pub fn new(tracker: Tracker, search_window: chrono::Duration) -> Self {
        Self {
            tracker,
            search_window,
        }
    }
}

impl Ephemeris for Predictor {
    fn observe(&self, at: DateTime<Utc>) -> Result<Observation, TrackerError> {
        self.tracker.track(at)
    }

    fn next_pass(&self, from: DateTime<Utc>) -> Result<Option<Pass>, TrackerError> {
        self.tracker.next_pass(from, self.search_window)
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Rotator(#[from] RotatorError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Half-width of the dead band, in degrees.
    pub threshold: Degrees,
    pub poll_interval: Duration,
    /// Passes starting sooner than this get the antenna pre-aligned.
    pub pre_align_lead: chrono::Duration,
    pub park: AntennaPosition,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            poll_interval: Duration::from_millis(800),
            pre_align_lead: chrono::Duration::seconds(60),
            park: AntennaPosition::new(180, 90),
        }
    }
}

/// What a single tick decided and did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub state: TrackingState,
    pub target: AntennaPosition,
    /// Where the rotator reported itself before any command was sent.
    pub actual: AntennaPosition,
    /// Whether a new command went out.
    pub commanded: bool,
}

struct Plan {
    state: TrackingState,
    target: AntennaPosition,
    pass: Option<Pass>,
}

pub struct TrackingController<E, A> {
    ephemeris: E,
    antenna: A,
    settings: Settings,
    /// Last position successfully sent to the rotator.
    commanded: AntennaPosition,
    state: Option<TrackingState>,
}

impl<E: Ephemeris, A: AntennaController> TrackingController<E, A> {
    /// Reads the rotator's position, which becomes the starting point of the
    /// control law.
    pub fn connect(ephemeris: E, mut antenna: A, settings: Settings) -> Result<Self, ControllerError> {
        let position = antenna.position()?;

        info!(%position, "Connected to rotator");

        Ok(Self {
            ephemeris,
            antenna,
            settings,
            commanded: position,
            state: None,
        })
    }

    pub fn commanded(&self) -> AntennaPosition {
        self.commanded
    }

    pub fn state(&self) -> Option<TrackingState> {
        self.state
    }

    pub fn antenna(&self) -> &A {
        &self.antenna
    }

    pub fn antenna_mut(&mut self) -> &mut A {
        &mut self.antenna
    }

    pub fn into_antenna(self) -> A {
        self.antenna
    }

    /// Runs one iteration of the loop for the instant `now`.
    ///
    /// # Errors
    ///
    /// Fails if the target cannot be propagated or the rotator position
    /// cannot be read. A failed command is only logged; it is retried on the
    /// next tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Tick, ControllerError> {
        let plan = self.plan(now)?;
        self.enter(&plan, now);

        let actual = self.antenna.position()?;
        debug!(%actual, "Current antenna position");

        let mut commanded = false;

        if plan.target != self.commanded {
            match self.antenna.point(plan.target) {
                Ok(()) => {
                    self.commanded = plan.target;
                    commanded = true;
                }
                Err(error) => {
                    warn!(%error, target = %plan.target, "Failed to command antenna");
                }
            }
        }

        Ok(Tick {
            state: plan.state,
            target: plan.target,
            actual,
            commanded,
        })
    }

    /// Ticks every poll interval until `stop` is raised.
    pub fn run(&mut self, clock: &impl TimeProvider, stop: &AtomicBool) -> Result<(), ControllerError> {
        while !stop.load(Ordering::Relaxed) {
            self.tick(clock.now())?;
            thread::sleep(self.settings.poll_interval);
        }

        info!(commanded = %self.commanded, "Tracking stopped");

        Ok(())
    }

    fn plan(&self, now: DateTime<Utc>) -> Result<Plan, ControllerError> {
        let observation = self.ephemeris.observe(now)?;

        debug!(
            azimuth = observation.azimuth,
            elevation = observation.elevation,
            "Current target position"
        );

        if observation.is_visible() {
            return Ok(Plan {
                state: TrackingState::ActivePass,
                target: pointing::follow(self.commanded, &observation, self.settings.threshold),
                pass: None,
            });
        }

        let pass = self.ephemeris.next_pass(now)?;

        if let Some(pass) = pass.filter(|pass| pass.start - now < self.settings.pre_align_lead) {
            let rise = self.ephemeris.observe(pass.start)?;

            return Ok(Plan {
                state: TrackingState::PreAlign,
                target: AntennaPosition::new(pointing::whole_degrees(rise.azimuth), 0),
                pass: Some(pass),
            });
        }

        Ok(Plan {
            state: TrackingState::Parked,
            target: self.settings.park,
            pass,
        })
    }

    /// Logs state changes.
    fn enter(&mut self, plan: &Plan, now: DateTime<Utc>) {
        if self.state == Some(plan.state) {
            return;
        }

        match (plan.state, plan.pass) {
            (TrackingState::ActivePass, _) => info!("Pass in progress, tracking target"),
            (TrackingState::PreAlign, Some(pass)) => info!(
                azimuth = plan.target.azimuth,
                aos = %pass.start,
                in_seconds = (pass.start - now).num_seconds(),
                "Aligning antenna for upcoming AoS"
            ),
            (TrackingState::Parked, Some(pass)) => info!(
                aos = %pass.start,
                los = %pass.end,
                max_elevation = pass.max_elevation,
                "Antenna parked until next pass"
            ),
            (_, None) => info!("Antenna parked, no pass predicted"),
        }

        self.state = Some(plan.state);
    }
}
