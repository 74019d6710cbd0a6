use chrono::{DateTime, Duration, Utc};
use predict_rs::{
    consts::{DEG_TO_RAD, RAD_TO_DEG},
    observer, orbit,
    predict::PredictObserver,
};
use thiserror::Error;
use tracing::trace;

pub type Degrees = f64;
pub type Meters = f64;

/// Step used when scanning for the next horizon crossing, in seconds.
const SCAN_STEP_SECONDS: i64 = 30;

/// Horizon crossings are located to within this many seconds.
const CROSSING_RESOLUTION_SECONDS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// Ground station latitude, in degrees.
    latitude: Degrees,
    /// Ground station longitude, in degrees.
    longitude: Degrees,
    /// Ground station altitude, in meters.
    altitude: Meters,
}

impl Observer {
    pub fn new(latitude: Degrees, longitude: Degrees, altitude: Meters) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub fn latitude(&self) -> Degrees {
        self.latitude
    }

    pub fn longitude(&self) -> Degrees {
        self.longitude
    }

    pub fn altitude(&self) -> Meters {
        self.altitude
    }
}

/// The predicted observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Azimuth, in degrees.
    pub azimuth: Degrees,
    /// Elevation, in degrees.
    pub elevation: Degrees,
    /// Time the look angles were computed for.
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Whether the target is above the horizon.
    pub fn is_visible(&self) -> bool {
        self.elevation > 0.0
    }
}

/// A predicted pass over the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass {
    /// Acquisition of signal.
    pub start: DateTime<Utc>,
    /// Loss of signal.
    pub end: DateTime<Utc>,
    /// Elevation at the middle of the pass, in degrees.
    pub max_elevation: Degrees,
}

impl Pass {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid orbital elements: {0}")]
    Elements(sgp4::ElementsError),
    #[error("orbit prediction failed: {0}")]
    OrbitPrediction(String),
}

pub struct Tracker {
    observer: PredictObserver,
    elements: sgp4::Elements,
    constants: sgp4::Constants,
}

impl Tracker {
    pub fn new(observer: &Observer, elements: sgp4::Elements) -> Result<Self, TrackerError> {
        let constants =
            sgp4::Constants::from_elements(&elements).map_err(TrackerError::Elements)?;

        let observer = PredictObserver {
            name: "".to_string(),
            latitude: observer.latitude * DEG_TO_RAD,
            longitude: observer.longitude * DEG_TO_RAD,
            altitude: observer.altitude,
            min_elevation: 0.0,
        };

        Ok(Self {
            observer,
            elements,
            constants,
        })
    }

    pub fn elements(&self) -> &sgp4::Elements {
        &self.elements
    }

    /// Computes the look angles to the target at `at`.
    pub fn track(&self, at: DateTime<Utc>) -> Result<Observation, TrackerError> {
        let utc = at.timestamp_millis() as f64 / 1000.0;

        let orbit = orbit::predict_orbit(&self.elements, &self.constants, utc)
            .map_err(|e| TrackerError::OrbitPrediction(format!("{e:?}")))?;

        let observation = observer::predict_observe_orbit(&self.observer, &orbit);

        Ok(Observation {
            azimuth: observation.azimuth * RAD_TO_DEG,
            elevation: observation.elevation * RAD_TO_DEG,
            timestamp: at,
        })
    }

    /// Finds the first pass that starts after `from` and no later than `from + window`.
    ///
    /// If the target is already above the horizon at `from`, the pass in
    /// progress is skipped. Returns `None` if no acquisition happens within the window.
    pub fn next_pass(
        &self,
        from: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<Pass>, TrackerError> {
        let Some(start) = self.next_crossing(from, from + window, false)? else {
            return Ok(None);
        };

        // A pass ending outside the search window still ends eventually; keep
        // scanning for the set with the same window length.
        let end = match self.next_crossing(start, start + window, true)? {
            Some(end) => end,
            None => start + window,
        };

        let max_elevation = self.track(start + (end - start) / 2)?.elevation;

        trace!(%start, %end, max_elevation, "Predicted next pass");

        Ok(Some(Pass {
            start,
            end,
            max_elevation,
        }))
    }

    /// Scans `[from, until]` for the first instant at which the target's
    /// visibility flips from `visible` to its opposite.
    fn next_crossing(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        visible: bool,
    ) -> Result<Option<DateTime<Utc>>, TrackerError> {
        let mut before = from;
        let mut was_visible = self.track(before)?.is_visible();

        while before < until {
            let after = (before + Duration::seconds(SCAN_STEP_SECONDS)).min(until);
            let is_visible = self.track(after)?.is_visible();

            if was_visible == visible && is_visible != visible {
                return self.bisect(before, after).map(Some);
            }

            before = after;
            was_visible = is_visible;
        }

        Ok(None)
    }

    /// Narrows a visibility change between `before` and `after` down to
    /// one second, returning the first instant on the far side.
    fn bisect(
        &self,
        mut before: DateTime<Utc>,
        mut after: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TrackerError> {
        let resolution = Duration::seconds(CROSSING_RESOLUTION_SECONDS);
        let visible_before = self.track(before)?.is_visible();

        while after - before > resolution {
            let mid = before + (after - before) / 2;

            if self.track(mid)?.is_visible() == visible_before {
                before = mid;
            } else {
                after = mid;
            }
        }

        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn iss() -> sgp4::Elements {
        sgp4::Elements::from_tle(
            Some("ISS (ZARYA)".to_owned()),
            "1 25544U 98067A   25186.50618345  .00006730  00000+0  12412-3 0  9992".as_bytes(),
            "2 25544  51.6343 216.2777 0002492 336.9059  23.1817 15.50384048518002".as_bytes(),
        )
        .unwrap()
    }

    fn tracker() -> Tracker {
        let observer = Observer::new(-34.6, -58.4, 2.5);
        Tracker::new(&observer, iss()).unwrap()
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn look_angles_are_in_range() {
        let tracker = tracker();

        for minutes in (0..180).step_by(7) {
            let at = epoch() + Duration::minutes(minutes);
            let observation = tracker.track(at).unwrap();

            assert!((0.0..=360.0).contains(&observation.azimuth));
            assert!((-90.0..=90.0).contains(&observation.elevation));
            assert_eq!(observation.timestamp, at);
        }
    }

    #[test]
    fn next_pass_is_consistent() {
        let tracker = tracker();

        let pass = tracker
            .next_pass(epoch(), Duration::hours(24))
            .unwrap()
            .expect("the ISS passes over Buenos Aires every day");

        assert!(pass.start > epoch());
        assert!(pass.end > pass.start);
        assert!(pass.duration() < Duration::minutes(20));
        assert!(pass.max_elevation > 0.0);

        assert!(tracker.track(pass.start).unwrap().is_visible());
        assert!(!tracker.track(pass.start - Duration::seconds(2)).unwrap().is_visible());
        assert!(!tracker.track(pass.end).unwrap().is_visible());
    }

    #[test]
    fn empty_window_has_no_pass() {
        let tracker = tracker();
        let from = epoch();

        assert_eq!(tracker.next_pass(from, Duration::zero()).unwrap(), None);
    }

    #[test]
    fn visibility_follows_elevation() {
        let at = epoch();
        let above = Observation {
            azimuth: 10.0,
            elevation: 0.5,
            timestamp: at,
        };
        let on = Observation {
            elevation: 0.0,
            ..above
        };

        assert!(above.is_visible());
        assert!(!on.is_visible());
    }
}
