//! The step controller that turns look angles into antenna commands.
//!
//! The rotator only takes discrete repositioning commands, so the antenna is
//! not servoed onto the target. Each axis is left alone while the target stays
//! within `threshold` of it. Once the target drifts further, the axis either
//! steps `2 * threshold` towards it or, if the target is too far for one step,
//! jumps to lead it by `threshold`.

use antenna_controller::AntennaPosition;
use tracking::{Degrees, Observation};

/// What the antenna is doing during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// The target is above the horizon and being followed.
    ActivePass,
    /// The target rises soon. The antenna waits on the horizon at the rise azimuth.
    PreAlign,
    /// No pass is imminent. The antenna sits at the park position.
    Parked,
}

/// Moves `commanded` towards `observation` on both axes.
pub fn follow(
    commanded: AntennaPosition,
    observation: &Observation,
    threshold: Degrees,
) -> AntennaPosition {
    AntennaPosition {
        azimuth: step_azimuth(commanded.azimuth, observation.azimuth, threshold),
        elevation: step_elevation(commanded.elevation, observation.elevation, threshold),
    }
}

pub fn step_azimuth(commanded: u16, observed: Degrees, threshold: Degrees) -> u16 {
    step(commanded, observed, threshold, false)
}

/// Like [`step_azimuth`], except that lowering an antenna already within
/// `2 * threshold` of the horizon drops it straight to 0.
pub fn step_elevation(commanded: u16, observed: Degrees, threshold: Degrees) -> u16 {
    step(commanded, observed, threshold, true)
}

fn step(commanded: u16, observed: Degrees, threshold: Degrees, floor_at_horizon: bool) -> u16 {
    let current = Degrees::from(commanded);
    let delta = observed - current;

    if delta > threshold {
        if delta <= 2.0 * threshold {
            whole_degrees(current + 2.0 * threshold)
        } else {
            whole_degrees(observed + threshold)
        }
    } else if -delta > threshold {
        if floor_at_horizon && current < 2.0 * threshold {
            0
        } else if -delta <= 2.0 * threshold {
            whole_degrees(current - 2.0 * threshold)
        } else {
            whole_degrees(observed - threshold)
        }
    } else {
        commanded
    }
}

/// Truncates towards zero, as the rotator only takes whole degrees.
pub fn whole_degrees(angle: Degrees) -> u16 {
    angle as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn observation(azimuth: Degrees, elevation: Degrees) -> Observation {
        Observation {
            azimuth,
            elevation,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn small_drift_advances_by_two_thresholds() {
        assert_eq!(step_azimuth(100, 101.5, 1.0), 102);
        assert_eq!(step_azimuth(100, 98.5, 1.0), 98);
        assert_eq!(step_elevation(10, 11.5, 1.0), 12);
        assert_eq!(step_elevation(10, 8.5, 1.0), 8);
    }

    #[test]
    fn large_drift_snaps_ahead_of_target() {
        assert_eq!(step_azimuth(100, 110.4, 1.0), 111);
        assert_eq!(step_azimuth(100, 90.4, 1.0), 89);
        assert_eq!(step_elevation(10, 40.7, 1.0), 41);
        assert_eq!(step_elevation(40, 10.7, 1.0), 9);
    }

    #[test]
    fn dead_band_edges() {
        assert_eq!(step_azimuth(100, 101.0, 1.0), 100);
        assert_eq!(step_azimuth(100, 99.0, 1.0), 100);
        assert_eq!(step_azimuth(100, 102.0, 1.0), 102);
        assert_eq!(step_azimuth(100, 98.0, 1.0), 98);
    }

    #[test]
    fn elevation_near_horizon_floors_to_zero() {
        assert_eq!(step_elevation(3, 0.5, 2.0), 0);
        assert_eq!(step_elevation(1, 0.2, 0.6), 0);
        assert_eq!(step_elevation(4, 0.5, 2.0), 0);
        assert_eq!(step_elevation(30, 5.5, 2.0), 3);
    }

    #[test]
    fn azimuth_never_goes_negative() {
        assert_eq!(step_azimuth(3, 0.5, 2.0), 0);
        assert_eq!(step_azimuth(1, 0.1, 0.4), 0);
        assert_eq!(step_azimuth(3, 1.6, 0.6), 1);
    }

    #[test]
    fn elevation_increase_has_no_ceiling() {
        assert_eq!(step_elevation(89, 90.5, 1.0), 91);
    }

    #[test]
    fn azimuth_does_not_wrap() {
        assert_eq!(step_azimuth(358, 359.6, 1.0), 360);
        assert_eq!(step_azimuth(2, 359.0, 1.0), 360);
    }

    #[test]
    fn follow_steps_each_axis_independently() {
        let commanded = AntennaPosition::new(200, 20);

        let next = follow(commanded, &observation(200.5, 35.2), 1.0);

        assert_eq!(next, AntennaPosition::new(200, 36));
    }

    proptest! {
        #[test]
        fn within_dead_band_nothing_moves(
            commanded in 2u16..=358,
            elevation in 2u16..=88,
            offset in -1.0f64..=1.0,
            elevation_offset in -1.0f64..=1.0,
        ) {
            let observed = observation(
                f64::from(commanded) + offset,
                f64::from(elevation) + elevation_offset,
            );

            let next = follow(AntennaPosition::new(commanded, elevation), &observed, 1.0);

            prop_assert_eq!(next, AntennaPosition::new(commanded, elevation));
        }

        #[test]
        fn one_step_covers_small_drift(
            commanded in 2u16..=357,
            drift in 1.001f64..=2.0,
            rising in any::<bool>(),
        ) {
            let (observed, expected) = if rising {
                (f64::from(commanded) + drift, commanded + 2)
            } else {
                (f64::from(commanded) - drift, commanded - 2)
            };

            prop_assert_eq!(step_azimuth(commanded, observed, 1.0), expected);
            prop_assert_eq!(step_elevation(commanded, observed, 1.0), expected);
        }

        #[test]
        fn large_drift_leads_target_by_threshold(
            commanded in 0u16..=300,
            drift in 2.001f64..=50.0,
        ) {
            let observed = f64::from(commanded) + drift;

            prop_assert_eq!(step_azimuth(commanded, observed, 1.0), (observed + 1.0) as u16);
        }

        #[test]
        fn lowering_from_near_horizon_lands_on_zero(
            commanded in 0u16..2,
            observed in -10.0f64..-1.001,
        ) {
            prop_assert_eq!(step_elevation(commanded, observed, 1.0), 0);
        }
    }
}
