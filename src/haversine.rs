//! Offline legs from straight-line distance.
//!
//! Each leg between consecutive waypoints is the great-circle distance driven
//! at a constant speed. Useful when no directions service is reachable; ETAs
//! come out optimistic in dense street grids.

use crate::error::RoutingError;
use crate::stop::Coordinates;
use crate::traits::{Leg, LegProvider};

const CITY_SPEED_KMH: f64 = 40.0;
const MEAN_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// [`LegProvider`] that needs no network and takes any number of points.
#[derive(Debug, Clone)]
pub struct HaversineLegs {
    pub speed_kmh: f64,
}

impl Default for HaversineLegs {
    fn default() -> Self {
        Self {
            speed_kmh: CITY_SPEED_KMH,
        }
    }
}

impl HaversineLegs {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    fn leg(&self, from: Coordinates, to: Coordinates) -> Leg {
        let meters = great_circle_meters(from, to);
        Leg::new(meters / (self.speed_kmh / 3.6), meters)
    }
}

/// Haversine distance in meters.
fn great_circle_meters(from: Coordinates, to: Coordinates) -> f64 {
    let (phi1, phi2) = (from.lat.to_radians(), to.lat.to_radians());
    let half_d_phi = (phi2 - phi1) / 2.0;
    let half_d_lambda = (to.lng - from.lng).to_radians() / 2.0;

    let h = half_d_phi.sin().powi(2) + phi1.cos() * phi2.cos() * half_d_lambda.sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().asin()
}

impl LegProvider for HaversineLegs {
    fn max_batch(&self) -> usize {
        usize::MAX
    }

    fn legs_for(&self, points: &[Coordinates]) -> Result<Vec<Leg>, RoutingError> {
        if self.speed_kmh <= 0.0 {
            return Err(RoutingError::Provider(format!(
                "invalid assumed speed {} km/h",
                self.speed_kmh
            )));
        }
        Ok(points.windows(2).map(|pair| self.leg(pair[0], pair[1])).collect())
    }
}
