//! Great-circle providers (fallback when OSRM is unavailable).
//!
//! Less accurate than routed costs (ignores roads and trails) but always
//! available, deterministic, and cheap enough for tests.

use crate::error::ProviderError;
use crate::model::{Coordinate, CostMatrix};
use crate::polyline::{Polyline, OSRM_PRECISION};
use crate::traits::{CostMatrixProvider, TransferRoute, TransferRouter};

/// Average riding speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 18.0;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
pub fn haversine_m(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Summed great-circle length of a coordinate sequence in meters.
pub fn path_length_m(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

/// Haversine-based cost matrix provider.
///
/// Estimates travel time using straight-line distance and an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Convert a distance in meters to travel time in seconds.
    fn meters_to_seconds(&self, meters: f64) -> f64 {
        let hours = meters / 1000.0 / self.speed_kmh;
        hours * 3600.0
    }
}

impl CostMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, waypoints: &[Coordinate]) -> Result<CostMatrix, ProviderError> {
        let n = waypoints.len();
        let mut distances = vec![vec![0.0; n]; n];
        let mut durations = vec![vec![0.0; n]; n];

        for (i, from) in waypoints.iter().enumerate() {
            for (j, to) in waypoints.iter().enumerate() {
                if i != j {
                    let meters = haversine_m(*from, *to);
                    distances[i][j] = meters;
                    durations[i][j] = self.meters_to_seconds(meters);
                }
            }
        }

        Ok(CostMatrix::new(distances, durations))
    }
}

/// Transfers as a direct two-point line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineRouter;

impl TransferRouter for StraightLineRouter {
    fn route_between(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<TransferRoute, ProviderError> {
        let line = Polyline::new(vec![origin, destination]);
        Ok(TransferRoute {
            encoded_geometry: line.encode(OSRM_PRECISION),
            length_meters: haversine_m(origin, destination),
        })
    }
}
