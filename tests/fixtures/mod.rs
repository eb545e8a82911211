//! Test fixtures for trip-planner.
//!
//! Provides:
//! - A "grid" world where one degree is 100 km (Manhattan distance), so
//!   transfer costs are exact and easy to reason about
//! - Collaborator doubles: failing matrix/router, NaN elevation
//! - Real Alpine climbs (entry/exit from OpenStreetMap) for offline runs

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use trip_planner::error::ProviderError;
use trip_planner::model::{Coordinate, CostMatrix, SegmentMeta};
use trip_planner::polyline::{Polyline, OSRM_PRECISION};
use trip_planner::traits::{CostMatrixProvider, ElevationService, TransferRoute, TransferRouter};

pub mod alpine_segments;

pub use alpine_segments::*;

/// Meters per degree in the grid world.
pub const GRID_METERS_PER_DEGREE: f64 = 100_000.0;
/// Transfer speed in the grid world, m/s.
pub const GRID_SPEED_MS: f64 = 5.0;

pub fn grid_distance_m(from: Coordinate, to: Coordinate) -> f64 {
    ((from.lon - to.lon).abs() + (from.lat - to.lat).abs()) * GRID_METERS_PER_DEGREE
}

/// Builder for segment metadata with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestSegment {
    meta: SegmentMeta,
}

impl TestSegment {
    pub fn new(id: &str) -> Self {
        Self {
            meta: SegmentMeta {
                id: id.to_string(),
                name: format!("Segment {id}"),
                length_meters: 10_000.0,
                elevation_gain_meters: 100.0,
                entry_coordinate: Coordinate::new(6.0, 45.0),
                exit_coordinate: Coordinate::new(6.1, 45.0),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.meta.name = name.to_string();
        self
    }

    /// Entry and exit as `(lon, lat)`.
    pub fn between(mut self, entry: (f64, f64), exit: (f64, f64)) -> Self {
        self.meta.entry_coordinate = Coordinate::new(entry.0, entry.1);
        self.meta.exit_coordinate = Coordinate::new(exit.0, exit.1);
        self
    }

    pub fn km(mut self, km: f64) -> Self {
        self.meta.length_meters = km * 1000.0;
        self
    }

    pub fn climb(mut self, meters: f64) -> Self {
        self.meta.elevation_gain_meters = meters;
        self
    }

    pub fn build(self) -> SegmentMeta {
        self.meta
    }
}

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Exact grid-world matrix.
#[derive(Debug, Default)]
pub struct GridMatrix {
    pub calls: AtomicUsize,
}

impl CostMatrixProvider for GridMatrix {
    fn matrix_for(&self, waypoints: &[Coordinate]) -> Result<CostMatrix, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let distances: Vec<Vec<f64>> = waypoints
            .iter()
            .map(|from| waypoints.iter().map(|to| grid_distance_m(*from, *to)).collect())
            .collect();
        let durations = distances
            .iter()
            .map(|row| row.iter().map(|meters| meters / GRID_SPEED_MS).collect())
            .collect();
        Ok(CostMatrix::new(distances, durations))
    }
}

/// Matrix service that is always down.
#[derive(Debug, Default)]
pub struct FailingMatrix;

impl CostMatrixProvider for FailingMatrix {
    fn matrix_for(&self, _waypoints: &[Coordinate]) -> Result<CostMatrix, ProviderError> {
        Err(ProviderError::Upstream {
            status: "503".to_string(),
            message: "matrix service unavailable".to_string(),
        })
    }
}

/// Matrix with an unreachable pair between every exit and entry.
#[derive(Debug, Default)]
pub struct UnreachableMatrix;

impl CostMatrixProvider for UnreachableMatrix {
    fn matrix_for(&self, waypoints: &[Coordinate]) -> Result<CostMatrix, ProviderError> {
        let n = waypoints.len();
        let mut distances = vec![vec![f64::NAN; n]; n];
        for (i, row) in distances.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        Ok(CostMatrix::new(distances.clone(), distances))
    }
}

/// Straight two-point routes with grid-world lengths.
#[derive(Debug, Default)]
pub struct GridRouter {
    pub calls: AtomicUsize,
}

impl TransferRouter for GridRouter {
    fn route_between(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<TransferRoute, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransferRoute {
            encoded_geometry: Polyline::new(vec![origin, destination]).encode(OSRM_PRECISION),
            length_meters: grid_distance_m(origin, destination),
        })
    }
}

/// Router that never finds a route.
#[derive(Debug, Default)]
pub struct FailingRouter;

impl TransferRouter for FailingRouter {
    fn route_between(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
    ) -> Result<TransferRoute, ProviderError> {
        Err(ProviderError::NotFound("no route".to_string()))
    }
}

/// Router returning geometry that does not decode.
#[derive(Debug, Default)]
pub struct GarbledRouter;

impl TransferRouter for GarbledRouter {
    fn route_between(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
    ) -> Result<TransferRoute, ProviderError> {
        Ok(TransferRoute {
            encoded_geometry: "_p~iF~ps|U_".to_string(),
            length_meters: 1.0,
        })
    }
}

/// Constant transfer climb.
#[derive(Debug, Clone, Copy)]
pub struct FixedElevation(pub f64);

impl ElevationService for FixedElevation {
    fn elevation_gain(&self, _encoded_geometry: &str) -> Result<f64, ProviderError> {
        Ok(self.0)
    }
}

/// Elevation service that answers with garbage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NanElevation;

impl ElevationService for NanElevation {
    fn elevation_gain(&self, _encoded_geometry: &str) -> Result<f64, ProviderError> {
        Ok(f64::NAN)
    }
}
