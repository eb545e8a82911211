//! Planning domain types: coordinates, legs, waypoints, cost matrices and
//! trip constraints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Upstream matrix services accept at most this many coordinates.
pub const MAX_WAYPOINTS: usize = 25;

/// Hard cap on trip length regardless of the requested date range.
pub const MAX_TRIP_DAYS: u32 = 14;

pub const DEFAULT_MAX_DAILY_DISTANCE_KM: f64 = 100.0;
pub const DEFAULT_MAX_DAILY_ELEVATION_M: f64 = 1000.0;

pub const DAILY_DISTANCE_RANGE_KM: (f64, f64) = (20.0, 300.0);
pub const DAILY_ELEVATION_RANGE_M: (f64, f64) = (200.0, 5000.0);

/// A geographic point. Elevation is only present when the upstream
/// geometry carried a third dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            elevation: None,
        }
    }

    pub const fn with_elevation(lon: f64, lat: f64, elevation: f64) -> Self {
        Self {
            lon,
            lat,
            elevation: Some(elevation),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Same horizontal position, ignoring elevation.
    pub fn same_position(&self, other: &Coordinate) -> bool {
        self.lon == other.lon && self.lat == other.lat
    }

    /// GeoJSON position (`[lon, lat]` or `[lon, lat, elevation]`).
    pub fn position(&self) -> Vec<f64> {
        match self.elevation {
            Some(elevation) => vec![self.lon, self.lat, elevation],
            None => vec![self.lon, self.lat],
        }
    }
}

/// Segment metadata as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMeta {
    pub id: String,
    pub name: String,
    pub length_meters: f64,
    pub elevation_gain_meters: f64,
    pub entry_coordinate: Coordinate,
    pub exit_coordinate: Coordinate,
}

/// A directed, must-visit unit of travel.
///
/// The direction is fixed by the caller; `entry` and `exit` are already
/// oriented so downstream stages never look at `forward` again except for
/// reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub segment_id: String,
    pub name: String,
    pub forward: bool,
    pub entry: Coordinate,
    pub exit: Coordinate,
    pub length_m: f64,
    pub elevation_gain_m: f64,
}

impl Leg {
    pub fn from_meta(meta: &SegmentMeta, forward: bool) -> Self {
        let (entry, exit) = if forward {
            (meta.entry_coordinate, meta.exit_coordinate)
        } else {
            (meta.exit_coordinate, meta.entry_coordinate)
        };

        Self {
            segment_id: meta.id.clone(),
            name: meta.name.clone(),
            forward,
            entry,
            exit,
            length_m: meta.length_meters,
            elevation_gain_m: meta.elevation_gain_meters,
        }
    }

    /// The leg's own geometry. Only the two endpoints are known here, so
    /// the stitched path runs straight across each leg.
    pub fn geometry(&self) -> [Coordinate; 2] {
        [self.entry, self.exit]
    }
}

/// Flattened coordinates for the matrix query: the optional trip start
/// followed by an entry/exit pair per leg, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointList {
    points: Vec<Coordinate>,
    has_start: bool,
}

impl WaypointList {
    /// Waypoint count for `legs` legs plus an optional trip start, or
    /// `TooManyWaypoints` past [`MAX_WAYPOINTS`].
    pub fn count_for(legs: usize, has_start: bool) -> Result<usize, SolverError> {
        let count = legs * 2 + usize::from(has_start);
        if count > MAX_WAYPOINTS {
            return Err(SolverError::TooManyWaypoints {
                count,
                max: MAX_WAYPOINTS,
            });
        }
        Ok(count)
    }

    pub fn build(trip_start: Option<Coordinate>, legs: &[Leg]) -> Result<Self, SolverError> {
        let count = Self::count_for(legs.len(), trip_start.is_some())?;

        let mut points = Vec::with_capacity(count);
        if let Some(start) = trip_start {
            points.push(start);
        }
        for leg in legs {
            points.push(leg.entry);
            points.push(leg.exit);
        }

        Ok(Self {
            points,
            has_start: trip_start.is_some(),
        })
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_start(&self) -> bool {
        self.has_start
    }

    pub fn leg_count(&self) -> usize {
        (self.points.len() - usize::from(self.has_start)) / 2
    }

    pub fn index(&self) -> WaypointIndex {
        WaypointIndex {
            has_start: self.has_start,
        }
    }
}

/// Maps legs to their rows/columns in the cost matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointIndex {
    pub has_start: bool,
}

impl WaypointIndex {
    pub fn start(&self) -> Option<usize> {
        self.has_start.then_some(0)
    }

    pub fn entry(&self, leg: usize) -> usize {
        usize::from(self.has_start) + 2 * leg
    }

    pub fn exit(&self, leg: usize) -> usize {
        usize::from(self.has_start) + 2 * leg + 1
    }
}

/// Pairwise travel costs between waypoints. Distances in meters, durations
/// in seconds. Values may be asymmetric.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CostMatrix {
    pub distances: Vec<Vec<f64>>,
    pub durations: Vec<Vec<f64>>,
}

impl CostMatrix {
    pub fn new(distances: Vec<Vec<f64>>, durations: Vec<Vec<f64>>) -> Self {
        Self {
            distances,
            durations,
        }
    }

    pub fn size(&self) -> usize {
        self.distances.len()
    }

    /// Checks both arrays are `expected` × `expected`.
    pub fn check_dimensions(&self, expected: usize) -> Result<(), SolverError> {
        let square = |rows: &[Vec<f64>]| {
            rows.len() == expected && rows.iter().all(|row| row.len() == expected)
        };
        if square(&self.distances) && square(&self.durations) {
            Ok(())
        } else {
            Err(SolverError::MatrixShape {
                expected,
                rows: self.distances.len(),
            })
        }
    }

    pub fn distance(&self, from: usize, to: usize) -> Result<f64, SolverError> {
        checked_cell(&self.distances, from, to)
    }

    pub fn duration(&self, from: usize, to: usize) -> Result<f64, SolverError> {
        checked_cell(&self.durations, from, to)
    }
}

fn checked_cell(rows: &[Vec<f64>], from: usize, to: usize) -> Result<f64, SolverError> {
    let value = rows
        .get(from)
        .and_then(|row| row.get(to))
        .copied()
        .ok_or(SolverError::MissingCell { from, to })?;

    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SolverError::InvalidCell { from, to, value })
    }
}

/// Validated per-trip limits.
#[derive(Debug, Clone, PartialEq)]
pub struct TripConstraints {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_daily_distance_km: f64,
    pub max_daily_elevation_m: f64,
    /// Whether the caller supplied the distance cap explicitly.
    pub custom_distance: bool,
    /// Whether the caller supplied the elevation cap explicitly.
    pub custom_elevation: bool,
}

impl TripConstraints {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_daily_distance_km: f64,
        max_daily_elevation_m: f64,
    ) -> Self {
        Self {
            start_date,
            end_date,
            max_daily_distance_km,
            max_daily_elevation_m,
            custom_distance: false,
            custom_elevation: false,
        }
    }

    /// Inclusive day count of the date range, capped at [`MAX_TRIP_DAYS`].
    pub fn max_days(&self) -> u32 {
        days_between_inclusive(self.start_date, self.end_date).min(MAX_TRIP_DAYS)
    }
}

/// Inclusive number of calendar days from `start` to `end`; zero when
/// `end` precedes `start`.
pub fn days_between_inclusive(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}
