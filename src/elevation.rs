//! Ascent/descent estimation for coordinate sequences.
//!
//! Sampled elevations are summed directly. Without samples a heuristic
//! based on distance and path wiggliness stands in; it is an approximation
//! and must not be read as measured terrain.
//!
//! The heuristic is `distance × complexity × HEURISTIC_SCALE`, where
//! complexity sums every step's coordinate delta (degrees) and heading
//! change (radians). Since complexity grows with path length, the result
//! is additionally capped at a mean grade of `MAX_HEURISTIC_GRADE`.

use std::f64::consts::PI;

use crate::error::ProviderError;
use crate::haversine::path_length_m;
use crate::model::Coordinate;
use crate::polyline::{Polyline, OSRM_PRECISION};
use crate::traits::ElevationService;

/// Meters of elevation change per meter of distance per unit complexity.
pub const HEURISTIC_SCALE: f64 = 0.03;

/// Heuristic estimates never imply a mean grade above this. Not part of
/// the plain distance × complexity formula.
pub const MAX_HEURISTIC_GRADE: f64 = 0.12;

/// Share of heuristic elevation change attributed to ascent.
pub const ASCENT_SHARE: f64 = 0.55;

/// Placeholder meters of elevation per encoded polyline character.
pub const PSEUDO_METERS_PER_CHAR: f64 = 0.5;

/// Upper bound for the encoded-length placeholder.
pub const PSEUDO_MAX_ELEVATION_M: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElevationSummary {
    pub ascent_m: f64,
    pub descent_m: f64,
}

impl ElevationSummary {
    fn split(total_change_m: f64) -> Self {
        Self {
            ascent_m: total_change_m * ASCENT_SHARE,
            descent_m: total_change_m * (1.0 - ASCENT_SHARE),
        }
    }
}

/// Ascent and descent along `points`, from samples when any consecutive
/// pair carries elevation, otherwise from [`heuristic`].
pub fn estimate(points: &[Coordinate]) -> ElevationSummary {
    from_samples(points).unwrap_or_else(|| heuristic(points))
}

/// Sums elevation deltas over consecutive pairs that both carry a finite
/// sample. `None` when no such pair exists.
pub fn from_samples(points: &[Coordinate]) -> Option<ElevationSummary> {
    let mut summary = ElevationSummary::default();
    let mut sampled_pairs = 0usize;

    for pair in points.windows(2) {
        let (Some(from), Some(to)) = (pair[0].elevation, pair[1].elevation) else {
            continue;
        };
        if !from.is_finite() || !to.is_finite() {
            continue;
        }
        sampled_pairs += 1;

        let delta = to - from;
        if delta > 0.0 {
            summary.ascent_m += delta;
        } else {
            summary.descent_m += -delta;
        }
    }

    (sampled_pairs > 0).then_some(summary)
}

/// Distance × complexity × [`HEURISTIC_SCALE`], split 55/45.
pub fn heuristic(points: &[Coordinate]) -> ElevationSummary {
    if points.len() < 2 {
        return ElevationSummary::default();
    }

    let distance_m = path_length_m(points);
    let total = (distance_m * path_complexity(points) * HEURISTIC_SCALE)
        .min(distance_m * MAX_HEURISTIC_GRADE);

    if total.is_finite() {
        ElevationSummary::split(total)
    } else {
        ElevationSummary::default()
    }
}

/// Sum over steps of the Euclidean coordinate delta (degrees) plus the
/// absolute heading change from the previous step (radians).
pub fn path_complexity(points: &[Coordinate]) -> f64 {
    let mut complexity = 0.0;
    let mut previous_heading: Option<f64> = None;

    for pair in points.windows(2) {
        if pair[0].same_position(&pair[1]) {
            continue;
        }
        let dlon = pair[1].lon - pair[0].lon;
        let dlat = pair[1].lat - pair[0].lat;
        complexity += dlon.hypot(dlat);

        let heading = dlat.atan2(dlon);
        if let Some(previous) = previous_heading {
            let mut turn = (heading - previous).abs();
            if turn > PI {
                turn = 2.0 * PI - turn;
            }
            complexity += turn;
        }
        previous_heading = Some(heading);
    }

    complexity
}

/// Placeholder for when only an encoded polyline string is available and
/// it cannot be decoded: scales the string length. Not derived from
/// geometry; deterministic and bounded, nothing more.
pub fn pseudo_from_encoded_length(encoded: &str) -> ElevationSummary {
    let total = (encoded.len() as f64 * PSEUDO_METERS_PER_CHAR).min(PSEUDO_MAX_ELEVATION_M);
    ElevationSummary::split(total)
}

/// Estimates an encoded polyline: decoded geometry when possible, the
/// length placeholder otherwise.
pub fn estimate_encoded(encoded: &str) -> ElevationSummary {
    match Polyline::decode(encoded, OSRM_PRECISION) {
        Ok(polyline) if polyline.points().len() >= 2 => estimate(polyline.points()),
        _ => pseudo_from_encoded_length(encoded),
    }
}

/// [`ElevationService`] backed by the local estimator, for deployments
/// without an elevation API.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedElevation;

impl ElevationService for EstimatedElevation {
    fn elevation_gain(&self, encoded_geometry: &str) -> Result<f64, ProviderError> {
        Ok(estimate_encoded(encoded_geometry).ascent_m)
    }
}
