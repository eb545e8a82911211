//! Geometry stitcher.
//!
//! Builds one continuous coordinate sequence across the ordered legs and
//! the transfers between them, with per-leg index ranges and cumulative
//! distance/elevation so day slices can be cut out without re-parsing.
//!
//! Each leg contributes only its entry and exit points; the detailed
//! segment shape is not fetched here.

use std::ops::Range;

use rayon::prelude::*;

use crate::deadline::Deadline;
use crate::error::PlanError;
use crate::events::{EventSink, PlanEvent};
use crate::model::{Coordinate, Leg};
use crate::polyline::{Polyline, OSRM_PRECISION};
use crate::solver::{LegCosts, Ordering};
use crate::traits::{ElevationService, TransferRouter};

/// The stitched route.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StitchedGeometry {
    pub coordinates: Vec<Coordinate>,
    /// Half-open coordinate range per ordering position. The inbound
    /// transfer belongs to the leg it precedes.
    pub ranges: Vec<Range<usize>>,
    /// Distance at each leg boundary, meters. `len() == legs + 1`.
    pub cumulative_distance_m: Vec<f64>,
    /// Elevation gain at each leg boundary, meters. `len() == legs + 1`.
    pub cumulative_elevation_m: Vec<f64>,
}

impl StitchedGeometry {
    /// Coordinates covering the ordering positions in `positions`.
    pub fn slice(&self, positions: Range<usize>) -> &[Coordinate] {
        match self.coordinate_span(positions) {
            Some(span) => &self.coordinates[span],
            None => &[],
        }
    }

    /// Like [`slice`](Self::slice) but starting at the last point of the
    /// previous leg, so consecutive days join up.
    pub fn day_line(&self, positions: Range<usize>) -> Vec<Coordinate> {
        match self.coordinate_span(positions) {
            Some(span) => self.coordinates[span.start.saturating_sub(1)..span.end].to_vec(),
            None => Vec::new(),
        }
    }

    pub fn distance_m(&self, positions: Range<usize>) -> f64 {
        span_delta(&self.cumulative_distance_m, positions)
    }

    pub fn elevation_gain_m(&self, positions: Range<usize>) -> f64 {
        span_delta(&self.cumulative_elevation_m, positions)
    }

    pub fn total_distance_m(&self) -> f64 {
        self.cumulative_distance_m.last().copied().unwrap_or(0.0)
    }

    pub fn total_elevation_gain_m(&self) -> f64 {
        self.cumulative_elevation_m.last().copied().unwrap_or(0.0)
    }

    fn coordinate_span(&self, positions: Range<usize>) -> Option<Range<usize>> {
        if positions.is_empty() || positions.end > self.ranges.len() {
            return None;
        }
        Some(self.ranges[positions.start].start..self.ranges[positions.end - 1].end)
    }
}

fn span_delta(cumulative: &[f64], positions: Range<usize>) -> f64 {
    match (cumulative.get(positions.start), cumulative.get(positions.end)) {
        (Some(start), Some(end)) if positions.end > positions.start => end - start,
        _ => 0.0,
    }
}

/// A resolved inbound transfer.
#[derive(Debug, Clone)]
struct Transfer {
    geometry: Vec<Coordinate>,
    length_m: f64,
    elevation_gain_m: f64,
    fallback: Option<String>,
    elevation_note: Option<String>,
}

pub struct Stitcher<'a, R, E> {
    pub router: &'a R,
    pub elevation: &'a E,
    pub sink: &'a dyn EventSink,
}

impl<'a, R, E> Stitcher<'a, R, E>
where
    R: TransferRouter + Sync,
    E: ElevationService + Sync,
{
    pub fn new(router: &'a R, elevation: &'a E, sink: &'a dyn EventSink) -> Self {
        Self {
            router,
            elevation,
            sink,
        }
    }

    /// Stitches the ordered legs. Transfer lookups run in parallel; a
    /// failed lookup degrades to a straight line for that pair only. Only
    /// the request deadline aborts the stitch.
    pub fn stitch(
        &self,
        legs: &[Leg],
        ordering: &Ordering,
        costs: &LegCosts,
        trip_start: Option<Coordinate>,
        deadline: &Deadline,
    ) -> Result<StitchedGeometry, PlanError> {
        let order = &ordering.legs;

        let transfers: Vec<Option<Transfer>> = (0..order.len())
            .into_par_iter()
            .map(|pos| {
                let destination = legs[order[pos]].entry;
                let origin = if pos == 0 {
                    trip_start
                } else {
                    Some(legs[order[pos - 1]].exit)
                };
                match origin {
                    Some(origin) => {
                        deadline.check("transfer routing")?;
                        let matrix_m = costs.inbound_distance(order, pos);
                        Ok(Some(self.resolve(origin, destination, matrix_m)))
                    }
                    None => Ok(None),
                }
            })
            .collect::<Result<_, PlanError>>()?;

        let mut stitched = StitchedGeometry {
            coordinates: Vec::new(),
            ranges: Vec::with_capacity(order.len()),
            cumulative_distance_m: vec![0.0],
            cumulative_elevation_m: vec![0.0],
        };

        for (pos, transfer) in transfers.iter().enumerate() {
            let leg = &legs[order[pos]];
            let start = stitched.coordinates.len();
            let (transfer_m, transfer_elevation) = match transfer {
                Some(transfer) => {
                    self.report(leg, transfer);
                    append_deduped(&mut stitched.coordinates, &transfer.geometry);
                    (transfer.length_m, transfer.elevation_gain_m)
                }
                None => (0.0, 0.0),
            };
            append_deduped(&mut stitched.coordinates, &leg.geometry());
            stitched.ranges.push(start..stitched.coordinates.len());

            let distance = stitched.total_distance_m() + transfer_m + leg.length_m;
            let elevation = stitched.total_elevation_gain_m()
                + transfer_elevation
                + finite_gain(leg.elevation_gain_m).unwrap_or(0.0);
            stitched.cumulative_distance_m.push(distance);
            stitched.cumulative_elevation_m.push(elevation);
        }

        Ok(stitched)
    }

    fn resolve(&self, origin: Coordinate, destination: Coordinate, matrix_m: f64) -> Transfer {
        if origin.same_position(&destination) {
            return Transfer {
                geometry: vec![origin],
                length_m: 0.0,
                elevation_gain_m: 0.0,
                fallback: None,
                elevation_note: None,
            };
        }

        let routed = self
            .router
            .route_between(origin, destination)
            .map_err(|err| err.to_string())
            .and_then(|route| {
                let polyline = Polyline::decode(&route.encoded_geometry, OSRM_PRECISION)
                    .map_err(|err| err.to_string())?;
                if polyline.points().len() < 2 {
                    return Err("routed geometry has fewer than two points".to_string());
                }
                Ok((route, polyline))
            });

        match routed {
            Ok((route, polyline)) => {
                let length_m = if route.length_meters.is_finite() && route.length_meters >= 0.0 {
                    route.length_meters
                } else {
                    matrix_m
                };
                let (elevation_gain_m, elevation_note) =
                    match self.elevation.elevation_gain(&route.encoded_geometry) {
                        Ok(gain) => match finite_gain(gain) {
                            Some(gain) => (gain, None),
                            None => (0.0, Some(format!("non-finite gain {gain}"))),
                        },
                        Err(err) => (0.0, Some(err.to_string())),
                    };

                Transfer {
                    geometry: polyline.into_points(),
                    length_m,
                    elevation_gain_m,
                    fallback: None,
                    elevation_note,
                }
            }
            Err(reason) => Transfer {
                geometry: vec![origin, destination],
                length_m: matrix_m,
                elevation_gain_m: 0.0,
                fallback: Some(reason),
                elevation_note: None,
            },
        }
    }

    fn report(&self, leg: &Leg, transfer: &Transfer) {
        if let Some(reason) = &transfer.fallback {
            self.sink.emit(&PlanEvent::TransferFallback {
                to_leg: leg.segment_id.clone(),
                reason: reason.clone(),
            });
        }
        if let Some(reason) = &transfer.elevation_note {
            self.sink.emit(&PlanEvent::ElevationDiscarded {
                to_leg: leg.segment_id.clone(),
                reason: reason.clone(),
            });
        }
    }
}

/// Non-negative finite gain, or `None`.
fn finite_gain(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value.max(0.0))
    } else {
        None
    }
}

/// Appends `points`, skipping the first when it repeats the current last.
fn append_deduped(coordinates: &mut Vec<Coordinate>, points: &[Coordinate]) {
    let skip = match (coordinates.last(), points.first()) {
        (Some(last), Some(first)) if last.same_position(first) => 1,
        _ => 0,
    };
    coordinates.extend_from_slice(&points[skip..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_deduped_drops_repeated_boundary() {
        let mut coords = vec![Coordinate::new(1.0, 1.0)];
        append_deduped(&mut coords, &[Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]);
        assert_eq!(coords.len(), 2);

        append_deduped(&mut coords, &[Coordinate::new(3.0, 3.0)]);
        assert_eq!(coords.len(), 3);
    }

    #[test]
    fn test_append_deduped_ignores_elevation() {
        let mut coords = vec![Coordinate::with_elevation(1.0, 1.0, 100.0)];
        append_deduped(&mut coords, &[Coordinate::new(1.0, 1.0)]);
        assert_eq!(coords.len(), 1);
    }

    #[test]
    fn test_finite_gain() {
        assert_eq!(finite_gain(f64::NAN), None);
        assert_eq!(finite_gain(f64::INFINITY), None);
        assert_eq!(finite_gain(-5.0), Some(0.0));
        assert_eq!(finite_gain(12.0), Some(12.0));
    }

    #[test]
    fn test_slices_and_spans() {
        let stitched = StitchedGeometry {
            coordinates: (0..6).map(|i| Coordinate::new(i as f64, 0.0)).collect(),
            ranges: vec![0..2, 2..4, 4..6],
            cumulative_distance_m: vec![0.0, 10.0, 25.0, 40.0],
            cumulative_elevation_m: vec![0.0, 1.0, 3.0, 6.0],
        };

        assert_eq!(stitched.slice(1..3).len(), 4);
        assert_eq!(stitched.day_line(1..3).len(), 5);
        assert_eq!(stitched.day_line(0..1).len(), 2);
        assert_eq!(stitched.distance_m(1..3), 30.0);
        assert_eq!(stitched.elevation_gain_m(0..2), 3.0);
        assert!(stitched.slice(2..2).is_empty());
        assert!(stitched.slice(2..9).is_empty());
    }
}
