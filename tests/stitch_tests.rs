//! Stitcher output invariants over real stitches
//!
//! Per-leg ranges must tile the coordinate sequence exactly, and the
//! cumulative arrays must grow monotonically with one entry per boundary.

mod fixtures;

use std::sync::atomic::Ordering as AtomicOrdering;
use std::time::Duration;

use fixtures::*;
use trip_planner::deadline::Deadline;
use trip_planner::events::NoopSink;
use trip_planner::model::{Coordinate, Leg, WaypointList};
use trip_planner::solver::{solve, LegCosts, Ordering, SolveMethod, SolveOptions};
use trip_planner::stitch::{StitchedGeometry, Stitcher};
use trip_planner::traits::{CostMatrixProvider, ElevationService, TransferRouter};

// ============================================================================
// Test Fixtures
// ============================================================================

const TRIP_START: Coordinate = Coordinate::new(5.9, 45.0);

fn leg(id: &str, entry: (f64, f64), exit: (f64, f64), km: f64, climb: f64) -> Leg {
    Leg {
        segment_id: id.to_string(),
        name: id.to_string(),
        forward: true,
        entry: Coordinate::new(entry.0, entry.1),
        exit: Coordinate::new(exit.0, exit.1),
        length_m: km * 1000.0,
        elevation_gain_m: climb,
    }
}

/// Four legs: two pairs that share a boundary point, with a 10 km
/// transfer between the pairs.
fn chained_legs() -> Vec<Leg> {
    vec![
        leg("a", (6.00, 45.00), (6.10, 45.00), 10.0, 100.0),
        leg("b", (6.10, 45.00), (6.20, 45.00), 10.0, 100.0),
        leg("c", (6.25, 45.05), (6.30, 45.05), 5.0, 50.0),
        leg("d", (6.30, 45.05), (6.30, 45.10), 5.0, 50.0),
    ]
}

fn in_order(n: usize) -> Ordering {
    Ordering {
        legs: (0..n).collect(),
        method: SolveMethod::Exact,
        total_distance_m: 0.0,
        total_duration_s: 0.0,
        solving_time_ms: 0,
    }
}

fn grid_costs(legs: &[Leg], start: Option<Coordinate>) -> LegCosts {
    let waypoints = WaypointList::build(start, legs).unwrap();
    let matrix = GridMatrix::default().matrix_for(waypoints.points()).unwrap();
    LegCosts::build(legs, &matrix, start.is_some(), 18.0).unwrap()
}

fn stitch_with<R, E>(
    router: &R,
    elevation: &E,
    legs: &[Leg],
    ordering: &Ordering,
    start: Option<Coordinate>,
) -> StitchedGeometry
where
    R: TransferRouter + Sync,
    E: ElevationService + Sync,
{
    let costs = grid_costs(legs, start);
    let deadline = Deadline::new(Duration::from_secs(60));
    Stitcher::new(router, elevation, &NoopSink)
        .stitch(legs, ordering, &costs, start, &deadline)
        .unwrap()
}

fn assert_tiles(stitched: &StitchedGeometry, legs: usize) {
    assert_eq!(stitched.ranges.len(), legs);
    assert_eq!(stitched.ranges[0].start, 0);
    assert_eq!(
        stitched.ranges.last().map(|range| range.end),
        Some(stitched.coordinates.len())
    );
    for pair in stitched.ranges.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "gap or overlap at {pair:?}");
    }
    for range in &stitched.ranges {
        assert!(range.start < range.end, "empty range {range:?}");
    }

    for cumulative in [
        &stitched.cumulative_distance_m,
        &stitched.cumulative_elevation_m,
    ] {
        assert_eq!(cumulative.len(), legs + 1);
        assert_eq!(cumulative[0], 0.0);
        assert!(cumulative.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_ranges_tile_coordinates_with_trip_start() {
    let legs = chained_legs();
    let router = GridRouter::default();
    let stitched = stitch_with(
        &router,
        &FixedElevation(25.0),
        &legs,
        &in_order(4),
        Some(TRIP_START),
    );

    assert_tiles(&stitched, 4);
    assert_eq!(stitched.ranges, vec![0..3, 3..4, 4..6, 6..7]);
    assert_eq!(stitched.coordinates[0], TRIP_START);
    assert_eq!(stitched.coordinates[6], Coordinate::new(6.30, 45.10));
    // Shared boundaries need no routing.
    assert_eq!(router.calls.load(AtomicOrdering::SeqCst), 2);
}

#[test]
fn test_cumulative_totals_include_transfers() {
    let legs = chained_legs();
    let stitched = stitch_with(
        &GridRouter::default(),
        &FixedElevation(25.0),
        &legs,
        &in_order(4),
        Some(TRIP_START),
    );

    let expected_m = [0.0, 20_000.0, 30_000.0, 45_000.0, 50_000.0];
    for (actual, expected) in stitched.cumulative_distance_m.iter().zip(expected_m) {
        assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
    }
    assert!((stitched.total_elevation_gain_m() - 350.0).abs() < 1e-9);
    assert!((stitched.distance_m(2..4) - 20_000.0).abs() < 1e-6);
}

#[test]
fn test_day_line_starts_at_previous_exit() {
    let legs = chained_legs();
    let stitched = stitch_with(
        &GridRouter::default(),
        &FixedElevation(0.0),
        &legs,
        &in_order(4),
        Some(TRIP_START),
    );

    let line = stitched.day_line(2..4);
    assert_eq!(line.first(), Some(&legs[1].exit));
    assert_eq!(line.last(), Some(&legs[3].exit));
    assert_eq!(line.len(), stitched.slice(2..4).len() + 1);
}

#[test]
fn test_solver_order_tiles_without_trip_start() {
    // Reverse the chain so the solver has to reorder it.
    let mut legs = chained_legs();
    legs.reverse();
    let matrix = GridMatrix::default()
        .matrix_for(WaypointList::build(None, &legs).unwrap().points())
        .unwrap();
    let ordering = solve(&legs, &matrix, false, &SolveOptions::default()).unwrap();

    let stitched = stitch_with(
        &GridRouter::default(),
        &FixedElevation(10.0),
        &legs,
        &ordering,
        None,
    );
    assert_tiles(&stitched, legs.len());
    assert_eq!(stitched.coordinates[0], legs[ordering.legs[0]].entry);
}

#[test]
fn test_fallback_transfers_still_tile() {
    let legs = chained_legs();
    let stitched = stitch_with(
        &FailingRouter,
        &FixedElevation(25.0),
        &legs,
        &in_order(4),
        Some(TRIP_START),
    );

    assert_tiles(&stitched, 4);
    assert_eq!(stitched.ranges, vec![0..3, 3..4, 4..6, 6..7]);
    // Straight-line fallbacks carry matrix distance but no climb.
    assert!((stitched.total_distance_m() - 50_000.0).abs() < 1e-6);
    assert!((stitched.total_elevation_gain_m() - 300.0).abs() < 1e-9);
}
