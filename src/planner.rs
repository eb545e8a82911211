//! `plan_trip`: validate, fetch, solve, partition, stitch, assemble.
//!
//! Stages run strictly in that order; each consumes the previous stage's
//! output. External calls are the only suspension points and are guarded
//! by the request deadline.

use std::sync::Arc;
use std::time::Instant;

use crate::api::{DayRoute, LineString, PlanInput, PlanResponse, PlanSuccess, SegmentRef};
use crate::config::PlannerConfig;
use crate::deadline::Deadline;
use crate::elevation;
use crate::error::{LimitKind, PartitionError, PlanError, ProviderError};
use crate::events::{EventSink, PlanEvent, TracingSink};
use crate::model::{Leg, TripConstraints, WaypointList};
use crate::partition::{partition_days, DayPartition};
use crate::solver::{solve_costs, LegCosts, Ordering, SolveMethod, SolveOptions};
use crate::stitch::{StitchedGeometry, Stitcher};
use crate::traits::{CostMatrixProvider, ElevationService, SegmentCatalog, TransferRouter};

pub struct TripPlanner<C, M, R, E> {
    catalog: C,
    matrix: M,
    router: R,
    elevation: E,
    config: PlannerConfig,
    sink: Arc<dyn EventSink>,
}

impl<C, M, R, E> TripPlanner<C, M, R, E>
where
    C: SegmentCatalog,
    M: CostMatrixProvider,
    R: TransferRouter + Sync,
    E: ElevationService + Sync,
{
    pub fn new(catalog: C, matrix: M, router: R, elevation: E) -> Self {
        Self {
            catalog,
            matrix,
            router,
            elevation,
            config: PlannerConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans a trip.
    ///
    /// Infeasible plans and upstream failures come back as
    /// `Ok(PlanResponse::Failure)` with a wire error code. Malformed input,
    /// an expired deadline or a broken internal invariant are `Err`.
    pub fn plan_trip(&self, input: &PlanInput) -> Result<PlanResponse, PlanError> {
        match self.plan(input) {
            Ok(plan) => Ok(PlanResponse::Success(plan)),
            Err(err) => match err.code() {
                Some(code) => {
                    self.sink.emit(&PlanEvent::PlanRejected {
                        reason: err.to_string(),
                    });
                    Ok(PlanResponse::failure(code, err.to_string()))
                }
                None => Err(err),
            },
        }
    }

    fn plan(&self, input: &PlanInput) -> Result<PlanSuccess, PlanError> {
        let deadline = Deadline::new(self.config.request_deadline);
        let constraints = input.validate()?;
        let trip_start = input.trip_start();

        WaypointList::count_for(input.segments.len(), trip_start.is_some())?;

        let legs = self.fetch_legs(input, &deadline)?;
        let waypoints = WaypointList::build(trip_start, &legs)?;

        deadline.check("cost matrix")?;
        let fetch_started = Instant::now();
        let matrix = self
            .matrix
            .matrix_for(waypoints.points())
            .map_err(|err| PlanError::external("cost matrix", err))?;
        self.sink.emit(&PlanEvent::MatrixFetched {
            waypoints: waypoints.len(),
            elapsed_ms: fetch_started.elapsed().as_millis() as u64,
        });

        deadline.check("solve")?;
        let options = SolveOptions {
            time_budget: self.config.solver_budget,
            max_two_opt_passes: self.config.max_two_opt_passes,
            leg_speed_kmh: self.config.leg_speed_kmh,
            ..SolveOptions::default()
        };
        let costs = LegCosts::build(&legs, &matrix, waypoints.has_start(), options.leg_speed_kmh)?;
        let ordering = solve_costs(&costs, &options, Instant::now());
        self.report_solve(&ordering, &options);

        let days = partition_days(&legs, &ordering, &costs, &constraints, self.sink.as_ref())
            .map_err(|source| limit_error(source, &constraints))?;

        deadline.check("stitch")?;
        let stitcher = Stitcher::new(&self.router, &self.elevation, self.sink.as_ref());
        let stitched = stitcher.stitch(&legs, &ordering, &costs, trip_start, &deadline)?;
        if stitched.ranges.len() != ordering.legs.len() {
            return Err(PlanError::Internal(format!(
                "stitched {} legs but ordered {}",
                stitched.ranges.len(),
                ordering.legs.len()
            )));
        }

        let routes = days
            .iter()
            .map(|day| self.day_route(day, &legs, &ordering, &stitched))
            .collect::<Result<Vec<_>, _>>()?;
        let plan = PlanSuccess::from_routes(routes);

        self.sink.emit(&PlanEvent::PlanCompleted {
            days: plan.routes.len(),
            total_distance_km: plan.total_distance_km,
            elapsed_ms: deadline.elapsed().as_millis() as u64,
        });
        Ok(plan)
    }

    fn fetch_legs(&self, input: &PlanInput, deadline: &Deadline) -> Result<Vec<Leg>, PlanError> {
        let mut legs = Vec::with_capacity(input.segments.len());
        for request in &input.segments {
            deadline.check("segment lookup")?;
            let meta = self
                .catalog
                .segment_meta(&request.segment_id)
                .map_err(|err| match err {
                    ProviderError::NotFound(_) => {
                        PlanError::UnknownSegment(request.segment_id.clone())
                    }
                    other => PlanError::external("segment lookup", other),
                })?;
            legs.push(Leg::from_meta(&meta, request.forward_direction));
        }
        Ok(legs)
    }

    fn report_solve(&self, ordering: &Ordering, options: &SolveOptions) {
        let legs = ordering.legs.len();
        if ordering.method == SolveMethod::Heuristic && legs <= options.exact_leg_limit {
            self.sink.emit(&PlanEvent::SolverFellBack {
                legs,
                budget_ms: options.time_budget.as_millis() as u64,
            });
        }
        self.sink.emit(&PlanEvent::SolverFinished {
            method: ordering.method,
            legs,
            total_distance_m: ordering.total_distance_m,
            elapsed_ms: ordering.solving_time_ms,
        });
    }

    fn day_route(
        &self,
        day: &DayPartition,
        legs: &[Leg],
        ordering: &Ordering,
        stitched: &StitchedGeometry,
    ) -> Result<DayRoute, PlanError> {
        let positions = day.positions();
        if ordering.legs.get(positions.clone()) != Some(day.legs.as_slice()) {
            return Err(PlanError::Internal(format!(
                "day {} legs do not match the ordering",
                day.day_number
            )));
        }

        let line = stitched.day_line(positions.clone());
        let climb = elevation::estimate(&line);
        tracing::debug!(
            day = day.day_number,
            planned_km = day.distance_km,
            routed_km = stitched.distance_m(positions.clone()) / 1000.0,
            planned_gain_m = day.elevation_gain_m,
            routed_gain_m = stitched.elevation_gain_m(positions),
            "day totals"
        );

        let segments = day
            .legs
            .iter()
            .map(|&index| {
                let leg = legs.get(index).ok_or_else(|| {
                    PlanError::Internal(format!("ordering references missing leg {index}"))
                })?;
                Ok(SegmentRef {
                    id: leg.segment_id.clone(),
                    name: leg.name.clone(),
                    url: segment_url(&self.config.segment_url_base, &leg.segment_id),
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Ok(DayRoute {
            day_number: day.day_number,
            // The partitioner's totals are the ones checked against the caps.
            distance_km: round_down(day.distance_km, 2),
            elevation_gain_m: round_down(day.elevation_gain_m, 0),
            ascent_m: round_to(climb.ascent_m, 0),
            descent_m: round_to(climb.descent_m, 0),
            geometry: LineString::from_coordinates(&line),
            segments,
            duration_minutes: round_to(day.duration_minutes, 0),
        })
    }
}

/// Attaches whether the broken limit was caller-supplied.
fn limit_error(source: PartitionError, constraints: &TripConstraints) -> PlanError {
    let custom_limit = match &source {
        PartitionError::SingleUnitExceedsLimit {
            kind: LimitKind::Distance,
            ..
        } => constraints.custom_distance,
        PartitionError::SingleUnitExceedsLimit {
            kind: LimitKind::Elevation,
            ..
        } => constraints.custom_elevation,
        PartitionError::NeedMoreDays { .. } => false,
    };
    PlanError::Partition {
        source,
        custom_limit,
    }
}

fn segment_url(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Rounds toward zero, so a total within a cap stays within it. Values a
/// hair under a step (float noise) snap up to it.
fn round_down(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 1e-6).floor() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_url() {
        assert_eq!(
            segment_url("https://www.strava.com/segments/", "42"),
            "https://www.strava.com/segments/42"
        );
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345, 2), 12.35);
        assert_eq!(round_to(999.6, 0), 1000.0);
    }

    #[test]
    fn test_round_down_never_exceeds_value() {
        assert_eq!(round_down(999.6, 0), 999.0);
        assert_eq!(round_down(29.999, 2), 29.99);
        assert_eq!(round_down(0.1 + 0.2, 1), 0.3);
        assert_eq!(round_down(60.0, 2), 60.0);
    }
}
