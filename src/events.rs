//! Structured planning events.
//!
//! The core reports what happened through an [`EventSink`] instead of
//! formatting log lines itself. [`TracingSink`] is the production sink.

use std::sync::Mutex;

use crate::solver::SolveMethod;

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    MatrixFetched {
        waypoints: usize,
        elapsed_ms: u64,
    },
    SolverFinished {
        method: SolveMethod,
        legs: usize,
        total_distance_m: f64,
        elapsed_ms: u64,
    },
    /// The exact search ran out of budget and the heuristic took over.
    SolverFellBack {
        legs: usize,
        budget_ms: u64,
    },
    DayClosed {
        day_number: u32,
        legs: usize,
        distance_km: f64,
        elevation_gain_m: f64,
    },
    TransferFallback {
        to_leg: String,
        reason: String,
    },
    /// Upstream elevation for a transfer was missing or not finite.
    ElevationDiscarded {
        to_leg: String,
        reason: String,
    },
    PlanCompleted {
        days: usize,
        total_distance_km: f64,
        elapsed_ms: u64,
    },
    PlanRejected {
        reason: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PlanEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PlanEvent) {
        match event {
            PlanEvent::MatrixFetched {
                waypoints,
                elapsed_ms,
            } => tracing::debug!(waypoints, elapsed_ms, "cost matrix fetched"),
            PlanEvent::SolverFinished {
                method,
                legs,
                total_distance_m,
                elapsed_ms,
            } => tracing::info!(
                method = method.as_str(),
                legs,
                total_distance_m,
                elapsed_ms,
                "leg order solved"
            ),
            PlanEvent::SolverFellBack { legs, budget_ms } => {
                tracing::warn!(legs, budget_ms, "exact search over budget, using heuristic")
            }
            PlanEvent::DayClosed {
                day_number,
                legs,
                distance_km,
                elevation_gain_m,
            } => tracing::debug!(day_number, legs, distance_km, elevation_gain_m, "day closed"),
            PlanEvent::TransferFallback { to_leg, reason } => {
                tracing::warn!(to_leg = %to_leg, reason = %reason, "transfer routing failed, using straight line")
            }
            PlanEvent::ElevationDiscarded { to_leg, reason } => {
                tracing::warn!(to_leg = %to_leg, reason = %reason, "transfer elevation treated as zero")
            }
            PlanEvent::PlanCompleted {
                days,
                total_distance_km,
                elapsed_ms,
            } => tracing::info!(days, total_distance_km, elapsed_ms, "trip planned"),
            PlanEvent::PlanRejected { reason } => {
                tracing::info!(reason = %reason, "trip rejected")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &PlanEvent) {}
}

/// Keeps every event in memory. Useful in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PlanEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlanEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &PlanEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
