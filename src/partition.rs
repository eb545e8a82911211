//! Daily partitioner.
//!
//! A single greedy left-to-right pass over the solver's order. A day is
//! closed as soon as the next leg (with its inbound transfer) would push it
//! over either daily cap. Legs are never split or reordered.

use crate::error::{LimitKind, PartitionError};
use crate::events::{EventSink, PlanEvent};
use crate::model::{Leg, TripConstraints};
use crate::solver::{LegCosts, Ordering};

/// Legs assigned to one trip day, with aggregate metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPartition {
    /// 1-based, contiguous.
    pub day_number: u32,
    /// Input leg indices in travel order.
    pub legs: Vec<usize>,
    /// Positions of those legs within the ordering.
    pub first_position: usize,
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub duration_minutes: f64,
}

impl DayPartition {
    /// Half-open range of ordering positions covered by this day.
    pub fn positions(&self) -> std::ops::Range<usize> {
        self.first_position..self.first_position + self.legs.len()
    }
}

#[derive(Debug, Default)]
struct OpenDay {
    legs: Vec<usize>,
    first_position: usize,
    distance_km: f64,
    elevation_gain_m: f64,
    duration_s: f64,
}

impl OpenDay {
    fn close(self, day_number: u32) -> DayPartition {
        DayPartition {
            day_number,
            legs: self.legs,
            first_position: self.first_position,
            distance_km: self.distance_km,
            elevation_gain_m: self.elevation_gain_m,
            duration_minutes: self.duration_s / 60.0,
        }
    }
}

/// Slices the ordered legs into days.
///
/// The inbound transfer of each leg (from the previous leg's exit, or from
/// the trip start for the first leg) counts toward the day that leg lands
/// on. Fails as soon as a single leg cannot fit any day, or as soon as a
/// day beyond the allowed count would have to be opened.
pub fn partition_days(
    legs: &[Leg],
    ordering: &Ordering,
    costs: &LegCosts,
    constraints: &TripConstraints,
    sink: &dyn EventSink,
) -> Result<Vec<DayPartition>, PartitionError> {
    let max_days = constraints.max_days();
    let max_km = constraints.max_daily_distance_km;
    let max_elevation = constraints.max_daily_elevation_m;
    let order = &ordering.legs;

    let mut days: Vec<DayPartition> = Vec::new();
    let mut current = OpenDay::default();

    for (pos, &leg_index) in order.iter().enumerate() {
        let leg = &legs[leg_index];
        let transfer_km = costs.inbound_distance(order, pos) / 1000.0;
        let leg_km = leg.length_m / 1000.0;
        let unit_km = transfer_km + leg_km;
        let unit_elevation = leg.elevation_gain_m;
        let unit_duration = costs.inbound_duration(order, pos) + costs.leg_duration(leg_index);

        if unit_km > max_km {
            return Err(PartitionError::SingleUnitExceedsLimit {
                segment_id: leg.segment_id.clone(),
                kind: LimitKind::Distance,
                limit: max_km,
                value: unit_km,
                transfer_dominated: leg_km <= max_km,
            });
        }
        if unit_elevation > max_elevation {
            return Err(PartitionError::SingleUnitExceedsLimit {
                segment_id: leg.segment_id.clone(),
                kind: LimitKind::Elevation,
                limit: max_elevation,
                value: unit_elevation,
                transfer_dominated: false,
            });
        }

        let overflows = current.distance_km + unit_km > max_km
            || current.elevation_gain_m + unit_elevation > max_elevation;
        if overflows && !current.legs.is_empty() {
            let day_number = days.len() as u32 + 1;
            let closed = std::mem::take(&mut current).close(day_number);
            emit_closed(sink, &closed);
            days.push(closed);

            if days.len() as u32 >= max_days {
                return Err(PartitionError::NeedMoreDays {
                    required_at_least: days.len() as u32 + 1,
                    max_days,
                });
            }
            current.first_position = pos;
        }

        current.legs.push(leg_index);
        current.distance_km += unit_km;
        current.elevation_gain_m += unit_elevation;
        current.duration_s += unit_duration;
    }

    if !current.legs.is_empty() {
        let day_number = days.len() as u32 + 1;
        if day_number > max_days {
            return Err(PartitionError::NeedMoreDays {
                required_at_least: day_number,
                max_days,
            });
        }
        let closed = current.close(day_number);
        emit_closed(sink, &closed);
        days.push(closed);
    }

    Ok(days)
}

fn emit_closed(sink: &dyn EventSink, day: &DayPartition) {
    sink.emit(&PlanEvent::DayClosed {
        day_number: day.day_number,
        legs: day.legs.len(),
        distance_km: day.distance_km,
        elevation_gain_m: day.elevation_gain_m,
    });
}
