//! Wire types for `plan_trip`: the request, the `{ok: true}` plan and the
//! `{ok: false}` failure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, PlanError};
use crate::model::{
    days_between_inclusive, Coordinate, TripConstraints, DAILY_DISTANCE_RANGE_KM,
    DAILY_ELEVATION_RANGE_M, DEFAULT_MAX_DAILY_DISTANCE_KM, DEFAULT_MAX_DAILY_ELEVATION_M,
    MAX_TRIP_DAYS,
};

pub const MAX_SEGMENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRequest {
    pub segment_id: String,
    #[serde(default = "default_forward")]
    pub forward_direction: bool,
}

fn default_forward() -> bool {
    true
}

impl SegmentRequest {
    pub fn forward(segment_id: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            forward_direction: true,
        }
    }

    pub fn reverse(segment_id: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            forward_direction: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    pub segments: Vec<SegmentRequest>,
    /// `[lon, lat]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_start: Option<[f64; 2]>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_elevation_m: Option<f64>,
}

impl PlanInput {
    pub fn trip_start(&self) -> Option<Coordinate> {
        self.trip_start.map(|[lon, lat]| Coordinate::new(lon, lat))
    }

    /// Checks everything that can be checked without calling out.
    pub fn validate(&self) -> Result<TripConstraints, PlanError> {
        if self.segments.is_empty() {
            return Err(PlanError::InvalidInput("at least one segment is required".into()));
        }
        if self.segments.len() > MAX_SEGMENTS {
            return Err(PlanError::InvalidInput(format!(
                "at most {MAX_SEGMENTS} segments are allowed, got {}",
                self.segments.len()
            )));
        }
        if let Some(blank) = self.segments.iter().position(|s| s.segment_id.trim().is_empty()) {
            return Err(PlanError::InvalidInput(format!("segment {blank} has an empty id")));
        }
        if let Some(start) = self.trip_start() {
            if !start.is_valid() {
                return Err(PlanError::InvalidInput(format!(
                    "trip start {:?} is not a valid [lon, lat]",
                    self.trip_start
                )));
            }
        }

        if self.end_date < self.start_date {
            return Err(PlanError::InvalidInput("endDate is before startDate".into()));
        }
        let span = days_between_inclusive(self.start_date, self.end_date);
        if span > MAX_TRIP_DAYS {
            return Err(PlanError::InvalidInput(format!(
                "trip spans {span} days, the maximum is {MAX_TRIP_DAYS}"
            )));
        }

        let distance = checked_limit(
            "maxDailyDistanceKm",
            self.max_daily_distance_km,
            DEFAULT_MAX_DAILY_DISTANCE_KM,
            DAILY_DISTANCE_RANGE_KM,
        )?;
        let elevation = checked_limit(
            "maxDailyElevationM",
            self.max_daily_elevation_m,
            DEFAULT_MAX_DAILY_ELEVATION_M,
            DAILY_ELEVATION_RANGE_M,
        )?;

        let mut constraints =
            TripConstraints::new(self.start_date, self.end_date, distance, elevation);
        constraints.custom_distance = self.max_daily_distance_km.is_some();
        constraints.custom_elevation = self.max_daily_elevation_m.is_some();
        Ok(constraints)
    }
}

fn checked_limit(
    name: &str,
    value: Option<f64>,
    default: f64,
    (min, max): (f64, f64),
) -> Result<f64, PlanError> {
    let value = value.unwrap_or(default);
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(PlanError::InvalidInput(format!(
            "{name} must be between {min} and {max}, got {value}"
        )))
    }
}

/// GeoJSON LineString.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<f64>>,
}

impl LineString {
    pub fn from_coordinates(points: &[Coordinate]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: points.iter().map(Coordinate::position).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRef {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRoute {
    pub day_number: u32,
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub ascent_m: f64,
    pub descent_m: f64,
    pub geometry: LineString,
    pub segments: Vec<SegmentRef>,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSuccess {
    pub ok: bool,
    pub routes: Vec<DayRoute>,
    pub total_distance_km: f64,
    pub total_elevation_gain_m: f64,
    pub total_ascent_m: f64,
    pub total_descent_m: f64,
    pub total_duration_minutes: f64,
}

impl PlanSuccess {
    /// Totals are the sums over `routes`.
    pub fn from_routes(routes: Vec<DayRoute>) -> Self {
        let sum = |f: fn(&DayRoute) -> f64| routes.iter().map(f).sum::<f64>();
        Self {
            ok: true,
            total_distance_km: sum(|r| r.distance_km),
            total_elevation_gain_m: sum(|r| r.elevation_gain_m),
            total_ascent_m: sum(|r| r.ascent_m),
            total_descent_m: sum(|r| r.descent_m),
            total_duration_minutes: sum(|r| r.duration_minutes),
            routes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFailure {
    pub ok: bool,
    pub error: ErrorCode,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanResponse {
    Success(PlanSuccess),
    Failure(PlanFailure),
}

impl PlanResponse {
    pub fn failure(error: ErrorCode, details: impl Into<String>) -> Self {
        PlanResponse::Failure(PlanFailure {
            ok: false,
            error,
            details: details.into(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PlanResponse::Success(_))
    }

    pub fn success(&self) -> Option<&PlanSuccess> {
        match self {
            PlanResponse::Success(plan) => Some(plan),
            PlanResponse::Failure(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            PlanResponse::Success(_) => None,
            PlanResponse::Failure(failure) => Some(failure.error),
        }
    }
}
