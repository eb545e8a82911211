//! Error types for the planning pipeline and its collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of an external collaborator (matrix, routing, elevation, catalog).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: String, message: String },
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Caller configuration errors detected by the order solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("no legs to order")]
    EmptyLegSet,
    #[error("{count} waypoints exceeds the matrix limit of {max}")]
    TooManyWaypoints { count: usize, max: usize },
    #[error("cost matrix has {rows} rows, expected {expected}x{expected}")]
    MatrixShape { expected: usize, rows: usize },
    #[error("cost matrix is missing cell [{from}][{to}]")]
    MissingCell { from: usize, to: usize },
    #[error("cost matrix cell [{from}][{to}] is invalid: {value}")]
    InvalidCell { from: usize, to: usize, value: f64 },
    #[error("leg {index} has invalid length {value}")]
    InvalidLeg { index: usize, value: f64 },
}

/// Which daily cap a leg broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Distance,
    Elevation,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitKind::Distance => write!(f, "daily distance"),
            LimitKind::Elevation => write!(f, "daily elevation"),
        }
    }
}

/// Infeasibility detected while slicing the ordered legs into days.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    /// No grouping can help: this unit alone is over the cap.
    #[error("segment {segment_id} needs {value:.1} against a {kind} limit of {limit:.1}")]
    SingleUnitExceedsLimit {
        segment_id: String,
        kind: LimitKind,
        limit: f64,
        value: f64,
        /// The leg fits on its own; only its inbound transfer pushes it over.
        transfer_dominated: bool,
    },
    #[error("plan needs at least {required_at_least} days but only {max_days} are available")]
    NeedMoreDays { required_at_least: u32, max_days: u32 },
}

/// Fixed wire enumeration for `{ok: false}` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    DailyLimitExceeded,
    CustomLimitExceeded,
    NeedMoreDays,
    SegmentTooFar,
    ExternalApi,
}

/// Request-level failure of `plan_trip`.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown segment {0}")]
    UnknownSegment(String),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("{source}")]
    Partition {
        source: PartitionError,
        /// Whether the broken limit was supplied by the caller.
        custom_limit: bool,
    },
    #[error("{service} failed: {source}")]
    ExternalApi {
        service: &'static str,
        source: ProviderError,
    },
    #[error("request deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlanError {
    pub fn external(service: &'static str, source: ProviderError) -> Self {
        PlanError::ExternalApi { service, source }
    }

    /// Wire code for errors that become an `{ok: false}` response. Input,
    /// deadline and internal errors have none and go back to the caller.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            PlanError::Partition {
                source,
                custom_limit,
            } => Some(match source {
                PartitionError::NeedMoreDays { .. } => ErrorCode::NeedMoreDays,
                PartitionError::SingleUnitExceedsLimit {
                    transfer_dominated: true,
                    ..
                } => ErrorCode::SegmentTooFar,
                PartitionError::SingleUnitExceedsLimit { .. } if *custom_limit => {
                    ErrorCode::CustomLimitExceeded
                }
                PartitionError::SingleUnitExceedsLimit { .. } => ErrorCode::DailyLimitExceeded,
            }),
            PlanError::ExternalApi { .. } => Some(ErrorCode::ExternalApi),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn too_long(transfer_dominated: bool) -> PartitionError {
        PartitionError::SingleUnitExceedsLimit {
            segment_id: "s1".to_string(),
            kind: LimitKind::Distance,
            limit: 30.0,
            value: 42.0,
            transfer_dominated,
        }
    }

    #[test]
    fn test_limit_codes() {
        let daily = PlanError::Partition {
            source: too_long(false),
            custom_limit: false,
        };
        let custom = PlanError::Partition {
            source: too_long(false),
            custom_limit: true,
        };
        let far = PlanError::Partition {
            source: too_long(true),
            custom_limit: true,
        };
        assert_eq!(daily.code(), Some(ErrorCode::DailyLimitExceeded));
        assert_eq!(custom.code(), Some(ErrorCode::CustomLimitExceeded));
        assert_eq!(far.code(), Some(ErrorCode::SegmentTooFar));
    }

    #[test]
    fn test_input_errors_have_no_wire_code() {
        assert_eq!(PlanError::InvalidInput("x".into()).code(), None);
        assert_eq!(PlanError::Solver(SolverError::EmptyLegSet).code(), None);
        assert_eq!(PlanError::Internal("x".into()).code(), None);
    }

    #[test]
    fn test_error_code_wire_names() {
        let json = serde_json::to_string(&ErrorCode::NeedMoreDays).unwrap();
        assert_eq!(json, "\"needMoreDays\"");
        let json = serde_json::to_string(&ErrorCode::ExternalApi).unwrap();
        assert_eq!(json, "\"externalApi\"");
    }
}
