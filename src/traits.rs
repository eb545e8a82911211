//! Collaborator interfaces consumed by the planning core.
//!
//! Concrete services (OSRM, a segment catalog, an elevation API) implement
//! these; the core never talks to the network directly.

use serde::{Deserialize, Serialize};

use crate::cache::BoundingBox;
use crate::error::ProviderError;
use crate::model::{Coordinate, CostMatrix, SegmentMeta};

/// Per-segment metadata lookup.
pub trait SegmentCatalog {
    fn segment_meta(&self, segment_id: &str) -> Result<SegmentMeta, ProviderError>;
}

/// Provides a distance/duration matrix for a set of waypoints.
///
/// The matrix is indexed by the provided waypoint order.
pub trait CostMatrixProvider {
    fn matrix_for(&self, waypoints: &[Coordinate]) -> Result<CostMatrix, ProviderError>;
}

/// A routed point-to-point path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRoute {
    /// Encoded polyline, precision 5.
    pub encoded_geometry: String,
    pub length_meters: f64,
}

/// Routes the connection between one leg's exit and the next leg's entry.
pub trait TransferRouter {
    fn route_between(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<TransferRoute, ProviderError>;
}

/// Elevation gain along an encoded routed path.
pub trait ElevationService {
    fn elevation_gain(&self, encoded_geometry: &str) -> Result<f64, ProviderError>;
}

/// A segment found in a map viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub id: String,
    pub name: String,
    pub length_meters: f64,
    pub elevation_gain_meters: f64,
    pub entry_coordinate: Coordinate,
    pub exit_coordinate: Coordinate,
}

/// Rate-limited upstream segment discovery for a map viewport.
pub trait SegmentExplorer {
    fn explore(&self, bounds: &BoundingBox) -> Result<Vec<SegmentSummary>, ProviderError>;
}
