//! trip-planner core
//!
//! Orders a set of directed cycling segments, splits them into day routes
//! under distance and elevation caps, and stitches transfer geometry
//! between them. Network collaborators sit behind the traits in
//! [`traits`]; OSRM and offline implementations are provided.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod deadline;
pub mod elevation;
pub mod error;
pub mod events;
pub mod haversine;
pub mod model;
pub mod osrm;
pub mod osrm_data;
pub mod partition;
pub mod planner;
pub mod polyline;
pub mod solver;
pub mod stitch;
pub mod traits;

pub use api::{PlanInput, PlanResponse, SegmentRequest};
pub use error::{ErrorCode, PlanError};
pub use planner::TripPlanner;
