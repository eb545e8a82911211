//! Polyline representation for route geometries.
//!
//! Routed transfers arrive as encoded polylines (Google algorithm). They
//! are decoded once at the boundary and handled as coordinate sequences
//! everywhere else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Coordinate;

/// Precision used by OSRM's `geometries=polyline`.
pub const OSRM_PRECISION: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolylineError {
    #[error("encoded polyline ended inside a value at byte {0}")]
    Truncated(usize),
    #[error("invalid polyline character {0:?} at byte {1}")]
    InvalidCharacter(char, usize),
}

/// A polyline as decoded coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    /// Decodes an encoded polyline. Values are latitude/longitude pairs
    /// scaled by `10^precision`.
    pub fn decode(encoded: &str, precision: u32) -> Result<Self, PolylineError> {
        let factor = 10f64.powi(precision as i32);
        let bytes = encoded.as_bytes();
        let mut points = Vec::new();
        let mut position = 0;
        let mut lat: i64 = 0;
        let mut lon: i64 = 0;

        while position < bytes.len() {
            lat += next_value(bytes, &mut position)?;
            lon += next_value(bytes, &mut position)?;
            points.push(Coordinate::new(lon as f64 / factor, lat as f64 / factor));
        }

        Ok(Self { points })
    }

    pub fn encode(&self, precision: u32) -> String {
        let factor = 10f64.powi(precision as i32);
        let mut output = String::new();
        let mut previous_lat: i64 = 0;
        let mut previous_lon: i64 = 0;

        for point in &self.points {
            let lat = (point.lat * factor).round() as i64;
            let lon = (point.lon * factor).round() as i64;
            push_value(&mut output, lat - previous_lat);
            push_value(&mut output, lon - previous_lon);
            previous_lat = lat;
            previous_lon = lon;
        }

        output
    }
}

fn next_value(bytes: &[u8], position: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*position) else {
            return Err(PolylineError::Truncated(*position));
        };
        if !(63..127).contains(&byte) || shift > 60 {
            return Err(PolylineError::InvalidCharacter(byte as char, *position));
        }
        *position += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}

fn push_value(output: &mut String, value: i64) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        output.push(char::from((((value & 0x1f) | 0x20) + 63) as u8));
        value >>= 5;
    }
    output.push(char::from((value + 63) as u8));
}
