//! OSRM HTTP adapter: cost matrices via `/table`, transfers via `/route`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::model::{Coordinate, CostMatrix};
use crate::traits::{CostMatrixProvider, TransferRoute, TransferRouter};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "bike".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn table_url(&self, waypoints: &[Coordinate]) -> String {
        format!(
            "{}/table/v1/{}/{}?annotations=distance,duration",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coordinate_path(waypoints)
        )
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=polyline",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coordinate_path(&[origin, destination])
        )
    }

    fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        tracing::debug!(url, "osrm request");
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            // OSRM reports errors as JSON with a `code`; surface it when present.
            let message = serde_json::from_str::<OsrmStatus>(&body)
                .map(|status| status.describe())
                .unwrap_or(body);
            return Err(ProviderError::Upstream {
                status: status.to_string(),
                message,
            });
        }
        serde_json::from_str(&body)
            .map_err(|err| ProviderError::InvalidResponse(format!("osrm body: {err}")))
    }
}

/// `lon,lat;lon,lat;...`
fn coordinate_path(points: &[Coordinate]) -> String {
    points
        .iter()
        .map(|point| format!("{:.6},{:.6}", point.lon, point.lat))
        .collect::<Vec<_>>()
        .join(";")
}

impl CostMatrixProvider for OsrmClient {
    fn matrix_for(&self, waypoints: &[Coordinate]) -> Result<CostMatrix, ProviderError> {
        if waypoints.is_empty() {
            return Ok(CostMatrix::new(Vec::new(), Vec::new()));
        }
        let body: OsrmTableResponse = self.get(&self.table_url(waypoints))?;
        body.into_matrix(waypoints.len())
    }
}

impl TransferRouter for OsrmClient {
    fn route_between(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<TransferRoute, ProviderError> {
        let body: OsrmRouteResponse = self.get(&self.route_url(origin, destination))?;
        body.into_route()
    }
}

#[derive(Debug, Deserialize)]
struct OsrmStatus {
    code: String,
    message: Option<String>,
}

impl OsrmStatus {
    fn describe(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.code, message),
            None => self.code.clone(),
        }
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.code == "Ok" {
            Ok(())
        } else {
            Err(ProviderError::Upstream {
                status: self.code.clone(),
                message: self.message.clone().unwrap_or_default(),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    #[serde(flatten)]
    status: OsrmStatus,
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    /// Unreachable pairs come back as `null` and map to NaN, which the
    /// solver rejects as an invalid cell.
    fn into_matrix(self, expected: usize) -> Result<CostMatrix, ProviderError> {
        self.status.check()?;
        let distances = self
            .distances
            .ok_or_else(|| ProviderError::InvalidResponse("table without distances".into()))?;
        let durations = self
            .durations
            .ok_or_else(|| ProviderError::InvalidResponse("table without durations".into()))?;

        let to_cells = |rows: Vec<Vec<Option<f64>>>| -> Vec<Vec<f64>> {
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| cell.unwrap_or(f64::NAN)).collect())
                .collect()
        };
        let matrix = CostMatrix::new(to_cells(distances), to_cells(durations));
        if matrix.size() != expected {
            return Err(ProviderError::InvalidResponse(format!(
                "table has {} rows for {expected} waypoints",
                matrix.size()
            )));
        }
        Ok(matrix)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    #[serde(flatten)]
    status: OsrmStatus,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
    distance: f64,
}

impl OsrmRouteResponse {
    fn into_route(self) -> Result<TransferRoute, ProviderError> {
        self.status.check()?;
        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound("no route between waypoints".into()))?;
        Ok(TransferRoute {
            encoded_geometry: route.geometry,
            length_meters: route.distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OsrmClient {
        OsrmClient::new(OsrmConfig {
            base_url: "http://osrm.local/".to_string(),
            ..OsrmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_urls_use_lon_lat_order() {
        let client = client();
        let points = [Coordinate::new(6.0336, 45.0542), Coordinate::new(6.0706, 45.0916)];
        assert_eq!(
            client.table_url(&points),
            "http://osrm.local/table/v1/bike/6.033600,45.054200;6.070600,45.091600\
             ?annotations=distance,duration"
        );
        assert_eq!(
            client.route_url(points[0], points[1]),
            "http://osrm.local/route/v1/bike/6.033600,45.054200;6.070600,45.091600\
             ?overview=full&geometries=polyline"
        );
    }

    #[test]
    fn test_table_nulls_become_nan() {
        let body = r#"{
            "code": "Ok",
            "distances": [[0, 1200.5], [null, 0]],
            "durations": [[0, 240], [250, 0]]
        }"#;
        let parsed: OsrmTableResponse = serde_json::from_str(body).unwrap();
        let matrix = parsed.into_matrix(2).unwrap();
        assert_eq!(matrix.distances[0][1], 1200.5);
        assert!(matrix.distances[1][0].is_nan());
        assert_eq!(matrix.durations[1][0], 250.0);
    }

    #[test]
    fn test_table_size_mismatch_is_invalid() {
        let body = r#"{"code": "Ok", "distances": [[0]], "durations": [[0]]}"#;
        let parsed: OsrmTableResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parsed.into_matrix(2), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_route_parsing() {
        let body = r#"{
            "code": "Ok",
            "routes": [{"geometry": "_p~iF~ps|U_ulLnnqC", "distance": 4321.0, "duration": 900}]
        }"#;
        let parsed: OsrmRouteResponse = serde_json::from_str(body).unwrap();
        let route = parsed.into_route().unwrap();
        assert_eq!(route.length_meters, 4321.0);
        assert_eq!(route.encoded_geometry, "_p~iF~ps|U_ulLnnqC");
    }

    #[test]
    fn test_route_error_code() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        let parsed: OsrmRouteResponse = serde_json::from_str(body).unwrap();
        match parsed.into_route() {
            Err(ProviderError::Upstream { status, message }) => {
                assert_eq!(status, "NoRoute");
                assert!(message.contains("Impossible"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
