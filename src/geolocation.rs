use crate::Coordinate;
use reqwest::Url;
use serde::Deserialize;
use std::error::Error;
use thiserror::Error;

pub static IP_API_BASE_URL: &str = "http://ip-api.com";

/// Everything that is not capability absence collapses into PermissionDenied,
/// position lookups share a single failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("geolocation capability is not available")]
    Unsupported,
    #[error("permission denied")]
    PermissionDenied,
}

pub trait LocationProvider {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

/// Position handed in directly, e.g. from CLI flags.
pub struct FixedLocationProvider {
    pub position: Coordinate,
}

impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Ok(self.position)
    }
}

/// Stands in for a platform with no position source at all.
pub struct UnsupportedLocationProvider;

impl LocationProvider for UnsupportedLocationProvider {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Coarse position from the machine's public IP address.
pub struct IpLocationProvider {
    http: reqwest::Client,
    base: Url,
}

impl IpLocationProvider {
    pub fn new(
        http: reqwest::Client,
        base: &str,
    ) -> Result<IpLocationProvider, Box<dyn Error + Send + Sync>> {
        let base = base.parse::<Url>()?;

        Ok(IpLocationProvider { http, base })
    }
}

impl LocationProvider for IpLocationProvider {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        let url = self
            .base
            .join("/json")
            .map_err(|_| GeolocationError::PermissionDenied)?;

        let response = self.http.get(url).send().await.map_err(|fetch_err| {
            tracing::error!("ip geolocation unreachable: {}", fetch_err);
            GeolocationError::PermissionDenied
        })?;

        let body = response.json::<IpApiResponse>().await.map_err(|parse_err| {
            tracing::error!("ip geolocation returned garbage: {}", parse_err);
            GeolocationError::PermissionDenied
        })?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(GeolocationError::PermissionDenied),
        }
    }
}
