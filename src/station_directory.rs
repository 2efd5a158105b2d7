use crate::Coordinate;
use reqwest::StatusCode;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::error::Error;

pub static OCM_BASE_URL: &str = "https://api.openchargemap.io";
pub static OCM_DEMO_KEY: &str = "OCM-API-TEST";

pub const SEARCH_RADIUS_KM: u32 = 25;
pub const MAX_RESULTS: u32 = 20;

/// One charging point entry from the OpenChargeMap directory. Every field the
/// directory sends is optional in practice, so everything is an Option and
/// rendering falls back instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StationRecord {
    pub address_info: Option<AddressInfo>,
    pub connections: Option<Vec<Connection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AddressInfo {
    pub title: Option<String>,
    #[serde(rename = "AddressLine1")]
    pub address_line1: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    pub connection_type: Option<ConnectionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionType {
    pub title: Option<String>,
}

impl StationRecord {
    pub fn coordinate(&self) -> Option<Coordinate> {
        let info = self.address_info.as_ref()?;
        match (info.latitude, info.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.address_info.as_ref().and_then(|info| info.title.clone())
    }

    pub fn address_line(&self) -> Option<String> {
        self.address_info
            .as_ref()
            .and_then(|info| info.address_line1.clone())
    }

    /// Label of the first connector, "Unknown" when the directory sent none.
    pub fn connector_label(&self) -> String {
        self.connections
            .as_ref()
            .and_then(|connections| connections.first())
            .and_then(|connection| connection.connection_type.as_ref())
            .and_then(|connection_type| connection_type.title.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

pub trait StationDirectory {
    async fn stations_near(
        &self,
        center: Coordinate,
    ) -> Result<Vec<StationRecord>, Box<dyn Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct OpenChargeMapClient {
    http: reqwest::Client,
    base: Url,
}

impl OpenChargeMapClient {
    pub fn new(
        http: reqwest::Client,
        base: &str,
    ) -> Result<OpenChargeMapClient, Box<dyn Error + Send + Sync>> {
        let base = base.parse::<Url>()?;

        Ok(OpenChargeMapClient { http, base })
    }
}

impl StationDirectory for OpenChargeMapClient {
    async fn stations_near(
        &self,
        center: Coordinate,
    ) -> Result<Vec<StationRecord>, Box<dyn Error + Send + Sync>> {
        let url = self.base.join("/v3/poi/")?;

        let response = self
            .http
            .get(url)
            .query(&[
                ("output", "json".to_string()),
                ("latitude", center.lat.to_string()),
                ("longitude", center.lon.to_string()),
                ("distance", SEARCH_RADIUS_KM.to_string()),
                ("maxresults", MAX_RESULTS.to_string()),
                ("key", OCM_DEMO_KEY.to_string()),
            ])
            .send()
            .await;

        // an unreachable directory degrades the same way as a failing one
        let response = match response {
            Ok(response) => response,
            Err(fetch_err) => {
                tracing::error!("station directory unreachable: {}", fetch_err);
                return Ok(vec![]);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(read_err) => {
                tracing::error!("station directory response unreadable: {}", read_err);
                return Ok(vec![]);
            }
        };

        parse_directory_response(status, &body)
    }
}

/// Non-success statuses are logged and flattened to an empty result so the
/// caller keeps going with nothing to show. A body that fails to parse is a
/// real error and propagates.
pub fn parse_directory_response(
    status: StatusCode,
    body: &str,
) -> Result<Vec<StationRecord>, Box<dyn Error + Send + Sync>> {
    if !status.is_success() {
        tracing::error!("station directory error: {}", status);
        return Ok(vec![]);
    }

    let stations = serde_json::from_str::<Vec<StationRecord>>(body)?;
    tracing::info!("fetched {} stations", stations.len());

    Ok(stations)
}
