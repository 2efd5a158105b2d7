use crate::Coordinate;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::error::Error;

pub static NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// One match from the geocoding service. Nominatim encodes coordinates as
/// strings, so they stay strings on the wire model and parsing is explicit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodeMatch {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl GeocodeMatch {
    pub fn coordinate(&self) -> Result<Coordinate, Box<dyn Error + Send + Sync>> {
        let lat = self.lat.parse::<f64>()?;
        let lon = self.lon.parse::<f64>()?;

        Ok(Coordinate::new(lat, lon))
    }
}

pub trait Geocoder {
    async fn geocode(
        &self,
        query: &str,
    ) -> Result<Vec<GeocodeMatch>, Box<dyn Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base: Url,
}

impl NominatimClient {
    pub fn new(
        http: reqwest::Client,
        base: &str,
    ) -> Result<NominatimClient, Box<dyn Error + Send + Sync>> {
        let base = base.parse::<Url>()?;

        Ok(NominatimClient { http, base })
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(
        &self,
        query: &str,
    ) -> Result<Vec<GeocodeMatch>, Box<dyn Error + Send + Sync>> {
        let url = self.base.join("/search")?;

        let matches = self
            .http
            .get(url)
            .query(&[("format", "json"), ("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GeocodeMatch>>()
            .await?;

        Ok(matches)
    }
}
