// Geocoder adapter: free-text location -> coordinates, best effort

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Geocoder returned status {0}")]
    Status(u16),

    #[error("Malformed geocoder response: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub display_address: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    /// `None` means "no geo filter available", never an error.
    async fn geocode(&self, text: &str) -> Option<GeoPoint>;
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.geocoder_url.clone(),
            config.geocoder_user_agent.clone(),
            config.geocoder_timeout,
        )
    }

    /// Explicit-error variant of [`Geocoder::geocode`]. `Ok(None)` when the
    /// lookup succeeded but found nothing.
    pub async fn lookup(&self, text: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("q", text),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| GeocodeError::MalformedBody(e.to_string()))?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        let lat = place.lat.trim().parse::<f64>();
        let lng = place.lon.trim().parse::<f64>();
        match (lat, lng) {
            (Ok(lat), Ok(lng)) => Ok(Some(GeoPoint {
                lat,
                lng,
                display_address: place.display_name,
            })),
            _ => Err(GeocodeError::MalformedBody(format!(
                "unparseable coordinates {:?},{:?}",
                place.lat, place.lon
            ))),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, text: &str) -> Option<GeoPoint> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match self.lookup(text).await {
            Ok(Some(point)) => Some(point),
            Ok(None) => {
                debug!(location = text, "Geocoder found no match");
                None
            }
            Err(e) => {
                warn!(location = text, error = %e, "Geocoding failed");
                None
            }
        }
    }
}
