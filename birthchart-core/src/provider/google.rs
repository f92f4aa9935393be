use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

use crate::{
    error::ResolutionError,
    model::{Coordinates, PlaceSelection, TimezoneOffset},
    provider::truncate_body,
};

use super::{PlaceSearch, TimezoneLookup};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const TIMEZONE_URL: &str = "https://maps.googleapis.com/maps/api/timezone/json";

/// Google Maps Platform: geocoding for place suggestions and the Time Zone
/// API for offsets.
#[derive(Clone)]
pub struct GoogleMapsProvider {
    api_key: String,
    http: Client,
}

impl GoogleMapsProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, http: Client::new() }
    }
}

impl fmt::Debug for GoogleMapsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleMapsProvider").field("api_key", &"<redacted>").finish()
    }
}

#[derive(Debug, Deserialize)]
struct GcLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GcGeometry {
    location: GcLocation,
}

#[derive(Debug, Deserialize)]
struct GcResult {
    formatted_address: String,
    geometry: Option<GcGeometry>,
}

#[derive(Debug, Deserialize)]
struct GcResponse {
    status: String,
    #[serde(default)]
    results: Vec<GcResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TzResponse {
    status: String,
    raw_offset: Option<f64>,
    error_message: Option<String>,
}

fn selections_from_geocode(response: GcResponse) -> Result<Vec<PlaceSelection>> {
    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .into_iter()
            .map(|r| PlaceSelection {
                display_name: r.formatted_address,
                coordinates: r.geometry.map(|g| Coordinates::new(g.location.lat, g.location.lng)),
            })
            .collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        status => Err(anyhow!(
            "Google geocoding returned {}: {}",
            status,
            response.error_message.unwrap_or_else(|| "no message".to_string())
        )),
    }
}

fn offset_from_response(response: TzResponse) -> Result<TimezoneOffset, ResolutionError> {
    if response.status != "OK" {
        return Err(ResolutionError::Status {
            message: response.error_message.unwrap_or_else(|| "no message".to_string()),
            status: response.status,
        });
    }

    response.raw_offset.map(TimezoneOffset::from_seconds).ok_or_else(|| ResolutionError::Status {
        status: response.status,
        message: "response carried no rawOffset".to_string(),
    })
}

#[async_trait]
impl PlaceSearch for GoogleMapsProvider {
    async fn suggest(&self, text: &str) -> Result<Vec<PlaceSelection>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let res = self
            .http
            .get(GEOCODE_URL)
            .query(&[("address", text), ("key", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to send request to Google geocoding")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Google geocoding response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Google geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: GcResponse =
            serde_json::from_str(&body).context("Failed to parse Google geocoding JSON")?;

        selections_from_geocode(parsed)
    }
}

#[async_trait]
impl TimezoneLookup for GoogleMapsProvider {
    async fn lookup(
        &self,
        coordinates: Coordinates,
        timestamp: i64,
    ) -> Result<TimezoneOffset, ResolutionError> {
        info!("looking up timezone at {},{} for {}", coordinates.lat, coordinates.lng, timestamp);

        let location = format!("{},{}", coordinates.lat, coordinates.lng);
        let timestamp = timestamp.to_string();

        let res = self
            .http
            .get(TIMEZONE_URL)
            .query(&[
                ("location", location.as_str()),
                ("timestamp", timestamp.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| ResolutionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ResolutionError::Transport(format!(
                "status {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let parsed: TzResponse = serde_json::from_str(&body)
            .map_err(|e| ResolutionError::Transport(format!("unreadable response: {e}")))?;

        offset_from_response(parsed)
    }
}
