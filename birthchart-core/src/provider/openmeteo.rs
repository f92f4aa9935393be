use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    model::{Coordinates, PlaceSelection},
    provider::truncate_body,
};

use super::PlaceSearch;

const SEARCH_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Keyless city search backed by the Open-Meteo geocoding API.
#[derive(Debug, Clone, Default)]
pub struct OpenMeteoProvider {
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct OmResult {
    name: String,
    latitude: f64,
    longitude: f64,
    admin1: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    results: Option<Vec<OmResult>>,
}

fn selection_from_result(result: OmResult) -> PlaceSelection {
    let display_name = [Some(result.name), result.admin1, result.country]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    PlaceSelection::resolved(display_name, Coordinates::new(result.latitude, result.longitude))
}

#[async_trait]
impl PlaceSearch for OpenMeteoProvider {
    async fn suggest(&self, text: &str) -> Result<Vec<PlaceSelection>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let res = self
            .http
            .get(SEARCH_URL)
            .query(&[("name", text), ("count", "10"), ("language", "en")])
            .send()
            .await
            .context("Failed to send request to Open-Meteo geocoding")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Open-Meteo response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OmResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo geocoding JSON")?;

        Ok(parsed.results.unwrap_or_default().into_iter().map(selection_from_result).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_available_parts() {
        let body = r#"{"results":[
            {"name":"Springfield","latitude":39.8,"longitude":-89.64,"admin1":"Illinois","country":"United States"},
            {"name":"Monaco","latitude":43.73,"longitude":7.42}
        ]}"#;
        let parsed: OmResponse = serde_json::from_str(body).unwrap();
        let names: Vec<String> = parsed
            .results
            .unwrap()
            .into_iter()
            .map(selection_from_result)
            .map(|s| s.display_name)
            .collect();

        assert_eq!(names, ["Springfield, Illinois, United States", "Monaco"]);
    }

    #[test]
    fn missing_results_field_means_no_match() {
        let parsed: OmResponse = serde_json::from_str(r#"{"generationtime_ms":0.4}"#).unwrap();
        assert!(parsed.results.is_none());
    }
}
