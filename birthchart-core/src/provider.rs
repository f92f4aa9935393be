use crate::{
    Config,
    error::ResolutionError,
    model::{Coordinates, PlaceSelection, TimezoneOffset},
    provider::{google::GoogleMapsProvider, openmeteo::OpenMeteoProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod google;
pub mod openmeteo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Google,
    OpenMeteo,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Google => "google",
            ProviderId::OpenMeteo => "open-meteo",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Google, ProviderId::OpenMeteo]
    }

    /// Whether the provider refuses requests without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::Google)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "google" => Ok(ProviderId::Google),
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: google, open-meteo."
            )),
        }
    }
}

/// Suggests places for the text typed into the city input.
#[async_trait]
pub trait PlaceSearch: Send + Sync + Debug {
    async fn suggest(&self, text: &str) -> anyhow::Result<Vec<PlaceSelection>>;
}

/// Geocode-to-timezone capability.
#[async_trait]
pub trait TimezoneLookup: Send + Sync + Debug {
    /// UTC offset at `coordinates` as of the unix `timestamp`.
    async fn lookup(
        &self,
        coordinates: Coordinates,
        timestamp: i64,
    ) -> Result<TimezoneOffset, ResolutionError>;
}

/// Construct a place search provider from config and explicit ProviderId.
pub fn place_search_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn PlaceSearch>> {
    let boxed: Box<dyn PlaceSearch> = match id {
        ProviderId::Google => Box::new(GoogleMapsProvider::new(google_api_key(config)?.to_owned())),
        ProviderId::OpenMeteo => Box::new(OpenMeteoProvider::new()),
    };

    Ok(boxed)
}

/// Construct the place search provider named by `default_provider`,
/// falling back to the keyless Open-Meteo search when none is set.
pub fn default_place_search_from_config(config: &Config) -> anyhow::Result<Box<dyn PlaceSearch>> {
    let id = config.default_provider_id()?.unwrap_or(ProviderId::OpenMeteo);
    place_search_from_config(id, config)
}

/// Timezone lookup needs a Google key; without one, offsets must be
/// entered by hand.
pub fn timezone_lookup_from_config(config: &Config) -> Option<Arc<dyn TimezoneLookup>> {
    config
        .provider_api_key(ProviderId::Google)
        .map(|key| Arc::new(GoogleMapsProvider::new(key.to_owned())) as Arc<dyn TimezoneLookup>)
}

fn google_api_key(config: &Config) -> anyhow::Result<&str> {
    config.provider_api_key(ProviderId::Google).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider 'google'.\n\
                 Hint: run `birthchart configure` and enter your Google Maps API key."
        )
    })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
