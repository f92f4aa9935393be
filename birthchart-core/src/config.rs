use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::{model::ChartContract, provider::ProviderId};

pub const DEFAULT_SERVICE_URL: &str = "https://astrology-api-au16.onrender.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Base URL of the birth chart service; `/birth_chart` is appended.
    pub service_url: Option<String>,

    /// Query shape the service expects.
    pub contract: ChartContract,

    /// Place search provider id, e.g. "google" or "open-meteo".
    pub default_provider: Option<String>,

    /// Applies to each timezone lookup and chart request.
    pub request_timeout_secs: Option<u64>,

    /// Example TOML:
    /// [providers.google]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// The configured default provider, if any, as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<Option<ProviderId>> {
        self.default_provider.as_deref().map(ProviderId::try_from).transpose()
    }

    pub fn service_url(&self) -> &str {
        self.service_url.as_deref().unwrap_or(DEFAULT_SERVICE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.default_provider_id()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "birth-chart", "birthchart-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key; the provider becomes the default if none is set.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present and non-blank.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_service() {
        let cfg = Config::default();

        assert_eq!(cfg.service_url(), DEFAULT_SERVICE_URL);
        assert_eq!(cfg.contract, ChartContract::ExplicitOffset);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cfg.default_provider_id().unwrap(), None);
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::Google, "MAPS_KEY".into());

        let default = cfg.default_provider_id().unwrap();
        assert_eq!(default, Some(ProviderId::Google));

        assert_eq!(cfg.provider_api_key(ProviderId::Google), Some("MAPS_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::Google));
    }

    #[test]
    fn upsert_does_not_override_existing_default() {
        let mut cfg = Config::default();

        cfg.set_default_provider(ProviderId::OpenMeteo);
        cfg.upsert_provider_api_key(ProviderId::Google, "MAPS_KEY".into());

        assert_eq!(cfg.default_provider_id().unwrap(), Some(ProviderId::OpenMeteo));
        assert!(cfg.is_provider_configured(ProviderId::OpenMeteo));
        assert!(cfg.is_provider_configured(ProviderId::Google));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Google, "  ".into());

        assert_eq!(cfg.provider_api_key(ProviderId::Google), None);
        assert!(!cfg.is_provider_configured(ProviderId::Google));
    }

    #[test]
    fn parses_full_file() {
        let cfg = Config::from_toml(
            r#"
            service_url = "http://localhost:10000"
            contract = "city-only"
            default_provider = "google"
            request_timeout_secs = 5

            [providers.google]
            api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.service_url(), "http://localhost:10000");
        assert_eq!(cfg.contract, ChartContract::CityOnly);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.provider_api_key(ProviderId::Google), Some("abc"));
    }

    #[test]
    fn rejects_unknown_default_provider() {
        let err = Config::from_toml(r#"default_provider = "bing""#).unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn roundtrips_through_toml() {
        let mut cfg = Config { contract: ChartContract::CityOnly, ..Default::default() };
        cfg.upsert_provider_api_key(ProviderId::Google, "KEY".into());

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();

        assert_eq!(back.contract, ChartContract::CityOnly);
        assert_eq!(back.provider_api_key(ProviderId::Google), Some("KEY"));
    }
}
