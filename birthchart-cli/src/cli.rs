use anyhow::Context;
use birthchart_core::{ChartContract, Config, ProviderId};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};

use crate::{prompt, render::OutputFormat, workflow};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "birthchart", version, about = "Birth chart CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the chart service, place search provider and API keys.
    Configure,

    /// Request a birth chart. Missing values are asked for interactively.
    Chart(ChartArgs),
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Date of birth, YYYY-MM-DD.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Local time of birth, HH:MM (24h).
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    /// Birth city, free text; matched against the place search provider.
    #[arg(long)]
    pub city: Option<String>,

    /// UTC offset in hours; skips automatic timezone detection.
    #[arg(long, allow_negative_numbers = true)]
    pub tz_offset: Option<f64>,

    /// Take the first matching place instead of asking.
    #[arg(long)]
    pub first_match: bool,

    /// Override the configured chart service base URL.
    #[arg(long)]
    pub service_url: Option<String>,

    /// Override the configured request contract: explicit-offset or city-only.
    #[arg(long, value_parser = parse_contract)]
    pub contract: Option<ChartContract>,

    /// Output format for a successful chart.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Chart(args) => workflow::run_chart(args).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.service_url = Some(prompt::service_url(config.service_url())?);
    config.contract = prompt::contract(config.contract)?;

    let provider = prompt::place_provider()?;
    let key_required = provider.requires_api_key();
    if let Some(key) = prompt::google_api_key(key_required)? {
        config.upsert_provider_api_key(ProviderId::Google, key);
    }
    config.set_default_provider(provider);

    let path = config.save().context("Failed to save configuration")?;
    println!("Saved configuration to {}", path.display());
    if !config.is_provider_configured(ProviderId::Google) {
        println!("No Google key stored: timezone offsets will have to be entered by hand.");
    }

    Ok(())
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))?;

    if date > Local::now().date_naive() {
        return Err("birth date cannot be in the future".to_string());
    }
    Ok(date)
}

pub fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

fn parse_contract(value: &str) -> Result<ChartContract, String> {
    ChartContract::try_from(value).map_err(|e| e.to_string())
}
