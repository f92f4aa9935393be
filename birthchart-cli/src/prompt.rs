//! Interactive prompts that stand in for the birth data form.

use anyhow::Result;
use birthchart_core::{ChartContract, PlaceSelection, ProviderId, TimezoneOffset};
use chrono::{Local, NaiveDate, NaiveTime};
use inquire::{DateSelect, Password, PasswordDisplayMode, Select, Text};

use crate::cli::parse_time;

pub fn date() -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    let date = DateSelect::new("Select date of birth:")
        .with_default(today)
        .with_max_date(today)
        .prompt()?;
    Ok(date)
}

pub fn time() -> Result<NaiveTime> {
    let text = Text::new("Time of birth (HH:MM, 24h):")
        .with_default("12:00")
        .with_validator(|input: &str| {
            Ok(match parse_time(input) {
                Ok(_) => inquire::validator::Validation::Valid,
                Err(e) => inquire::validator::Validation::Invalid(e.into()),
            })
        })
        .prompt()?;

    parse_time(&text).map_err(anyhow::Error::msg)
}

pub fn city() -> Result<String> {
    Ok(Text::new("Birth city:").with_placeholder("Enter your birth city").prompt()?)
}

/// Pick one candidate, or keep the typed text when nothing fits.
pub fn place(typed: &str, candidates: Vec<PlaceSelection>) -> Result<PlaceSelection> {
    let mut options = candidates;
    options.push(PlaceSelection::unresolved(typed));

    let chosen = Select::new("Select your birth city:", options)
        .with_help_message("the last entry keeps your text without a location")
        .prompt()?;
    Ok(chosen)
}

pub fn timezone_offset() -> Result<TimezoneOffset> {
    let choices = TimezoneOffset::whole_hour_choices();
    let utc = choices.iter().position(|o| o.hours() == 0.0).unwrap_or(0);

    let offset = Select::new("Time zone offset (hours from UTC):", choices)
        .with_starting_cursor(utc)
        .prompt()?;
    Ok(offset)
}

pub fn service_url(current: &str) -> Result<String> {
    let url = Text::new("Birth chart service URL:").with_default(current).prompt()?;
    Ok(url.trim().to_string())
}

pub fn contract(current: ChartContract) -> Result<ChartContract> {
    let options = ChartContract::all().to_vec();
    let cursor = options.iter().position(|c| *c == current).unwrap_or(0);

    let contract = Select::new("Request contract of the service:", options)
        .with_starting_cursor(cursor)
        .with_help_message("explicit-offset sends tz_offset; city-only lets the server infer it")
        .prompt()?;
    Ok(contract)
}

pub fn place_provider() -> Result<ProviderId> {
    let provider =
        Select::new("Place search provider:", ProviderId::all().to_vec()).prompt()?;
    Ok(provider)
}

/// Ask for the Google Maps key. When not `required`, an empty answer skips it.
pub fn google_api_key(required: bool) -> Result<Option<String>> {
    let message = if required {
        "Google Maps API key:"
    } else {
        "Google Maps API key for timezone detection (empty to skip):"
    };

    loop {
        let key = Password::new(message)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?;
        let key = key.trim().to_string();

        if !key.is_empty() {
            return Ok(Some(key));
        }
        if !required {
            return Ok(None);
        }
        eprintln!("A key is required for the google provider.");
    }
}
