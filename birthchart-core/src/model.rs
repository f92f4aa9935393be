use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WorkflowError;

/// Lowest and highest offsets a user may enter by hand, in hours.
pub const MANUAL_OFFSET_RANGE: (f64, f64) = (-12.0, 14.0);

/// Calendar date and local clock time of a birth, exactly as entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthMoment {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl BirthMoment {
    /// Build from raw numbers, rejecting dates like February 30th.
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Result<Self, WorkflowError> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            WorkflowError::Validation(format!("{year:04}-{month:02}-{day:02} is not a valid date"))
        })?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            WorkflowError::Validation(format!("{hour:02}:{minute:02} is not a valid time of day"))
        })?;

        Self::from_parts(date, time)
    }

    /// Combine the separately picked date and time of day.
    pub fn from_parts(date: NaiveDate, time: NaiveTime) -> Result<Self, WorkflowError> {
        if !(1..=9999).contains(&date.year()) {
            return Err(WorkflowError::Validation(format!(
                "year {} is outside the supported range 1..=9999",
                date.year()
            )));
        }

        Ok(Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour: time.hour(),
            minute: time.minute(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A place as the user picked it. `coordinates` stays `None` when the
/// provider could not resolve the text to a geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceSelection {
    pub display_name: String,
    pub coordinates: Option<Coordinates>,
}

impl PlaceSelection {
    pub fn resolved(display_name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self { display_name: display_name.into(), coordinates: Some(coordinates) }
    }

    pub fn unresolved(display_name: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), coordinates: None }
    }

    pub fn has_name(&self) -> bool {
        !self.display_name.trim().is_empty()
    }
}

impl fmt::Display for PlaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Signed displacement from UTC in hours (possibly fractional).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimezoneOffset(f64);

impl TimezoneOffset {
    /// Offset typed or picked by the user.
    pub fn from_hours(hours: f64) -> Result<Self, WorkflowError> {
        let (min, max) = MANUAL_OFFSET_RANGE;
        if !hours.is_finite() || hours < min || hours > max {
            return Err(WorkflowError::Validation(format!(
                "timezone offset {hours} is outside {min}..={max} hours"
            )));
        }
        Ok(Self(hours))
    }

    /// Offset reported by a timezone provider in seconds.
    pub fn from_seconds(seconds: f64) -> Self {
        Self(seconds / 3600.0)
    }

    pub fn hours(&self) -> f64 {
        self.0
    }

    /// Every whole-hour offset a user can pick from, west to east.
    pub fn whole_hour_choices() -> Vec<TimezoneOffset> {
        let (min, max) = MANUAL_OFFSET_RANGE;
        (min as i32..=max as i32).map(|h| Self(f64::from(h))).collect()
    }

    /// Plain decimal form used on the wire: `1`, `-5`, `5.5`.
    pub fn to_query_value(&self) -> String {
        format!("{}", self.0)
    }
}

impl fmt::Display for TimezoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 0.0 { write!(f, "+{}", self.0) } else { write!(f, "{}", self.0) }
    }
}

/// Which query shape the remote birth chart service expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartContract {
    /// `tz_offset` is passed explicitly.
    #[default]
    ExplicitOffset,
    /// Only the city is sent; the server infers the offset.
    CityOnly,
}

impl ChartContract {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartContract::ExplicitOffset => "explicit-offset",
            ChartContract::CityOnly => "city-only",
        }
    }

    pub const fn all() -> &'static [ChartContract] {
        &[ChartContract::ExplicitOffset, ChartContract::CityOnly]
    }
}

impl fmt::Display for ChartContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ChartContract {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "explicit-offset" => Ok(ChartContract::ExplicitOffset),
            "city-only" => Ok(ChartContract::CityOnly),
            _ => Err(anyhow::anyhow!(
                "Unknown contract '{value}'. Supported contracts: explicit-offset, city-only."
            )),
        }
    }
}

/// Serialized birth chart request. The moment is sent as literal local
/// clock values; no timezone conversion is applied to these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartQuery {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub city: String,
    pub tz_offset: Option<String>,
}

impl ChartQuery {
    pub fn new(moment: &BirthMoment, city: &str, offset: Option<TimezoneOffset>) -> Self {
        Self {
            year: format!("{:04}", moment.year),
            month: format!("{:02}", moment.month),
            day: format!("{:02}", moment.day),
            hour: format!("{:02}", moment.hour),
            minute: format!("{:02}", moment.minute),
            city: city.to_string(),
            tz_offset: offset.map(|o| o.to_query_value()),
        }
    }

    /// The moment fields in wire order: year, month, day, hour, minute.
    pub fn moment_fields(&self) -> [&str; 5] {
        [&self.year, &self.month, &self.day, &self.hour, &self.minute]
    }

    /// Query parameters for the given contract.
    pub fn pairs(&self, contract: ChartContract) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("year", self.year.as_str()),
            ("month", self.month.as_str()),
            ("day", self.day.as_str()),
            ("hour", self.hour.as_str()),
            ("minute", self.minute.as_str()),
            ("city", self.city.as_str()),
        ];

        if contract == ChartContract::ExplicitOffset {
            if let Some(offset) = &self.tz_offset {
                pairs.push(("tz_offset", offset.as_str()));
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_fields_are_zero_padded() {
        let moment = BirthMoment::new(1990, 3, 15, 12, 0).unwrap();
        let query = ChartQuery::new(&moment, "Berlin, Germany", TimezoneOffset::from_hours(1.0).ok());

        assert_eq!(query.moment_fields(), ["1990", "03", "15", "12", "00"]);
        assert_eq!(query.tz_offset.as_deref(), Some("1"));
    }

    #[test]
    fn rejects_day_invalid_for_month() {
        let err = BirthMoment::new(2023, 2, 29, 8, 30).unwrap_err();
        assert!(err.to_string().contains("not a valid date"));

        assert!(BirthMoment::new(2024, 2, 29, 8, 30).is_ok());
    }

    #[test]
    fn rejects_out_of_range_time() {
        assert!(BirthMoment::new(1990, 3, 15, 24, 0).is_err());
        assert!(BirthMoment::new(1990, 3, 15, 23, 60).is_err());
    }

    #[test]
    fn manual_offset_is_range_checked() {
        assert!(TimezoneOffset::from_hours(-12.0).is_ok());
        assert!(TimezoneOffset::from_hours(14.0).is_ok());
        assert!(TimezoneOffset::from_hours(5.5).is_ok());
        assert!(TimezoneOffset::from_hours(14.5).is_err());
        assert!(TimezoneOffset::from_hours(f64::NAN).is_err());
    }

    #[test]
    fn provider_seconds_convert_to_hours() {
        assert_eq!(TimezoneOffset::from_seconds(19800.0).hours(), 5.5);
        assert_eq!(TimezoneOffset::from_seconds(-18000.0).to_query_value(), "-5");
    }

    #[test]
    fn offset_display_matches_picker_labels() {
        let labels: Vec<String> =
            TimezoneOffset::whole_hour_choices().iter().map(|o| o.to_string()).collect();

        assert_eq!(labels.len(), 27);
        assert_eq!(labels.first().map(String::as_str), Some("-12"));
        assert_eq!(labels[12], "+0");
        assert_eq!(labels.last().map(String::as_str), Some("+14"));
    }

    #[test]
    fn city_only_contract_omits_offset() {
        let moment = BirthMoment::new(1985, 11, 2, 6, 5).unwrap();
        let query = ChartQuery::new(&moment, "Lima, Peru", TimezoneOffset::from_hours(-5.0).ok());

        let explicit = query.pairs(ChartContract::ExplicitOffset);
        assert!(explicit.contains(&("tz_offset", "-5")));
        assert!(explicit.contains(&("minute", "05")));

        let city_only = query.pairs(ChartContract::CityOnly);
        assert!(city_only.iter().all(|(k, _)| *k != "tz_offset"));
        assert!(city_only.contains(&("city", "Lima, Peru")));
    }

    #[test]
    fn contract_parses_case_insensitively() {
        assert_eq!(ChartContract::try_from("City-Only").unwrap(), ChartContract::CityOnly);
        let err = ChartContract::try_from("both").unwrap_err();
        assert!(err.to_string().contains("Unknown contract"));
    }
}
