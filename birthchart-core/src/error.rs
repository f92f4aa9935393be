use std::time::Duration;

use thiserror::Error;

/// Shown when the chart service fails without a message of its own.
pub const FALLBACK_MESSAGE: &str = "An error occurred while fetching the birth chart.";

/// Shown when automatic timezone detection did not produce an offset.
pub const TIMEZONE_UNRESOLVED_MESSAGE: &str =
    "Unable to auto-detect timezone; please enter manually";

/// Shown when a selected place carries no coordinates to resolve.
pub const PLACE_UNRESOLVED_MESSAGE: &str =
    "Could not locate this city; please enter the timezone offset manually";

pub const CITY_REQUIRED_MESSAGE: &str = "Please select a valid city.";
pub const MOMENT_REQUIRED_MESSAGE: &str = "Please select a valid birth date and time.";
pub const TIMEZONE_REQUIRED_MESSAGE: &str = "Please select a timezone offset.";

/// Reasons a workflow operation was refused before any I/O happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Local input is missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("timezone still resolving")]
    TimezoneResolving,

    #[error("a birth chart request is already in flight")]
    Busy,
}

/// Failure of the geocode-to-timezone lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Provider answered, but with a non-OK status.
    #[error("timezone provider returned {status}: {message}")]
    Status { status: String, message: String },

    #[error("timezone lookup failed: {0}")]
    Transport(String),

    #[error("timezone lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("no timezone provider is configured")]
    Unavailable,
}

/// Failure of the birth chart request itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request to birth chart service failed: {0}")]
    Network(String),

    /// Non-2xx answer; `message` is the body's `error` field when present.
    #[error("birth chart service responded with status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("birth chart service returned an unreadable body: {0}")]
    InvalidBody(String),

    #[error("birth chart service did not respond within {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Text suitable for the user: the server's own message if it sent one.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Status { message: Some(message), .. } => message.clone(),
            TransportError::Timeout(_) => {
                "The birth chart service did not respond in time.".to_string()
            }
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_prefers_server_message() {
        let err = TransportError::Status { status: 400, message: Some("invalid city".into()) };
        assert_eq!(err.user_message(), "invalid city");
    }

    #[test]
    fn other_transport_errors_use_fallback() {
        let err = TransportError::Status { status: 500, message: None };
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);

        let err = TransportError::Network("connection refused".into());
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn resolving_error_reads_as_documented() {
        assert_eq!(WorkflowError::TimezoneResolving.to_string(), "timezone still resolving");
    }
}
