//! Input state: the values the user has entered so far plus the derived
//! workflow status.
//!
//! `FormState` does no I/O. User edits go through the public mutators;
//! resolution and submission transitions are crate-private and reached
//! only through the resolver and orchestrator.

use chrono::{NaiveDate, NaiveTime};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{
    CITY_REQUIRED_MESSAGE, MOMENT_REQUIRED_MESSAGE, PLACE_UNRESOLVED_MESSAGE, ResolutionError,
    TIMEZONE_REQUIRED_MESSAGE, TIMEZONE_UNRESOLVED_MESSAGE, WorkflowError,
};
use crate::model::{BirthMoment, ChartQuery, Coordinates, PlaceSelection, TimezoneOffset};

/// Workflow status; submission is only offered in `Ready`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    AwaitingTimezone,
    Ready,
    Submitting,
    Succeeded(Value),
    Failed(String),
}

impl RequestState {
    pub fn is_ready(&self) -> bool {
        matches!(self, RequestState::Ready)
    }

    /// The last submission finished, one way or the other.
    pub fn is_settled(&self) -> bool {
        matches!(self, RequestState::Succeeded(_) | RequestState::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimezoneSource {
    Manual,
    Resolved,
}

/// Handle for one automatic timezone resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionTicket {
    seq: u64,
    pub coordinates: Coordinates,
}

/// Handle for one in-flight birth chart request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    seq: u64,
    pub query: ChartQuery,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FormState {
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    place: PlaceSelection,
    timezone: Option<(TimezoneOffset, TimezoneSource)>,
    request_state: RequestState,
    notice: Option<String>,

    #[serde(skip)]
    place_revision: u64,
    #[serde(skip)]
    resolution_seq: u64,
    #[serde(skip)]
    pending_resolution: Option<u64>,
    #[serde(skip)]
    submission_seq: u64,
    #[serde(skip)]
    in_flight_submission: Option<u64>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn place(&self) -> &PlaceSelection {
        &self.place
    }

    pub fn timezone_offset(&self) -> Option<TimezoneOffset> {
        self.timezone.map(|(offset, _)| offset)
    }

    pub fn timezone_source(&self) -> Option<TimezoneSource> {
        self.timezone.map(|(_, source)| source)
    }

    pub fn request_state(&self) -> &RequestState {
        &self.request_state
    }

    /// Inline message for the user (validation or resolution problems).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Bumped every time the place changes, typed or selected.
    pub fn place_revision(&self) -> u64 {
        self.place_revision
    }

    pub fn is_resolving(&self) -> bool {
        self.pending_resolution.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight_submission.is_some()
    }

    /// The jointly valid date and time, if both have been picked.
    pub fn birth_moment(&self) -> Option<BirthMoment> {
        BirthMoment::from_parts(self.date?, self.time?).ok()
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<(), WorkflowError> {
        if self.is_submitting() {
            return Err(WorkflowError::Busy);
        }
        self.date = Some(date);
        self.notice = None;
        self.recompute();
        Ok(())
    }

    pub fn set_time(&mut self, time: NaiveTime) -> Result<(), WorkflowError> {
        if self.is_submitting() {
            return Err(WorkflowError::Busy);
        }
        self.time = Some(time);
        self.notice = None;
        self.recompute();
        Ok(())
    }

    /// Free-text city edit. Drops coordinates and any offset, so the form
    /// is not ready again until the place is re-resolved or an offset is
    /// entered by hand.
    pub fn set_city(&mut self, text: impl Into<String>) {
        self.supersede_submission();
        self.place = PlaceSelection::unresolved(text);
        self.place_revision += 1;
        self.timezone = None;
        self.pending_resolution = None;
        self.notice = None;
        self.recompute();
    }

    /// Manual offset. Cancels any pending automatic resolution.
    pub fn set_manual_timezone(&mut self, offset: TimezoneOffset) {
        self.supersede_submission();
        if self.pending_resolution.take().is_some() {
            debug!("manual timezone cancels pending resolution");
        }
        self.timezone = Some((offset, TimezoneSource::Manual));
        self.notice = None;
        self.recompute();
    }

    /// Record an autocomplete selection. Returns a ticket when the place
    /// has coordinates to resolve a timezone from.
    pub(crate) fn select_place(&mut self, selection: PlaceSelection) -> Option<ResolutionTicket> {
        self.supersede_submission();
        let coordinates = selection.coordinates;
        self.place = selection;
        self.place_revision += 1;
        self.timezone = None;
        self.pending_resolution = None;
        self.notice = None;

        match coordinates {
            Some(coordinates) => Some(self.begin_resolution(coordinates)),
            None => {
                self.notice = Some(PLACE_UNRESOLVED_MESSAGE.to_string());
                self.recompute();
                None
            }
        }
    }

    /// Issue a new resolution. Any earlier one becomes stale.
    pub(crate) fn begin_resolution(&mut self, coordinates: Coordinates) -> ResolutionTicket {
        self.resolution_seq += 1;
        self.pending_resolution = Some(self.resolution_seq);
        self.notice = None;
        self.recompute();
        ResolutionTicket { seq: self.resolution_seq, coordinates }
    }

    /// Apply a finished resolution. Returns `false` when the ticket was
    /// superseded or cancelled and the outcome was discarded.
    pub(crate) fn complete_resolution(
        &mut self,
        ticket: ResolutionTicket,
        outcome: Result<TimezoneOffset, ResolutionError>,
    ) -> bool {
        if self.pending_resolution != Some(ticket.seq) {
            return false;
        }
        self.pending_resolution = None;

        match outcome {
            Ok(offset) => {
                self.timezone = Some((offset, TimezoneSource::Resolved));
            }
            Err(_) => {
                self.timezone = None;
                self.notice = Some(TIMEZONE_UNRESOLVED_MESSAGE.to_string());
            }
        }
        self.recompute();
        true
    }

    /// Validate the inputs and move to `Submitting`.
    pub(crate) fn begin_submission(&mut self) -> Result<SubmissionTicket, WorkflowError> {
        if self.is_submitting() {
            return Err(WorkflowError::Busy);
        }
        if self.is_resolving() {
            return Err(WorkflowError::TimezoneResolving);
        }
        if !self.place.has_name() {
            return Err(self.reject(CITY_REQUIRED_MESSAGE));
        }
        let Some(moment) = self.birth_moment() else {
            return Err(self.reject(MOMENT_REQUIRED_MESSAGE));
        };
        let Some(offset) = self.timezone_offset() else {
            return Err(self.reject(TIMEZONE_REQUIRED_MESSAGE));
        };

        let query = ChartQuery::new(&moment, &self.place.display_name, Some(offset));
        self.submission_seq += 1;
        self.in_flight_submission = Some(self.submission_seq);
        self.notice = None;
        self.recompute();

        Ok(SubmissionTicket { seq: self.submission_seq, query })
    }

    /// Store the outcome of a submission. Returns `false` when an edit
    /// made the submission irrelevant in the meantime.
    pub(crate) fn complete_submission(
        &mut self,
        ticket: &SubmissionTicket,
        outcome: Result<Value, String>,
    ) -> bool {
        if self.in_flight_submission != Some(ticket.seq) {
            return false;
        }
        self.in_flight_submission = None;
        self.request_state = match outcome {
            Ok(body) => RequestState::Succeeded(body),
            Err(message) => RequestState::Failed(message),
        };
        true
    }

    fn reject(&mut self, message: &str) -> WorkflowError {
        self.notice = Some(message.to_string());
        WorkflowError::Validation(message.to_string())
    }

    fn supersede_submission(&mut self) {
        if self.in_flight_submission.take().is_some() {
            debug!("edit supersedes in-flight birth chart request");
        }
    }

    fn inputs_complete(&self) -> bool {
        self.birth_moment().is_some() && self.place.has_name() && self.timezone.is_some()
    }

    fn recompute(&mut self) {
        self.request_state = if self.is_submitting() {
            RequestState::Submitting
        } else if self.is_resolving() {
            RequestState::AwaitingTimezone
        } else if self.inputs_complete() {
            RequestState::Ready
        } else {
            RequestState::Idle
        };
    }
}
