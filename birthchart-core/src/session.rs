use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, NaiveTime};
use log::debug;
use tokio::sync::watch;

use crate::error::WorkflowError;
use crate::model::TimezoneOffset;
use crate::state::{FormState, RequestState};

/// Shared handle to the input state of one user session.
///
/// Clones refer to the same state. Every change is published on a watch
/// channel, so rendering code can observe the form without writing to it.
#[derive(Debug, Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    form: Mutex<FormState>,
    updates: watch::Sender<FormState>,
}

impl Session {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(FormState::new());
        Self { shared: Arc::new(Shared { form: Mutex::new(FormState::new()), updates }) }
    }

    pub fn snapshot(&self) -> FormState {
        self.lock().clone()
    }

    pub fn request_state(&self) -> RequestState {
        self.lock().request_state().clone()
    }

    /// Receiver that sees a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.shared.updates.subscribe()
    }

    pub fn set_date(&self, date: NaiveDate) -> Result<(), WorkflowError> {
        self.update(|form| form.set_date(date))
    }

    pub fn set_time(&self, time: NaiveTime) -> Result<(), WorkflowError> {
        self.update(|form| form.set_time(time))
    }

    pub fn set_city(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|form| form.set_city(text));
    }

    pub fn set_manual_timezone(&self, offset: TimezoneOffset) {
        self.update(|form| form.set_manual_timezone(offset));
    }

    /// Run one transition under the lock and publish the result.
    pub(crate) fn update<R>(&self, transition: impl FnOnce(&mut FormState) -> R) -> R {
        let mut form = self.lock();
        let before = form.request_state().clone();
        let output = transition(&mut *form);

        if form.request_state() != &before {
            debug!("request state {:?} -> {:?}", before, form.request_state());
        }
        self.shared.updates.send_replace(form.clone());
        output
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FormState> {
        self.shared.form.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let other = session.clone();

        other.set_city("Lisbon, Portugal");
        assert_eq!(session.snapshot().place().display_name, "Lisbon, Portugal");
    }

    #[test]
    fn subscribers_see_every_change() {
        let session = Session::new();
        let mut updates = session.subscribe();
        assert!(!updates.has_changed().unwrap());

        session.set_date(NaiveDate::from_ymd_opt(2001, 9, 9).unwrap()).unwrap();
        session.set_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap()).unwrap();
        session.set_city("Oslo, Norway");
        session.set_manual_timezone(TimezoneOffset::from_hours(1.0).unwrap());

        assert!(updates.has_changed().unwrap());
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.request_state(), &RequestState::Ready);
        assert_eq!(session.request_state(), RequestState::Ready);
    }
}
