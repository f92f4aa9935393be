//! Bridges city selection events and the timezone lookup into the session.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::autocomplete::PlaceAutocomplete;
use crate::error::ResolutionError;
use crate::model::{Coordinates, PlaceSelection};
use crate::provider::TimezoneLookup;
use crate::session::Session;
use crate::state::ResolutionTicket;

pub struct LocationResolver {
    resolution: Resolution,
    listener: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
struct Resolution {
    session: Session,
    lookup: Option<Arc<dyn TimezoneLookup>>,
    timeout: Duration,
}

impl LocationResolver {
    /// `lookup` may be absent; selections are then recorded but every
    /// resolution fails over to manual entry.
    pub fn new(session: Session, lookup: Option<Arc<dyn TimezoneLookup>>, timeout: Duration) -> Self {
        Self { resolution: Resolution { session, lookup, timeout }, listener: None }
    }

    /// Start listening to the city input's selection events. A previous
    /// subscription, if any, is dropped.
    pub fn on_city_input_mounted(&mut self, autocomplete: &dyn PlaceAutocomplete) {
        self.teardown();

        let mut subscription = autocomplete.subscribe();
        let resolution = self.resolution.clone();

        self.listener = Some(tokio::spawn(async move {
            while let Some(selection) = subscription.next().await {
                resolution.select_place(selection);
            }
            debug!("autocomplete subscription closed");
        }));
    }

    /// Record a selection directly. Returns the resolution task when the
    /// place has coordinates.
    pub fn select_place(&self, selection: PlaceSelection) -> Option<JoinHandle<bool>> {
        self.resolution.select_place(selection)
    }

    /// Resolve the offset for `coordinates` now. Returns `false` when the
    /// result was discarded because a newer selection or a manual offset
    /// superseded it.
    pub async fn resolve_timezone(&self, coordinates: Coordinates) -> bool {
        let ticket = self.resolution.session.update(|form| form.begin_resolution(coordinates));
        self.resolution.run(ticket).await
    }

    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| !l.is_finished())
    }

    pub fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl Drop for LocationResolver {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Resolution {
    fn select_place(&self, selection: PlaceSelection) -> Option<JoinHandle<bool>> {
        info!("place selected: {}", selection.display_name);

        let Some(ticket) = self.session.update(|form| form.select_place(selection)) else {
            info!("selected place has no coordinates; timezone must be entered manually");
            return None;
        };

        let resolution = self.clone();
        Some(tokio::spawn(async move { resolution.run(ticket).await }))
    }

    async fn run(&self, ticket: ResolutionTicket) -> bool {
        // The current instant, not the birth instant: historical DST rules
        // are not taken into account.
        let now = Utc::now().timestamp();

        let outcome = match &self.lookup {
            None => Err(ResolutionError::Unavailable),
            Some(lookup) => {
                match tokio::time::timeout(self.timeout, lookup.lookup(ticket.coordinates, now)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ResolutionError::Timeout(self.timeout)),
                }
            }
        };

        match &outcome {
            Ok(offset) => debug!("timezone resolved to {offset}"),
            Err(e) => warn!("timezone resolution failed: {e}"),
        }

        let applied = self.session.update(|form| form.complete_resolution(ticket, outcome));
        if !applied {
            debug!("discarding stale timezone resolution");
        }
        applied
    }
}
