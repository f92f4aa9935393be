use log::warn;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::model::PlaceSelection;

const SELECTION_BUFFER: usize = 16;

/// A source of place-selection events bound to a city input.
pub trait PlaceAutocomplete: Send + Sync {
    fn subscribe(&self) -> PlaceSubscription;
}

/// Stream of selections. Dropping it unsubscribes.
#[derive(Debug)]
pub struct PlaceSubscription {
    receiver: broadcast::Receiver<PlaceSelection>,
}

impl PlaceSubscription {
    pub fn new(receiver: broadcast::Receiver<PlaceSelection>) -> Self {
        Self { receiver }
    }

    /// Next selection, or `None` once the source has gone away.
    /// Skipped selections are dropped; only newer ones matter anyway.
    pub async fn next(&mut self) -> Option<PlaceSelection> {
        loop {
            match self.receiver.recv().await {
                Ok(selection) => return Some(selection),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("autocomplete subscriber skipped {skipped} selections");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// In-process autocomplete binding: whatever drives the city input
/// (a prompt, a test) calls [`ChannelAutocomplete::emit`].
#[derive(Debug, Clone)]
pub struct ChannelAutocomplete {
    sender: broadcast::Sender<PlaceSelection>,
}

impl ChannelAutocomplete {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SELECTION_BUFFER);
        Self { sender }
    }

    /// Publish a selection. Returns `false` if nobody is listening.
    pub fn emit(&self, selection: PlaceSelection) -> bool {
        self.sender.send(selection).is_ok()
    }
}

impl Default for ChannelAutocomplete {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceAutocomplete for ChannelAutocomplete {
    fn subscribe(&self) -> PlaceSubscription {
        PlaceSubscription::new(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_selections_in_order() {
        let autocomplete = ChannelAutocomplete::new();
        let mut subscription = autocomplete.subscribe();

        assert!(autocomplete.emit(PlaceSelection::unresolved("Paris")));
        assert!(autocomplete.emit(PlaceSelection::unresolved("Rome")));

        assert_eq!(subscription.next().await.unwrap().display_name, "Paris");
        assert_eq!(subscription.next().await.unwrap().display_name, "Rome");
    }

    #[tokio::test]
    async fn emit_without_subscribers_reports_false() {
        let autocomplete = ChannelAutocomplete::new();
        assert!(!autocomplete.emit(PlaceSelection::unresolved("Paris")));
    }

    #[tokio::test]
    async fn subscription_ends_when_source_is_dropped() {
        let autocomplete = ChannelAutocomplete::new();
        let mut subscription = autocomplete.subscribe();
        drop(autocomplete);

        assert!(subscription.next().await.is_none());
    }
}
