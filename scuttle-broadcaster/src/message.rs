use scuttle_events::Event;
use serde::{Deserialize, Serialize};

/// The wire shape every session receives: `{ "source", "action", "payload" }`.
///
/// `Event::payload` is already a fully-resolved `serde_json::Value` by the time it
/// reaches here — the duck-typed `_clean()`/`to_json()` walk happens earlier, at
/// payload-construction time, via `scuttle_events::Serializable`/`PayloadValue`, so
/// this conversion is a straight field copy rather than a second recursive pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketMessage {
    pub source: String,
    pub action: String,
    pub payload: serde_json::Value,
}

impl WebsocketMessage {
    pub fn from_event(event: &Event) -> Self {
        Self {
            source: event.source.clone(),
            action: event.action.clone(),
            payload: event.payload.clone(),
        }
    }
}
