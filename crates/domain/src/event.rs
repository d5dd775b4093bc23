//! Event — an immutable record of something that happened.
//!
//! State stores publish [`EventType::StateChanged`] whenever a snapshot is
//! written or removed; the composition root publishes the hub lifecycle
//! events.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, StateSnapshot};
use crate::id::EventId;
use crate::time::{Timestamp, now};

/// What kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StateChanged,
    /// Every integration is set up and entities are resolvable.
    HubStarted,
    HubStopping,
}

/// A single published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub entity_id: Option<EntityId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    #[must_use]
    pub fn new(event_type: EventType, entity_id: Option<EntityId>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            entity_id,
            data,
            timestamp: now(),
        }
    }

    /// A snapshot was written (`new_state` set) or removed (`new_state` absent).
    #[must_use]
    pub fn state_changed(
        entity_id: EntityId,
        old_state: Option<&StateSnapshot>,
        new_state: Option<&StateSnapshot>,
    ) -> Self {
        let data = serde_json::json!({
            "entity_id": entity_id,
            "old_state": old_state,
            "new_state": new_state,
        });
        Self::new(EventType::StateChanged, Some(entity_id), data)
    }

    #[must_use]
    pub fn hub_started() -> Self {
        Self::new(EventType::HubStarted, None, serde_json::Value::Null)
    }

    #[must_use]
    pub fn hub_stopping() -> Self {
        Self::new(EventType::HubStopping, None, serde_json::Value::Null)
    }

    /// Whether this is a state change of any of `entity_ids`.
    #[must_use]
    pub fn is_state_change_of(&self, entity_ids: &[&EntityId]) -> bool {
        self.event_type == EventType::StateChanged
            && self
                .entity_id
                .as_ref()
                .is_some_and(|id| entity_ids.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityState;

    fn relay() -> EntityId {
        EntityId::parse("switch.relay").unwrap()
    }

    #[test]
    fn should_carry_new_state_in_state_changed_event() {
        let snapshot = StateSnapshot::builder(relay())
            .state(EntityState::On)
            .build();
        let event = Event::state_changed(relay(), None, Some(&snapshot));

        assert_eq!(event.event_type, EventType::StateChanged);
        assert_eq!(event.entity_id, Some(relay()));
        let carried: StateSnapshot =
            serde_json::from_value(event.data["new_state"].clone()).unwrap();
        assert_eq!(carried, snapshot);
    }

    #[test]
    fn should_have_no_new_state_when_entity_removed() {
        let event = Event::state_changed(relay(), None, None);
        assert!(event.data["new_state"].is_null());
        assert!(event.data["old_state"].is_null());
    }

    #[test]
    fn should_match_state_change_of_listed_entity() {
        let bulb = EntityId::parse("light.bulb").unwrap();
        let event = Event::state_changed(relay(), None, None);

        assert!(event.is_state_change_of(&[&bulb, &relay()]));
        assert!(!event.is_state_change_of(&[&bulb]));
    }

    #[test]
    fn should_not_match_lifecycle_event() {
        assert!(!Event::hub_started().is_state_change_of(&[&relay()]));
    }

    #[test]
    fn should_serialize_event_type_as_snake_case() {
        let json = serde_json::to_value(EventType::HubStarted).unwrap();
        assert_eq!(json, serde_json::json!("hub_started"));
    }
}
