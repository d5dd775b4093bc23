//! State snapshot — what the state store holds for one entity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityId, EntityState};
use crate::time::{Timestamp, now};

/// Point-in-time view of an entity: its state plus free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub entity_id: EntityId,
    pub state: EntityState,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// When `state` last took a different value.
    pub last_changed: Timestamp,
    /// When the snapshot was last written, attributes included.
    pub last_updated: Timestamp,
}

impl StateSnapshot {
    /// Create a builder for a snapshot of `entity_id`.
    #[must_use]
    pub fn builder(entity_id: EntityId) -> StateSnapshotBuilder {
        StateSnapshotBuilder {
            entity_id,
            state: EntityState::default(),
            attributes: Map::new(),
            timestamp: None,
        }
    }

    /// Look up an attribute by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }
}

/// Step-by-step builder for [`StateSnapshot`].
#[derive(Debug)]
pub struct StateSnapshotBuilder {
    entity_id: EntityId,
    state: EntityState,
    attributes: Map<String, Value>,
    timestamp: Option<Timestamp>,
}

impl StateSnapshotBuilder {
    #[must_use]
    pub fn state(mut self, state: EntityState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = Some(ts);
        self
    }

    #[must_use]
    pub fn build(self) -> StateSnapshot {
        let ts = self.timestamp.unwrap_or_else(now);
        StateSnapshot {
            entity_id: self.entity_id,
            state: self.state,
            attributes: self.attributes,
            last_changed: ts,
            last_updated: ts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> EntityId {
        EntityId::parse("light.bulb").unwrap()
    }

    #[test]
    fn should_default_to_unknown_state_without_attributes() {
        let snapshot = StateSnapshot::builder(id()).build();
        assert_eq!(snapshot.state, EntityState::Unknown);
        assert!(snapshot.attributes.is_empty());
        assert_eq!(snapshot.last_changed, snapshot.last_updated);
    }

    #[test]
    fn should_expose_attributes_set_on_builder() {
        let snapshot = StateSnapshot::builder(id())
            .state(EntityState::On)
            .attribute("brightness", 200)
            .attribute("rgb_color", serde_json::json!([255, 0, 0]))
            .build();
        assert_eq!(snapshot.attribute("brightness"), Some(&Value::from(200)));
        assert_eq!(
            snapshot.attribute("rgb_color"),
            Some(&serde_json::json!([255, 0, 0]))
        );
    }

    #[test]
    fn should_treat_null_attribute_as_missing() {
        let snapshot = StateSnapshot::builder(id())
            .attribute("effect", Value::Null)
            .build();
        assert_eq!(snapshot.attribute("effect"), None);
    }

    #[test]
    fn should_deserialize_snapshot_without_attributes() {
        let json = serde_json::json!({
            "entity_id": "switch.relay",
            "state": "on",
            "last_changed": "2024-01-01T00:00:00Z",
            "last_updated": "2024-01-01T00:00:00Z",
        });
        let snapshot: StateSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.state, EntityState::On);
        assert!(snapshot.attributes.is_empty());
    }
}
