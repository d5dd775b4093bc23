//! Service — a command addressed to one entity.
//!
//! Examples: `switch.turn_on`, `light.turn_on` with `{"brightness": 128}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::EntityId;

pub const TURN_ON: &str = "turn_on";
pub const TURN_OFF: &str = "turn_off";
pub const TOGGLE: &str = "toggle";

/// A request to invoke `domain.service` on `entity_id` with `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub entity_id: EntityId,
    /// Service parameters, never including the target `entity_id`.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ServiceCall {
    /// Address `service` to `entity_id`, in the entity's own domain.
    #[must_use]
    pub fn new(service: impl Into<String>, entity_id: EntityId) -> Self {
        Self {
            domain: entity_id.domain().to_string(),
            service: service.into(),
            entity_id,
            data: Map::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}({})", self.domain, self.service, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_take_domain_from_target_entity() {
        let call = ServiceCall::new(TURN_ON, EntityId::parse("switch.relay").unwrap());
        assert_eq!(call.domain, "switch");
        assert_eq!(call.service, "turn_on");
        assert!(call.data.is_empty());
    }

    #[test]
    fn should_display_domain_service_and_target() {
        let call = ServiceCall::new(TURN_OFF, EntityId::parse("light.bulb").unwrap());
        assert_eq!(call.to_string(), "light.turn_off(light.bulb)");
    }

    #[test]
    fn should_carry_data() {
        let mut data = Map::new();
        data.insert("brightness".to_string(), Value::from(128));
        let call =
            ServiceCall::new(TURN_ON, EntityId::parse("light.bulb").unwrap()).with_data(data);
        assert_eq!(call.data.get("brightness"), Some(&Value::from(128)));
    }
}
