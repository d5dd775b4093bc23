//! Virtual switch — responds to `turn_on`, `turn_off`, `toggle`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use duolight_domain::entity::{EntityId, EntityState, StateSnapshot};
use duolight_domain::error::HubError;
use duolight_domain::light::attr;
use duolight_domain::service;

/// A simulated relay that can be turned on and off.
pub struct VirtualSwitch {
    entity_id: EntityId,
    name: String,
    state: Mutex<EntityState>,
}

impl VirtualSwitch {
    pub const DEMO_ENTITY_ID: &str = "switch.virtual_relay";

    /// The demo relay, `switch.virtual_relay`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the demo id does not parse.
    pub fn demo() -> Result<Self, HubError> {
        Ok(Self::new(
            EntityId::parse(Self::DEMO_ENTITY_ID)?,
            "Virtual Relay",
        ))
    }

    #[must_use]
    pub fn new(entity_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            entity_id,
            name: name.into(),
            state: Mutex::new(EntityState::Off),
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Current snapshot of the switch.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let state = *self.lock_state_mut();
        StateSnapshot::builder(self.entity_id.clone())
            .state(state)
            .attribute(attr::FRIENDLY_NAME, self.name.as_str())
            .build()
    }

    /// Handle a service call, returning the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnsupportedService`] for anything but
    /// `turn_on`, `turn_off` and `toggle`.
    pub fn handle_service(&self, service: &str) -> Result<StateSnapshot, HubError> {
        {
            let mut state = self.lock_state_mut();
            match service {
                service::TURN_ON => *state = EntityState::On,
                service::TURN_OFF => *state = EntityState::Off,
                service::TOGGLE => {
                    *state = match *state {
                        EntityState::On => EntityState::Off,
                        _ => EntityState::On,
                    };
                }
                _ => {
                    return Err(HubError::UnsupportedService {
                        domain: self.entity_id.domain().to_string(),
                        service: service.to_string(),
                    });
                }
            }
        }
        Ok(self.snapshot())
    }

    fn lock_state_mut(&self) -> MutexGuard<'_, EntityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_off() {
        let switch = VirtualSwitch::demo().unwrap();
        assert_eq!(switch.snapshot().state, EntityState::Off);
        assert_eq!(switch.entity_id().as_str(), "switch.virtual_relay");
    }

    #[test]
    fn should_turn_on_when_service_called() {
        let switch = VirtualSwitch::demo().unwrap();
        let snapshot = switch.handle_service("turn_on").unwrap();
        assert_eq!(snapshot.state, EntityState::On);
    }

    #[test]
    fn should_turn_off_when_service_called() {
        let switch = VirtualSwitch::demo().unwrap();
        switch.handle_service("turn_on").unwrap();
        let snapshot = switch.handle_service("turn_off").unwrap();
        assert_eq!(snapshot.state, EntityState::Off);
    }

    #[test]
    fn should_toggle_back_and_forth() {
        let switch = VirtualSwitch::demo().unwrap();
        assert_eq!(switch.handle_service("toggle").unwrap().state, EntityState::On);
        assert_eq!(switch.handle_service("toggle").unwrap().state, EntityState::Off);
    }

    #[test]
    fn should_reject_unknown_service() {
        let switch = VirtualSwitch::demo().unwrap();
        let err = switch.handle_service("reboot").unwrap_err();
        assert!(matches!(err, HubError::UnsupportedService { .. }));
        assert_eq!(switch.snapshot().state, EntityState::Off);
    }

    #[test]
    fn should_expose_friendly_name() {
        let switch = VirtualSwitch::demo().unwrap();
        assert_eq!(
            switch.snapshot().attribute(attr::FRIENDLY_NAME),
            Some(&"Virtual Relay".into())
        );
    }
}
