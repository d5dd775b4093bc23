//! Virtual device implementations — relay switch and feature light.

mod light;
mod switch;

pub use light::VirtualLight;
pub use switch::VirtualSwitch;

use serde_json::{Map, Value};

use duolight_domain::entity::{EntityId, StateSnapshot};
use duolight_domain::error::HubError;

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Self::Light(d) => d.entity_id(),
            Self::Switch(d) => d.entity_id(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        match self {
            Self::Light(d) => d.snapshot(),
            Self::Switch(d) => d.snapshot(),
        }
    }

    /// Handle a service call, returning the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnsupportedService`] for services the device
    /// doesn't know.
    pub fn handle_service(
        &self,
        service: &str,
        data: &Map<String, Value>,
    ) -> Result<StateSnapshot, HubError> {
        match self {
            Self::Light(d) => d.handle_service(service, data),
            Self::Switch(d) => d.handle_service(service),
        }
    }
}

impl From<VirtualLight> for VirtualDevice {
    fn from(light: VirtualLight) -> Self {
        Self::Light(light)
    }
}

impl From<VirtualSwitch> for VirtualDevice {
    fn from(switch: VirtualSwitch) -> Self {
        Self::Switch(switch)
    }
}
