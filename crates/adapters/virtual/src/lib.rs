//! # duolight-adapter-virtual
//!
//! Virtual/demo integration that provides simulated devices for testing and
//! demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Entity ID | Behaviour |
//! |--------|-----------|-----------|
//! | Virtual Relay | `switch.virtual_relay` | Responds to `turn_on` / `turn_off` / `toggle` |
//! | Virtual Bulb | `light.virtual_bulb` | Same, plus brightness, color and effect data on `turn_on` |
//!
//! Every handled service call writes the device's new snapshot into the
//! state store, which is how the rest of the hub observes the change.
//!
//! ## Dependency rule
//!
//! Depends on `duolight-app` (port traits) and `duolight-domain` only.

mod devices;

use std::collections::HashMap;

use duolight_app::ports::{ServiceCaller, StateStore};
use duolight_domain::entity::EntityId;
use duolight_domain::error::{HubError, NotFoundError};
use duolight_domain::service::ServiceCall;

pub use devices::{VirtualDevice, VirtualLight, VirtualSwitch};

/// Virtual integration owning a set of simulated devices.
pub struct VirtualIntegration<S> {
    devices: HashMap<EntityId, VirtualDevice>,
    store: S,
}

impl<S> VirtualIntegration<S> {
    /// An integration without devices.
    pub fn new(store: S) -> Self {
        Self {
            devices: HashMap::new(),
            store,
        }
    }

    /// An integration with the demo relay and bulb.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if a demo entity id does not parse.
    pub fn demo(store: S) -> Result<Self, HubError> {
        Ok(Self::new(store)
            .with_device(VirtualSwitch::demo()?)
            .with_device(VirtualLight::demo()?))
    }

    /// Add a device, replacing any device with the same entity id.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<VirtualDevice>) -> Self {
        let device = device.into();
        self.devices.insert(device.entity_id().clone(), device);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        "virtual"
    }

    /// Ids of every device, sorted.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.devices.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<S: StateStore> VirtualIntegration<S> {
    /// Publish the initial snapshot of every device.
    ///
    /// # Errors
    ///
    /// Propagates state store failures.
    pub async fn setup(&self) -> Result<(), HubError> {
        for device in self.devices.values() {
            self.store.set(device.snapshot()).await?;
        }
        tracing::info!(integration = self.name(), entities = ?self.entity_ids(), "integration ready");
        Ok(())
    }
}

impl<S: StateStore> ServiceCaller for VirtualIntegration<S> {
    async fn call(&self, call: ServiceCall) -> Result<(), HubError> {
        let device = self.devices.get(&call.entity_id).ok_or_else(|| NotFoundError {
            entity: "Entity",
            id: call.entity_id.to_string(),
        })?;

        let snapshot = device.handle_service(&call.service, &call.data)?;
        tracing::debug!(%call, state = %snapshot.state, "virtual device updated");
        self.store.set(snapshot).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolight_app::event_bus::InProcessEventBus;
    use duolight_app::state_store::InMemoryStateStore;
    use duolight_domain::entity::EntityState;
    use serde_json::json;
    use std::sync::Arc;

    type Store = Arc<InMemoryStateStore<InProcessEventBus>>;

    fn integration() -> (VirtualIntegration<Store>, Store) {
        let store = Arc::new(InMemoryStateStore::new(InProcessEventBus::new(16)));
        (VirtualIntegration::demo(Arc::clone(&store)).unwrap(), store)
    }

    fn relay() -> EntityId {
        EntityId::parse("switch.virtual_relay").unwrap()
    }

    fn bulb() -> EntityId {
        EntityId::parse("light.virtual_bulb").unwrap()
    }

    #[test]
    fn should_return_virtual_as_name() {
        let (integration, _) = integration();
        assert_eq!(integration.name(), "virtual");
    }

    #[test]
    fn should_list_demo_entity_ids_sorted() {
        let (integration, _) = integration();
        assert_eq!(integration.entity_ids(), vec![bulb(), relay()]);
    }

    #[tokio::test]
    async fn should_publish_initial_snapshots_on_setup() {
        let (integration, store) = integration();
        integration.setup().await.unwrap();

        assert_eq!(store.get(&relay()).unwrap().state, EntityState::Off);
        assert_eq!(store.get(&bulb()).unwrap().state, EntityState::Off);
    }

    #[tokio::test]
    async fn should_write_new_state_after_service_call() {
        let (integration, store) = integration();
        integration.setup().await.unwrap();

        integration
            .call(ServiceCall::new("turn_on", relay()))
            .await
            .unwrap();
        let mut data = serde_json::Map::new();
        data.insert("brightness".to_string(), json!(128));
        integration
            .call(ServiceCall::new("turn_on", bulb()).with_data(data))
            .await
            .unwrap();

        assert_eq!(store.get(&relay()).unwrap().state, EntityState::On);
        let bulb = store.get(&bulb()).unwrap();
        assert_eq!(bulb.state, EntityState::On);
        assert_eq!(bulb.attribute("brightness"), Some(&json!(128)));
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_entity() {
        let (integration, _) = integration();
        let err = integration
            .call(ServiceCall::new("turn_on", EntityId::parse("switch.other").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_reject_unknown_service_without_writing() {
        let (integration, store) = integration();
        let err = integration
            .call(ServiceCall::new("reboot", relay()))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::UnsupportedService { .. }));
        assert!(store.get(&relay()).is_none());
    }
}
