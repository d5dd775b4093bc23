//! Dual entity light — a composite light built from a switch and a feature light.
//!
//! The switch entity decides whether the light has power; the feature entity
//! supplies brightness, color and effects. Nothing is cached: every query
//! reads both snapshots from the [`StateStore`] and derives the answer, so
//! the composite can never disagree with its sources.
//!
//! The composite is on when the switch is `on` and the feature light is not
//! `off`. A feature light that is `unknown` or `unavailable` behind a live
//! switch still counts as on, since cutting power is what usually makes a
//! bulb unreachable.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use duolight_domain::entity::{EntityId, EntityState, StateSnapshot};
use duolight_domain::error::{HubError, ValidationError};
use duolight_domain::event::Event;
use duolight_domain::light::{ColorAttribute, ColorMode, LightEntityFeature, attr};
use duolight_domain::service::{self, ServiceCall};

use crate::ports::{ServiceCaller, StateStore};

/// Identity of a composite light.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable token, the override or `"{switch}_{feature}_dual"`.
    pub unique_id: String,
    /// Id the composite publishes its state under.
    pub entity_id: EntityId,
}

impl Identity {
    /// Use `entity_id` when given, otherwise derive both parts from the sources.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if no valid entity id can be derived,
    /// or if the id is one of the two sources.
    pub fn derive(
        switch_entity: &EntityId,
        feature_entity: &EntityId,
        entity_id: Option<&EntityId>,
    ) -> Result<Self, HubError> {
        let identity = match entity_id {
            Some(entity_id) => Self {
                unique_id: entity_id.to_string(),
                entity_id: entity_id.clone(),
            },
            None => {
                let unique_id = format!("{switch_entity}_{feature_entity}_dual");
                let entity_id = EntityId::from_slug("light", &unique_id)?;
                Self {
                    unique_id,
                    entity_id,
                }
            }
        };
        // publishing over a source would feed back into its own change events
        if &identity.entity_id == switch_entity || &identity.entity_id == feature_entity {
            return Err(ValidationError::SelfReference(identity.entity_id.to_string()).into());
        }
        Ok(identity)
    }
}

/// Everything the composite exposes, derived from one read of both sources.
#[derive(Debug, Clone, PartialEq)]
pub struct LightState {
    pub is_on: Option<bool>,
    pub supported_color_modes: Option<BTreeSet<ColorMode>>,
    pub supported_features: Option<LightEntityFeature>,
    pub color_mode: Option<ColorMode>,
    pub brightness: Option<u8>,
    /// Color values whose mode is supported and that the feature entity reports.
    pub colors: Vec<(ColorAttribute, Value)>,
    pub effect_list: Option<Vec<String>>,
    pub effect: Option<String>,
    /// Kelvin bounds, exactly as the feature entity reports them.
    pub min_color_temp_kelvin: Option<Value>,
    pub max_color_temp_kelvin: Option<Value>,
}

impl LightState {
    /// Render as the composite's own snapshot, omitting absent values.
    #[must_use]
    pub fn to_snapshot(&self, entity_id: EntityId, name: &str) -> StateSnapshot {
        let mut attributes = Map::new();
        attributes.insert(attr::FRIENDLY_NAME.into(), name.into());
        if let Some(modes) = &self.supported_color_modes {
            let modes: Vec<Value> = modes.iter().map(|m| m.as_str().into()).collect();
            attributes.insert(attr::SUPPORTED_COLOR_MODES.into(), modes.into());
        }
        if let Some(features) = self.supported_features {
            attributes.insert(attr::SUPPORTED_FEATURES.into(), features.bits().into());
        }
        if let Some(mode) = self.color_mode {
            attributes.insert(attr::COLOR_MODE.into(), mode.as_str().into());
        }
        if let Some(brightness) = self.brightness {
            attributes.insert(attr::BRIGHTNESS.into(), brightness.into());
        }
        for (color, value) in &self.colors {
            attributes.insert(color.key().into(), value.clone());
        }
        if let Some(effects) = &self.effect_list {
            attributes.insert(attr::EFFECT_LIST.into(), effects.clone().into());
        }
        if let Some(effect) = &self.effect {
            attributes.insert(attr::EFFECT.into(), effect.clone().into());
        }
        if let Some(kelvin) = &self.min_color_temp_kelvin {
            attributes.insert(attr::MIN_COLOR_TEMP_KELVIN.into(), kelvin.clone());
        }
        if let Some(kelvin) = &self.max_color_temp_kelvin {
            attributes.insert(attr::MAX_COLOR_TEMP_KELVIN.into(), kelvin.clone());
        }

        StateSnapshot::builder(entity_id)
            .state(EntityState::from_on_off(self.is_on))
            .attributes(attributes)
            .build()
    }
}

/// Both source snapshots, read once.
struct Sources {
    switch: Option<StateSnapshot>,
    feature: Option<StateSnapshot>,
}

impl Sources {
    fn is_on(&self) -> Option<bool> {
        let switch = self.switch.as_ref()?;
        let feature = self.feature.as_ref()?;
        Some(switch.state == EntityState::On && feature.state != EntityState::Off)
    }

    fn supported_color_modes(&self) -> Option<BTreeSet<ColorMode>> {
        let feature = self.feature.as_ref()?;
        Some(
            feature
                .attribute(attr::SUPPORTED_COLOR_MODES)
                .map_or_else(|| BTreeSet::from([ColorMode::Onoff]), ColorMode::set_from_value),
        )
    }

    fn supported_features(&self) -> Option<LightEntityFeature> {
        let feature = self.feature.as_ref()?;
        Some(
            feature
                .attribute(attr::SUPPORTED_FEATURES)
                .map(LightEntityFeature::from_value)
                .unwrap_or_default(),
        )
    }

    fn color_mode(&self) -> Option<ColorMode> {
        let feature = self.feature.as_ref()?;
        feature
            .attribute(attr::COLOR_MODE)
            .and_then(ColorMode::from_value)
            .or_else(|| self.supported_color_modes()?.first().copied())
    }

    fn color(&self, color: ColorAttribute) -> Option<Value> {
        if !self.supported_color_modes()?.contains(&color.mode()) {
            return None;
        }
        self.feature.as_ref()?.attribute(color.key()).cloned()
    }

    /// The feature attribute `key`, only while the effect bit is advertised.
    fn effect_attribute(&self, key: &str) -> Option<&Value> {
        if !self
            .supported_features()?
            .contains(LightEntityFeature::EFFECT)
        {
            return None;
        }
        self.feature.as_ref()?.attribute(key)
    }

    fn effect_list(&self) -> Option<Vec<String>> {
        let list = self.effect_attribute(attr::EFFECT_LIST)?.as_array()?;
        Some(
            list.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }

    fn effect(&self) -> Option<String> {
        self.effect_attribute(attr::EFFECT)?
            .as_str()
            .map(str::to_string)
    }

    fn brightness(&self) -> Option<u8> {
        let feature = self.feature.as_ref()?;
        if feature.state != EntityState::On {
            return None;
        }
        let raw = feature.attribute(attr::BRIGHTNESS)?.as_u64()?;
        u8::try_from(raw).ok()
    }

    fn kelvin(&self, key: &str) -> Option<Value> {
        self.feature.as_ref()?.attribute(key).cloned()
    }

    fn light_state(&self) -> LightState {
        LightState {
            is_on: self.is_on(),
            supported_color_modes: self.supported_color_modes(),
            supported_features: self.supported_features(),
            color_mode: self.color_mode(),
            brightness: self.brightness(),
            colors: ColorAttribute::ALL
                .into_iter()
                .filter_map(|c| self.color(c).map(|v| (c, v)))
                .collect(),
            effect_list: self.effect_list(),
            effect: self.effect(),
            min_color_temp_kelvin: self.kelvin(attr::MIN_COLOR_TEMP_KELVIN),
            max_color_temp_kelvin: self.kelvin(attr::MAX_COLOR_TEMP_KELVIN),
        }
    }
}

/// Build the `turn_on` data for the feature entity from the caller's options.
///
/// Kelvin wins over mireds when both are given; the target `entity_id` is
/// never forwarded.
#[must_use]
pub fn feature_turn_on_data(options: &Map<String, Value>) -> Map<String, Value> {
    let mut data = Map::new();
    if let Some(kelvin) = options.get(attr::COLOR_TEMP_KELVIN) {
        data.insert(attr::COLOR_TEMP_KELVIN.into(), kelvin.clone());
    } else if let Some(mireds) = options.get(attr::COLOR_TEMP) {
        data.insert(attr::COLOR_TEMP.into(), mireds.clone());
    }
    for (key, value) in options {
        if !matches!(
            key.as_str(),
            attr::ENTITY_ID | attr::COLOR_TEMP | attr::COLOR_TEMP_KELVIN
        ) {
            data.insert(key.clone(), value.clone());
        }
    }
    data
}

/// Composite light over a switch entity and a feature entity.
pub struct DualEntityLight<S, C> {
    name: String,
    identity: Identity,
    switch_entity: EntityId,
    feature_entity: EntityId,
    store: S,
    caller: C,
}

impl<S: StateStore, C: ServiceCaller> DualEntityLight<S, C> {
    /// Wire a composite light to its two sources.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if no entity id can be derived.
    pub fn new(
        name: impl Into<String>,
        switch_entity: EntityId,
        feature_entity: EntityId,
        entity_id: Option<EntityId>,
        store: S,
        caller: C,
    ) -> Result<Self, HubError> {
        let identity = Identity::derive(&switch_entity, &feature_entity, entity_id.as_ref())?;
        Ok(Self {
            name: name.into(),
            identity,
            switch_entity,
            feature_entity,
            store,
            caller,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.identity.unique_id
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.identity.entity_id
    }

    #[must_use]
    pub fn switch_entity(&self) -> &EntityId {
        &self.switch_entity
    }

    #[must_use]
    pub fn feature_entity(&self) -> &EntityId {
        &self.feature_entity
    }

    fn sources(&self) -> Sources {
        Sources {
            switch: self.store.get(&self.switch_entity),
            feature: self.store.get(&self.feature_entity),
        }
    }

    /// `None` while either source is missing from the store.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.sources().is_on()
    }

    /// The feature entity's modes, `{onoff}` when it advertises none.
    #[must_use]
    pub fn supported_color_modes(&self) -> Option<BTreeSet<ColorMode>> {
        self.sources().supported_color_modes()
    }

    #[must_use]
    pub fn supported_features(&self) -> Option<LightEntityFeature> {
        self.sources().supported_features()
    }

    /// The reported mode, else the first supported mode in canonical order.
    #[must_use]
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.sources().color_mode()
    }

    /// Raw color value for `color`, only if its mode is supported.
    #[must_use]
    pub fn color(&self, color: ColorAttribute) -> Option<Value> {
        self.sources().color(color)
    }

    #[must_use]
    pub fn effect_list(&self) -> Option<Vec<String>> {
        self.sources().effect_list()
    }

    #[must_use]
    pub fn effect(&self) -> Option<String> {
        self.sources().effect()
    }

    /// Brightness while the feature entity itself is `on`.
    #[must_use]
    pub fn brightness(&self) -> Option<u8> {
        self.sources().brightness()
    }

    #[must_use]
    pub fn min_color_temp_kelvin(&self) -> Option<Value> {
        self.sources().kelvin(attr::MIN_COLOR_TEMP_KELVIN)
    }

    #[must_use]
    pub fn max_color_temp_kelvin(&self) -> Option<Value> {
        self.sources().kelvin(attr::MAX_COLOR_TEMP_KELVIN)
    }

    /// Every readable property from a single read of both sources.
    #[must_use]
    pub fn state(&self) -> LightState {
        self.sources().light_state()
    }

    /// Polling hook: re-read the sources. Nothing is cached, so this is the
    /// same as [`state`](Self::state).
    #[must_use]
    pub fn refresh(&self) -> LightState {
        let state = self.state();
        tracing::debug!(
            entity_id = %self.identity.entity_id,
            is_on = ?state.is_on,
            switch = ?self.store.get(&self.switch_entity).map(|s| s.state),
            feature = ?self.store.get(&self.feature_entity).map(|s| s.state),
            "refreshed"
        );
        state
    }

    /// Recompute and publish the composite's snapshot.
    ///
    /// # Errors
    ///
    /// Propagates state store failures.
    pub async fn write_state(&self) -> Result<StateSnapshot, HubError> {
        self.write_state_from(&self.state()).await
    }

    /// Publish an already derived `state` as the composite's snapshot.
    ///
    /// # Errors
    ///
    /// Propagates state store failures.
    pub async fn write_state_from(&self, state: &LightState) -> Result<StateSnapshot, HubError> {
        tracing::debug!(
            entity_id = %self.identity.entity_id,
            is_on = ?state.is_on,
            color_mode = ?state.color_mode,
            brightness = ?state.brightness,
            "publishing derived state"
        );
        let snapshot = state.to_snapshot(self.identity.entity_id.clone(), &self.name);
        self.store.set(snapshot).await
    }

    /// Withdraw the composite's snapshot from the store.
    ///
    /// # Errors
    ///
    /// Propagates state store failures.
    pub async fn remove_state(&self) -> Result<Option<StateSnapshot>, HubError> {
        self.store.remove(&self.identity.entity_id).await
    }

    /// React to a runtime event; republishes on changes of either source.
    ///
    /// Returns whether the event was relevant.
    ///
    /// # Errors
    ///
    /// Propagates state store failures.
    pub async fn handle_event(&self, event: &Event) -> Result<bool, HubError> {
        if !event.is_state_change_of(&[&self.switch_entity, &self.feature_entity]) {
            return Ok(false);
        }
        tracing::debug!(
            entity_id = %self.identity.entity_id,
            source = ?event.entity_id.as_ref().map(EntityId::as_str),
            "source changed"
        );
        self.write_state().await?;
        Ok(true)
    }

    /// Power the switch, then forward color/brightness options to the feature
    /// entity when there are any.
    ///
    /// # Errors
    ///
    /// Propagates failures from the service caller; nothing is retried.
    #[tracing::instrument(skip(self, options), fields(entity_id = %self.identity.entity_id))]
    pub async fn turn_on(&self, options: Map<String, Value>) -> Result<(), HubError> {
        self.caller
            .call(ServiceCall::new(service::TURN_ON, self.switch_entity.clone()))
            .await?;

        let data = feature_turn_on_data(&options);
        if data.is_empty() {
            tracing::debug!("no options for feature entity");
            return Ok(());
        }
        tracing::debug!(?data, feature = %self.feature_entity, "forwarding turn_on");
        self.caller
            .call(ServiceCall::new(service::TURN_ON, self.feature_entity.clone()).with_data(data))
            .await
    }

    /// Cut the switch. The feature entity is left alone; options are ignored.
    ///
    /// # Errors
    ///
    /// Propagates failures from the service caller.
    #[tracing::instrument(skip(self, options), fields(entity_id = %self.identity.entity_id))]
    pub async fn turn_off(&self, options: &Map<String, Value>) -> Result<(), HubError> {
        tracing::debug!(ignored = options.len(), "forwarding turn_off to switch");
        self.caller
            .call(ServiceCall::new(service::TURN_OFF, self.switch_entity.clone()))
            .await
    }

    /// Turn off when on, otherwise turn on with `options`.
    ///
    /// # Errors
    ///
    /// Propagates failures from the service caller.
    pub async fn toggle(&self, options: Map<String, Value>) -> Result<(), HubError> {
        if self.is_on() == Some(true) {
            self.turn_off(&options).await
        } else {
            self.turn_on(options).await
        }
    }

    /// Dispatch a service call addressed to this light.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnsupportedService`] for anything but
    /// `turn_on`, `turn_off` and `toggle`.
    pub async fn handle_service_call(&self, call: ServiceCall) -> Result<(), HubError> {
        match call.service.as_str() {
            service::TURN_ON => self.turn_on(call.data).await,
            service::TURN_OFF => self.turn_off(&call.data).await,
            service::TOGGLE => self.toggle(call.data).await,
            _ => Err(HubError::UnsupportedService {
                domain: call.domain,
                service: call.service,
            }),
        }
    }
}
