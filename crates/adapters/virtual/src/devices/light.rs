//! Virtual light — a dimmable, color-capable bulb.
//!
//! `turn_on` applies brightness, color temperature, `hs`/`rgb`/`xy` colors
//! and effects from the call data. A color only takes effect when its mode is
//! supported, and the last color applied becomes the active `color_mode`.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use duolight_app::light::LightState;
use duolight_domain::entity::{EntityId, StateSnapshot};
use duolight_domain::error::HubError;
use duolight_domain::light::{ColorAttribute, ColorMode, LightEntityFeature, attr};
use duolight_domain::service;

const DEFAULT_BRIGHTNESS: u8 = 255;

#[derive(Debug, Clone)]
struct LightData {
    is_on: bool,
    brightness: u8,
    color_mode: ColorMode,
    color: Option<(ColorAttribute, Value)>,
    effect: Option<String>,
}

/// A simulated light with configurable capabilities.
pub struct VirtualLight {
    entity_id: EntityId,
    name: String,
    color_modes: BTreeSet<ColorMode>,
    features: LightEntityFeature,
    effects: Vec<String>,
    kelvin_range: (u32, u32),
    data: Mutex<LightData>,
}

impl VirtualLight {
    pub const DEMO_ENTITY_ID: &str = "light.virtual_bulb";

    /// The demo bulb, `light.virtual_bulb`: color temperature plus `hs`,
    /// `rgb` and `xy` colors, with a couple of effects.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the demo id does not parse.
    pub fn demo() -> Result<Self, HubError> {
        Ok(Self::new(EntityId::parse(Self::DEMO_ENTITY_ID)?, "Virtual Bulb")
            .with_color_modes([ColorMode::ColorTemp, ColorMode::Hs, ColorMode::Rgb, ColorMode::Xy])
            .with_effects(["colorloop", "candle"])
            .with_kelvin_range(2000, 6500)
            .with_features(LightEntityFeature::EFFECT | LightEntityFeature::TRANSITION))
    }

    /// A plain dimmable light, off.
    #[must_use]
    pub fn new(entity_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            entity_id,
            name: name.into(),
            color_modes: BTreeSet::from([ColorMode::Brightness]),
            features: LightEntityFeature::empty(),
            effects: Vec::new(),
            kelvin_range: (2000, 6500),
            data: Mutex::new(LightData {
                is_on: false,
                brightness: DEFAULT_BRIGHTNESS,
                color_mode: ColorMode::Brightness,
                color: None,
                effect: None,
            }),
        }
    }

    /// Replace the supported color modes; the first becomes the active mode.
    #[must_use]
    pub fn with_color_modes(mut self, modes: impl IntoIterator<Item = ColorMode>) -> Self {
        self.color_modes = modes.into_iter().collect();
        if let Some(first) = self.color_modes.first() {
            self.lock_data_mut().color_mode = *first;
        }
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: LightEntityFeature) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub fn with_effects<I, E>(mut self, effects: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        self.effects = effects.into_iter().map(Into::into).collect();
        self
    }

    /// Bounds color temperatures are clamped to, in either order.
    #[must_use]
    pub fn with_kelvin_range(mut self, min: u32, max: u32) -> Self {
        self.kelvin_range = (min.min(max), min.max(max));
        self
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Current snapshot of the light. Brightness, color and effect are only
    /// reported while the light is on.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let data = self.lock_data_mut().clone();
        let has_effects = self.features.contains(LightEntityFeature::EFFECT);
        let supports_kelvin = self.color_modes.contains(&ColorMode::ColorTemp);
        let state = LightState {
            is_on: Some(data.is_on),
            supported_color_modes: Some(self.color_modes.clone()),
            supported_features: Some(self.features),
            color_mode: data.is_on.then_some(data.color_mode),
            brightness: data.is_on.then_some(data.brightness),
            colors: data
                .color
                .filter(|_| data.is_on)
                .into_iter()
                .collect(),
            effect_list: has_effects.then(|| self.effects.clone()),
            effect: data.effect.filter(|_| data.is_on && has_effects),
            min_color_temp_kelvin: supports_kelvin.then(|| self.kelvin_range.0.into()),
            max_color_temp_kelvin: supports_kelvin.then(|| self.kelvin_range.1.into()),
        };
        state.to_snapshot(self.entity_id.clone(), &self.name)
    }

    /// Handle a service call, returning the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnsupportedService`] for anything but
    /// `turn_on`, `turn_off` and `toggle`.
    pub fn handle_service(
        &self,
        service: &str,
        data: &Map<String, Value>,
    ) -> Result<StateSnapshot, HubError> {
        {
            let mut state = self.lock_data_mut();
            match service {
                service::TURN_ON => self.apply_turn_on(&mut state, data),
                service::TURN_OFF => state.is_on = false,
                service::TOGGLE if state.is_on => state.is_on = false,
                service::TOGGLE => self.apply_turn_on(&mut state, data),
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

    fn apply_turn_on(&self, state: &mut LightData, data: &Map<String, Value>) {
        state.is_on = true;

        if let Some(value) = data.get(attr::BRIGHTNESS) {
            match value.as_u64() {
                Some(brightness) => {
                    state.brightness = u8::try_from(brightness).unwrap_or(u8::MAX);
                }
                None => tracing::warn!(entity_id = %self.entity_id, %value, "ignoring invalid brightness"),
            }
        }

        if let Some(value) = data.get(attr::COLOR_TEMP_KELVIN) {
            match value.as_u64().and_then(|k| u32::try_from(k).ok()) {
                Some(kelvin) => {
                    let (min, max) = self.kelvin_range;
                    self.set_color(state, ColorAttribute::ColorTempKelvin, kelvin.clamp(min, max).into());
                }
                None => tracing::warn!(entity_id = %self.entity_id, %value, "ignoring invalid color temperature"),
            }
        }

        for (color, len) in [(ColorAttribute::Hs, 2), (ColorAttribute::Rgb, 3), (ColorAttribute::Xy, 2)] {
            let Some(value) = data.get(color.key()) else {
                continue;
            };
            if value.as_array().is_some_and(|parts| parts.len() == len && parts.iter().all(Value::is_number)) {
                self.set_color(state, color, value.clone());
            } else {
                tracing::warn!(entity_id = %self.entity_id, key = color.key(), %value, "ignoring invalid color");
            }
        }

        if let Some(effect) = data.get(attr::EFFECT).and_then(Value::as_str) {
            if self.features.contains(LightEntityFeature::EFFECT)
                && self.effects.iter().any(|e| e == effect)
            {
                state.effect = Some(effect.to_string());
            } else {
                tracing::debug!(entity_id = %self.entity_id, effect, "unsupported effect");
            }
        }
    }

    fn set_color(&self, state: &mut LightData, color: ColorAttribute, value: Value) {
        if !self.color_modes.contains(&color.mode()) {
            tracing::debug!(entity_id = %self.entity_id, mode = %color.mode(), "color mode not supported");
            return;
        }
        state.color_mode = color.mode();
        state.color = Some((color, value));
    }

    fn lock_data_mut(&self) -> MutexGuard<'_, LightData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolight_domain::entity::EntityState;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn should_default_to_off_without_brightness() {
        let light = VirtualLight::demo().unwrap();
        let snapshot = light.snapshot();
        assert_eq!(snapshot.state, EntityState::Off);
        assert_eq!(snapshot.attribute(attr::BRIGHTNESS), None);
        assert_eq!(snapshot.attribute(attr::COLOR_MODE), None);
        assert_eq!(
            snapshot.attribute(attr::SUPPORTED_COLOR_MODES),
            Some(&json!(["color_temp", "hs", "xy", "rgb"]))
        );
        assert_eq!(snapshot.attribute(attr::SUPPORTED_FEATURES), Some(&json!(36)));
        assert_eq!(snapshot.attribute(attr::MIN_COLOR_TEMP_KELVIN), Some(&json!(2000)));
    }

    #[test]
    fn should_turn_on_with_default_brightness() {
        let light = VirtualLight::demo().unwrap();
        let snapshot = light.handle_service("turn_on", &Map::new()).unwrap();
        assert_eq!(snapshot.state, EntityState::On);
        assert_eq!(snapshot.attribute(attr::BRIGHTNESS), Some(&json!(255)));
        assert_eq!(snapshot.attribute(attr::COLOR_MODE), Some(&json!("color_temp")));
    }

    #[test]
    fn should_apply_brightness() {
        let light = VirtualLight::demo().unwrap();
        let snapshot = light
            .handle_service("turn_on", &data(json!({"brightness": 128})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::BRIGHTNESS), Some(&json!(128)));
    }

    #[test]
    fn should_switch_color_mode_with_last_color() {
        let light = VirtualLight::demo().unwrap();
        let snapshot = light
            .handle_service("turn_on", &data(json!({"rgb_color": [255, 0, 0]})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::COLOR_MODE), Some(&json!("rgb")));
        assert_eq!(snapshot.attribute(attr::RGB_COLOR), Some(&json!([255, 0, 0])));

        let snapshot = light
            .handle_service("turn_on", &data(json!({"color_temp_kelvin": 9000})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::COLOR_MODE), Some(&json!("color_temp")));
        assert_eq!(snapshot.attribute(attr::COLOR_TEMP_KELVIN), Some(&json!(6500)));
        assert_eq!(snapshot.attribute(attr::RGB_COLOR), None);
    }

    #[test]
    fn should_clamp_color_temperature_to_configured_range() {
        let light = VirtualLight::demo().unwrap().with_kelvin_range(6000, 2700);
        assert_eq!(light.snapshot().attribute(attr::MIN_COLOR_TEMP_KELVIN), Some(&json!(2700)));
        assert_eq!(light.snapshot().attribute(attr::MAX_COLOR_TEMP_KELVIN), Some(&json!(6000)));

        let snapshot = light
            .handle_service("turn_on", &data(json!({"color_temp_kelvin": 2000})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::COLOR_TEMP_KELVIN), Some(&json!(2700)));
    }

    #[test]
    fn should_ignore_unsupported_color() {
        let light = VirtualLight::demo()
            .unwrap()
            .with_color_modes([ColorMode::Hs]);
        let snapshot = light
            .handle_service("turn_on", &data(json!({"rgb_color": [1, 2, 3]})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::COLOR_MODE), Some(&json!("hs")));
        assert_eq!(snapshot.attribute(attr::RGB_COLOR), None);
    }

    #[test]
    fn should_ignore_malformed_color() {
        let light = VirtualLight::demo().unwrap();
        let snapshot = light
            .handle_service("turn_on", &data(json!({"hs_color": [10.0]})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::HS_COLOR), None);
    }

    #[test]
    fn should_apply_listed_effect_only() {
        let light = VirtualLight::demo().unwrap();
        let snapshot = light
            .handle_service("turn_on", &data(json!({"effect": "strobe"})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::EFFECT), None);

        let snapshot = light
            .handle_service("turn_on", &data(json!({"effect": "candle"})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::EFFECT), Some(&json!("candle")));
        assert_eq!(
            snapshot.attribute(attr::EFFECT_LIST),
            Some(&json!(["colorloop", "candle"]))
        );
    }

    #[test]
    fn should_not_expose_effects_without_feature() {
        let light = VirtualLight::new(EntityId::parse("light.plain").unwrap(), "Plain")
            .with_effects(["candle"]);
        let snapshot = light
            .handle_service("turn_on", &data(json!({"effect": "candle"})))
            .unwrap();
        assert_eq!(snapshot.attribute(attr::EFFECT), None);
        assert_eq!(snapshot.attribute(attr::EFFECT_LIST), None);
    }

    #[test]
    fn should_keep_settings_across_off_and_on() {
        let light = VirtualLight::demo().unwrap();
        light
            .handle_service("turn_on", &data(json!({"brightness": 40})))
            .unwrap();
        light.handle_service("turn_off", &Map::new()).unwrap();
        let snapshot = light.handle_service("toggle", &Map::new()).unwrap();
        assert_eq!(snapshot.state, EntityState::On);
        assert_eq!(snapshot.attribute(attr::BRIGHTNESS), Some(&json!(40)));
    }

    #[test]
    fn should_reject_unknown_service() {
        let light = VirtualLight::demo().unwrap();
        let err = light.handle_service("set_color", &Map::new()).unwrap_err();
        assert!(matches!(
            err,
            HubError::UnsupportedService { ref domain, ref service }
                if domain == "light" && service == "set_color"
        ));
    }
}
