//! Light vocabulary — color modes, feature flags and attribute keys.
//!
//! Attribute names follow the host runtime's light platform so snapshots
//! written by other integrations can be read as-is.

mod color_mode;
mod feature;

pub use color_mode::ColorMode;
pub use feature::LightEntityFeature;

/// Attribute keys found on light snapshots and in `turn_on` service data.
pub mod attr {
    pub const FRIENDLY_NAME: &str = "friendly_name";
    pub const SUPPORTED_COLOR_MODES: &str = "supported_color_modes";
    pub const SUPPORTED_FEATURES: &str = "supported_features";
    pub const COLOR_MODE: &str = "color_mode";
    pub const BRIGHTNESS: &str = "brightness";
    pub const COLOR_TEMP: &str = "color_temp";
    pub const COLOR_TEMP_KELVIN: &str = "color_temp_kelvin";
    pub const MIN_COLOR_TEMP_KELVIN: &str = "min_color_temp_kelvin";
    pub const MAX_COLOR_TEMP_KELVIN: &str = "max_color_temp_kelvin";
    pub const HS_COLOR: &str = "hs_color";
    pub const XY_COLOR: &str = "xy_color";
    pub const RGB_COLOR: &str = "rgb_color";
    pub const RGBW_COLOR: &str = "rgbw_color";
    pub const RGBWW_COLOR: &str = "rgbww_color";
    pub const EFFECT: &str = "effect";
    pub const EFFECT_LIST: &str = "effect_list";
    pub const ENTITY_ID: &str = "entity_id";
}

/// A color value tied to the mode that must be supported for it to be exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorAttribute {
    ColorTempKelvin,
    Hs,
    Xy,
    Rgb,
    Rgbw,
    Rgbww,
}

impl ColorAttribute {
    pub const ALL: [Self; 6] = [
        Self::ColorTempKelvin,
        Self::Hs,
        Self::Xy,
        Self::Rgb,
        Self::Rgbw,
        Self::Rgbww,
    ];

    /// The color mode gating this value.
    #[must_use]
    pub fn mode(self) -> ColorMode {
        match self {
            Self::ColorTempKelvin => ColorMode::ColorTemp,
            Self::Hs => ColorMode::Hs,
            Self::Xy => ColorMode::Xy,
            Self::Rgb => ColorMode::Rgb,
            Self::Rgbw => ColorMode::Rgbw,
            Self::Rgbww => ColorMode::Rgbww,
        }
    }

    /// The attribute key holding the value.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::ColorTempKelvin => attr::COLOR_TEMP_KELVIN,
            Self::Hs => attr::HS_COLOR,
            Self::Xy => attr::XY_COLOR,
            Self::Rgb => attr::RGB_COLOR,
            Self::Rgbw => attr::RGBW_COLOR,
            Self::Rgbww => attr::RGBWW_COLOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pair_each_color_attribute_with_its_mode() {
        assert_eq!(ColorAttribute::ColorTempKelvin.mode(), ColorMode::ColorTemp);
        assert_eq!(ColorAttribute::ColorTempKelvin.key(), "color_temp_kelvin");
        assert_eq!(ColorAttribute::Rgbww.mode(), ColorMode::Rgbww);
        assert_eq!(ColorAttribute::Rgbww.key(), "rgbww_color");
    }

    #[test]
    fn should_use_distinct_keys() {
        let keys: std::collections::HashSet<_> =
            ColorAttribute::ALL.iter().map(|a| a.key()).collect();
        assert_eq!(keys.len(), ColorAttribute::ALL.len());
    }
}
