//! Color modes a light can advertise and report.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which color representation a light is using.
///
/// Declaration order is the canonical priority order: when a light reports
/// no current mode, the first supported mode in this order is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Unknown,
    Onoff,
    Brightness,
    ColorTemp,
    Hs,
    Xy,
    Rgb,
    Rgbw,
    Rgbww,
    White,
}

impl ColorMode {
    /// Parse a single mode from an attribute value. Unrecognised strings
    /// yield `None`.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Parse a `supported_color_modes` list, skipping unrecognised entries.
    #[must_use]
    pub fn set_from_value(value: &serde_json::Value) -> BTreeSet<Self> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(Self::from_value).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Onoff => "onoff",
            Self::Brightness => "brightness",
            Self::ColorTemp => "color_temp",
            Self::Hs => "hs",
            Self::Xy => "xy",
            Self::Rgb => "rgb",
            Self::Rgbw => "rgbw",
            Self::Rgbww => "rgbww",
            Self::White => "white",
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
