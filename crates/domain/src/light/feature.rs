//! Optional light capabilities advertised through `supported_features`.

bitflags::bitflags! {
    /// Feature bit-set, numbered like the host runtime's light platform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LightEntityFeature: u32 {
        const EFFECT = 4;
        const FLASH = 8;
        const TRANSITION = 32;
    }
}

impl LightEntityFeature {
    /// Read a `supported_features` attribute. Bits this crate does not name
    /// are kept so the value passes through unchanged; anything that is not
    /// a non-negative integer reads as no features.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        value
            .as_u64()
            .and_then(|bits| u32::try_from(bits).ok())
            .map(Self::from_bits_retain)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_read_effect_bit() {
        let features = LightEntityFeature::from_value(&json!(44));
        assert!(features.contains(LightEntityFeature::EFFECT));
        assert!(features.contains(LightEntityFeature::FLASH));
        assert!(features.contains(LightEntityFeature::TRANSITION));
    }

    #[test]
    fn should_retain_unnamed_bits() {
        let features = LightEntityFeature::from_value(&json!(5));
        assert_eq!(features.bits(), 5);
    }

    #[test]
    fn should_read_garbage_as_empty() {
        assert!(LightEntityFeature::from_value(&json!("effect")).is_empty());
        assert!(LightEntityFeature::from_value(&json!(-1)).is_empty());
    }
}
