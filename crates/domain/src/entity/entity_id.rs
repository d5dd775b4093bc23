//! Entity identifier — `<domain>.<object_id>`, e.g. `light.kitchen`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Validated `<domain>.<object_id>` identifier.
///
/// Both parts are non-empty, made of lowercase ASCII letters, digits and
/// underscores, and neither starts nor ends with an underscore. Double
/// underscores are rejected anywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Parse and validate an entity id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEntityId`] when `value` does not
    /// follow the `<domain>.<object_id>` syntax.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        match check(&value) {
            Ok(()) => Ok(Self(value)),
            Err(reason) => Err(ValidationError::InvalidEntityId { value, reason }),
        }
    }

    /// Build an id in `domain` from arbitrary text, slugifying it first.
    ///
    /// `("light", "switch.relay_light.bulb_dual")` gives
    /// `light.switch_relay_light_bulb_dual`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEntityId`] when `domain` is invalid
    /// or `raw` contains nothing usable.
    pub fn from_slug(domain: &str, raw: &str) -> Result<Self, ValidationError> {
        Self::parse(format!("{domain}.{}", slugify(raw)))
    }

    /// The part before the dot (`light`, `switch`, …).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(d, _)| d)
    }

    /// The part after the dot.
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.0.split_once('.').map_or("", |(_, o)| o)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check(value: &str) -> Result<(), &'static str> {
    let Some((domain, object_id)) = value.split_once('.') else {
        return Err("missing '.' between domain and object id");
    };
    if object_id.contains('.') {
        return Err("more than one '.'");
    }
    if value.contains("__") {
        return Err("double underscores are not allowed");
    }
    check_part(domain)?;
    check_part(object_id)
}

fn check_part(part: &str) -> Result<(), &'static str> {
    if part.is_empty() {
        return Err("domain and object id must not be empty");
    }
    if !part
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err("only lowercase letters, digits and underscores are allowed");
    }
    if part.starts_with('_') || part.ends_with('_') {
        return Err("must not start or end with an underscore");
    }
    Ok(())
}

fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
