//! Persisted variable/value address pairs and the facade that applies them.

mod linker;
mod set;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::address::Address;

pub use linker::{ApplyReport, BindingDiagnostic, ClearReport, Linker, LinkerConfig};
pub use set::{BindingDiff, BindingSet, BindingSetError};

/// Stable binding identity, generated once and kept across edits and reorders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(Ulid);

impl BindingId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BindingId {
    type Err = ulid::DecodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(value).map(Self)
    }
}

/// "Copy whatever `value` addresses into `variable`", with a stable id.
///
/// Two bindings are the same binding only when their ids match; equal
/// addresses never merge bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    id: BindingId,
    variable: Address,
    value: Address,
}

impl Binding {
    pub fn new(variable: Address, value: Address) -> Self {
        Self::with_id(BindingId::generate(), variable, value)
    }

    pub fn with_id(id: BindingId, variable: Address, value: Address) -> Self {
        Self {
            id,
            variable,
            value,
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn variable(&self) -> &Address {
        &self.variable
    }

    pub fn value(&self) -> &Address {
        &self.value
    }

    pub fn set_variable(&mut self, variable: Address) {
        self.variable = variable;
    }

    pub fn set_value(&mut self, value: Address) {
        self.value = value;
    }

    pub fn references_scene(&self, scene_path: &str) -> bool {
        self.variable.is_in_scene(scene_path) || self.value.is_in_scene(scene_path)
    }

    /// Same id and byte-for-byte identical addresses, `field_type` included.
    pub fn identical(&self, other: &Self) -> bool {
        self.id == other.id
            && self.variable.identical(&other.variable)
            && self.value.identical(&other.value)
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.identical(other)
    }
}

impl Eq for Binding {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::I32;

    fn health_binding() -> Binding {
        Binding::new(
            Address::object("levels/arena.scene", "guid-42").with_field("health"),
            Address::object("levels/hub.scene", "config").with_field("start_health"),
        )
    }

    #[test]
    fn edits_keep_the_generated_id() {
        let mut binding = health_binding();
        let id = binding.id();
        binding.set_value(Address::object("levels/hub.scene", "other"));
        binding.set_variable(
            Address::object("levels/arena.scene", "guid-42")
                .with_field("health")
                .with_field_type(I32),
        );
        assert_eq!(binding.id(), id);
    }

    #[test]
    fn equal_addresses_do_not_make_equal_bindings() {
        let first = health_binding();
        let second = Binding::new(first.variable().clone(), first.value().clone());
        assert_ne!(first.id(), second.id());
        assert_ne!(first, second);
    }

    #[test]
    fn serializes_as_id_variable_value() {
        let binding = health_binding();
        let json = serde_json::to_value(&binding).expect("serialize");
        let object = json.as_object().expect("object");
        let mut keys = object.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "value", "variable"]);
        assert_eq!(object["id"].as_str().map(str::len), Some(26));

        let decoded: Binding = serde_json::from_value(json).expect("deserialize");
        assert_eq!(decoded, binding);
    }

    #[test]
    fn ids_parse_from_their_display_form() {
        let id = BindingId::generate();
        let parsed: BindingId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
        assert!("not-a-ulid".parse::<BindingId>().is_err());
    }

    #[test]
    fn scene_membership_checks_both_sides() {
        let binding = health_binding();
        assert!(binding.references_scene("levels/arena.scene"));
        assert!(binding.references_scene("levels/hub.scene"));
        assert!(!binding.references_scene("levels/other.scene"));
    }
}
