//! Serializable addresses naming a value slot inside a (possibly unloaded) scene.

mod type_name;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use type_name::{TypeName, BOOL, COMPONENT, F32, F64, I32, I64, OBJECT, STRING};

/// Sub-location inside the addressed field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SlotKind {
    #[default]
    None,
    ArrayElement(u32),
    EventListener(u32),
}

impl SlotKind {
    pub fn index(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::ArrayElement(index) | Self::EventListener(index) => Some(index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("slot {slot:?} requires a field name")]
    SlotWithoutField { slot: SlotKind },
}

/// Where a value lives: scene, object, optional component, optional field, optional slot.
///
/// Equality and hashing cover every part except `field_type`, which is an
/// authoring-time expectation rather than part of the location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "AddressRecord", try_from = "AddressRecord")]
pub struct Address {
    scene_path: String,
    object_id: String,
    component_type: Option<TypeName>,
    component_index: u32,
    field_name: Option<String>,
    field_type: Option<TypeName>,
    slot: SlotKind,
}

impl Address {
    pub fn object(scene_path: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            scene_path: scene_path.into(),
            object_id: object_id.into(),
            component_type: None,
            component_index: 0,
            field_name: None,
            field_type: None,
            slot: SlotKind::None,
        }
    }

    pub fn with_component(mut self, component_type: impl Into<TypeName>, index: u32) -> Self {
        self.component_type = Some(component_type.into());
        self.component_index = index;
        self
    }

    pub fn with_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_field_type(mut self, field_type: impl Into<TypeName>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn with_slot(mut self, slot: SlotKind) -> Result<Self, AddressError> {
        if slot != SlotKind::None && self.field_name.is_none() {
            return Err(AddressError::SlotWithoutField { slot });
        }
        self.slot = slot;
        Ok(self)
    }

    pub fn scene_path(&self) -> &str {
        &self.scene_path
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn component_type(&self) -> Option<&TypeName> {
        self.component_type.as_ref()
    }

    pub fn component_index(&self) -> u32 {
        self.component_index
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    pub fn field_type(&self) -> Option<&TypeName> {
        self.field_type.as_ref()
    }

    pub fn slot(&self) -> SlotKind {
        self.slot
    }

    pub fn is_in_scene(&self, scene_path: &str) -> bool {
        self.scene_path == scene_path
    }

    /// Strict comparison that also includes `field_type`.
    pub fn identical(&self, other: &Self) -> bool {
        self == other && self.field_type == other.field_type
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.scene_path == other.scene_path
            && self.object_id == other.object_id
            && self.component_type == other.component_type
            && self.component_index == other.component_index
            && self.field_name == other.field_name
            && self.slot == other.slot
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scene_path.hash(state);
        self.object_id.hash(state);
        self.component_type.hash(state);
        self.component_index.hash(state);
        self.field_name.hash(state);
        self.slot.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.scene_path, self.object_id)?;
        if let Some(component_type) = &self.component_type {
            write!(f, "/{}[{}]", component_type, self.component_index)?;
        }
        if let Some(field_name) = &self.field_name {
            write!(f, ".{field_name}")?;
            if let Some(field_type) = &self.field_type {
                write!(f, ":{field_type}")?;
            }
        }
        match self.slot {
            SlotKind::None => Ok(()),
            SlotKind::ArrayElement(index) => write!(f, "[{index}]"),
            SlotKind::EventListener(index) => write!(f, "<{index}>"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SlotTag {
    #[default]
    None,
    ArrayElement,
    EventListener,
}

/// Flat on-disk layout of an [`Address`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AddressRecord {
    scene_path: String,
    object_id: String,
    #[serde(default)]
    component_type: Option<TypeName>,
    #[serde(default)]
    component_index: u32,
    #[serde(default)]
    field_name: Option<String>,
    #[serde(default)]
    field_type: Option<TypeName>,
    #[serde(default)]
    slot_kind: SlotTag,
    #[serde(default)]
    slot_index: u32,
}

impl From<Address> for AddressRecord {
    fn from(address: Address) -> Self {
        let (slot_kind, slot_index) = match address.slot {
            SlotKind::None => (SlotTag::None, 0),
            SlotKind::ArrayElement(index) => (SlotTag::ArrayElement, index),
            SlotKind::EventListener(index) => (SlotTag::EventListener, index),
        };
        Self {
            scene_path: address.scene_path,
            object_id: address.object_id,
            component_type: address.component_type,
            component_index: address.component_index,
            field_name: address.field_name,
            field_type: address.field_type,
            slot_kind,
            slot_index,
        }
    }
}

impl TryFrom<AddressRecord> for Address {
    type Error = AddressError;

    fn try_from(record: AddressRecord) -> Result<Self, Self::Error> {
        let slot = match record.slot_kind {
            SlotTag::None => SlotKind::None,
            SlotTag::ArrayElement => SlotKind::ArrayElement(record.slot_index),
            SlotTag::EventListener => SlotKind::EventListener(record.slot_index),
        };
        let component_index = if record.component_type.is_some() {
            record.component_index
        } else {
            0
        };
        let address = Self {
            scene_path: record.scene_path,
            object_id: record.object_id,
            component_type: record.component_type,
            component_index,
            field_name: record.field_name,
            field_type: record.field_type,
            slot: SlotKind::None,
        };
        address.with_slot(slot)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of(address: &Address) -> u64 {
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        hasher.finish()
    }

    fn arena_health() -> Address {
        Address::object("levels/arena.scene", "guid-42")
            .with_field("health")
            .with_field_type(I32)
    }

    #[test]
    fn slot_requires_field_name() {
        let err = Address::object("a.scene", "obj")
            .with_slot(SlotKind::ArrayElement(1))
            .expect_err("slot without field");
        assert_eq!(
            err,
            AddressError::SlotWithoutField {
                slot: SlotKind::ArrayElement(1)
            }
        );

        let ok = Address::object("a.scene", "obj")
            .with_field("items")
            .with_slot(SlotKind::ArrayElement(1))
            .expect("slot with field");
        assert_eq!(ok.slot(), SlotKind::ArrayElement(1));
    }

    #[test]
    fn equality_and_hash_ignore_field_type() {
        let typed = arena_health();
        let retyped = Address::object("levels/arena.scene", "guid-42")
            .with_field("health")
            .with_field_type(I64);
        let untyped = Address::object("levels/arena.scene", "guid-42").with_field("health");

        assert_eq!(typed, retyped);
        assert_eq!(typed, untyped);
        assert_eq!(hash_of(&typed), hash_of(&retyped));
        assert_eq!(hash_of(&typed), hash_of(&untyped));
        assert!(!typed.identical(&retyped));
        assert!(typed.identical(&arena_health()));
    }

    #[test]
    fn equality_covers_component_and_slot() {
        let base = Address::object("a.scene", "obj").with_component("Health", 0);
        assert_ne!(base, base.clone().with_component("Health", 1));
        assert_ne!(base, base.clone().with_component("Armor", 0));

        let first = base
            .clone()
            .with_field("hooks")
            .with_slot(SlotKind::EventListener(0))
            .expect("slot");
        let element = base
            .with_field("hooks")
            .with_slot(SlotKind::ArrayElement(0))
            .expect("slot");
        assert_ne!(first, element);
    }

    #[test]
    fn display_renders_readable_path() {
        let address = Address::object("levels/arena.scene", "guid-7")
            .with_component("Portal", 1)
            .with_field("waypoints")
            .with_field_type(OBJECT)
            .with_slot(SlotKind::ArrayElement(2))
            .expect("slot");
        assert_eq!(
            address.to_string(),
            "levels/arena.scene#guid-7/Portal[1].waypoints:object[2]"
        );

        let listener = Address::object("hub.scene", "door")
            .with_field("on_open")
            .with_slot(SlotKind::EventListener(0))
            .expect("slot");
        assert_eq!(listener.to_string(), "hub.scene#door.on_open<0>");
        assert_eq!(arena_health().to_string(), "levels/arena.scene#guid-42.health:i32");
    }

    #[test]
    fn persisted_layout_is_a_flat_record() {
        let address = Address::object("levels/arena.scene", "guid-7")
            .with_component("Portal", 1)
            .with_field("on_enter")
            .with_slot(SlotKind::EventListener(3))
            .expect("slot");
        let json = serde_json::to_value(&address).expect("encode");
        assert_eq!(
            json,
            serde_json::json!({
                "scene_path": "levels/arena.scene",
                "object_id": "guid-7",
                "component_type": "Portal",
                "component_index": 1,
                "field_name": "on_enter",
                "field_type": null,
                "slot_kind": "event_listener",
                "slot_index": 3
            })
        );

        let decoded: Address = serde_json::from_value(json).expect("decode");
        assert!(decoded.identical(&address));
    }

    #[test]
    fn decoding_rejects_slot_without_field() {
        let raw = r#"{
            "scene_path": "a.scene",
            "object_id": "x",
            "slot_kind": "array_element",
            "slot_index": 2
        }"#;
        let err = serde_json::from_str::<Address>(raw).expect_err("invalid");
        assert!(err.to_string().contains("requires a field name"));
    }

    #[test]
    fn decoding_normalizes_component_index_without_component() {
        let raw = r#"{"scene_path":"a.scene","object_id":"x","component_index":4}"#;
        let decoded: Address = serde_json::from_str(raw).expect("decode");
        assert_eq!(decoded.component_index(), 0);
        assert_eq!(decoded, Address::object("a.scene", "x"));
    }
}
