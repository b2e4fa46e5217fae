use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::address::{Address, SlotKind};

use super::{Binding, BindingId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingSetError {
    #[error("binding id {0} appears more than once")]
    DuplicateId(BindingId),
}

/// Ordered bindings keyed by id. Serialized as a plain list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Binding>", into = "Vec<Binding>")]
pub struct BindingSet {
    bindings: Vec<Binding>,
}

/// Id-level differences between two binding sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDiff {
    pub added: Vec<BindingId>,
    pub removed: Vec<BindingId>,
    pub changed: Vec<BindingId>,
}

impl BindingDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.id() == id)
    }

    /// Appends `binding`, or replaces the binding with the same id in place.
    pub fn insert(&mut self, binding: Binding) -> Option<Binding> {
        match self.position(binding.id()) {
            Some(index) => Some(std::mem::replace(&mut self.bindings[index], binding)),
            None => {
                self.bindings.push(binding);
                None
            }
        }
    }

    pub fn remove(&mut self, id: BindingId) -> Option<Binding> {
        let index = self.position(id)?;
        Some(self.bindings.remove(index))
    }

    /// Bindings with either side in `scene_path`, in set order.
    pub fn referencing_scene<'a>(
        &'a self,
        scene_path: &'a str,
    ) -> impl Iterator<Item = &'a Binding> + 'a {
        self.bindings
            .iter()
            .filter(move |binding| binding.references_scene(scene_path))
    }

    /// What changed going from `self` to `newer`, each list in id order.
    pub fn diff(&self, newer: &BindingSet) -> BindingDiff {
        let before = self.by_id();
        let after = newer.by_id();
        let mut diff = BindingDiff::default();
        for (id, binding) in &after {
            match before.get(id) {
                None => diff.added.push(*id),
                Some(previous) if !previous.identical(binding) => diff.changed.push(*id),
                Some(_) => {}
            }
        }
        diff.removed = before
            .keys()
            .filter(|id| !after.contains_key(*id))
            .copied()
            .collect();
        diff
    }

    /// SHA-256 over every binding in id order, so reordering keeps the fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (id, binding) in self.by_id() {
            hasher.update(id.to_string().as_bytes());
            hasher.update([0u8]);
            hash_address(&mut hasher, binding.variable());
            hash_address(&mut hasher, binding.value());
        }
        to_hex_lower(&hasher.finalize())
    }

    fn position(&self, id: BindingId) -> Option<usize> {
        self.bindings.iter().position(|binding| binding.id() == id)
    }

    fn by_id(&self) -> BTreeMap<BindingId, &Binding> {
        self.bindings
            .iter()
            .map(|binding| (binding.id(), binding))
            .collect()
    }
}

impl TryFrom<Vec<Binding>> for BindingSet {
    type Error = BindingSetError;

    fn try_from(bindings: Vec<Binding>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(bindings.len());
        for binding in &bindings {
            if !seen.insert(binding.id()) {
                return Err(BindingSetError::DuplicateId(binding.id()));
            }
        }
        Ok(Self { bindings })
    }
}

impl From<BindingSet> for Vec<Binding> {
    fn from(set: BindingSet) -> Self {
        set.bindings
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

fn hash_address(hasher: &mut Sha256, address: &Address) {
    let component_index = address.component_index().to_string();
    let slot_kind = match address.slot() {
        SlotKind::None => "none",
        SlotKind::ArrayElement(_) => "array_element",
        SlotKind::EventListener(_) => "event_listener",
    };
    let slot_index = address.slot().index().unwrap_or(0).to_string();
    let parts = [
        address.scene_path(),
        address.object_id(),
        address.component_type().map_or("", |name| name.as_str()),
        component_index.as_str(),
        address.field_name().unwrap_or(""),
        address.field_type().map_or("", |name| name.as_str()),
        slot_kind,
        slot_index.as_str(),
    ];
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}
