//! Turning addresses into live targets and writing values through them.

mod mutator;
mod resolver;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{SlotKind, TypeName};
use crate::world::{ComponentHandle, InstanceRef, ObjectHandle};

pub use mutator::Mutator;
pub use resolver::Resolver;

/// Outcome of a resolve or write. Failures are reported, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    Succeeded,
    SceneIsNotOpen,
    InvalidObjectPath,
    ComponentNotFound,
    InvalidField,
    TypeMismatch,
    IndexOutOfRange,
    Unknown,
}

impl ResolveStatus {
    pub fn is_success(self) -> bool {
        self == Self::Succeeded
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::SceneIsNotOpen => "scene_is_not_open",
            Self::InvalidObjectPath => "invalid_object_path",
            Self::ComponentNotFound => "component_not_found",
            Self::InvalidField => "invalid_field",
            Self::TypeMismatch => "type_mismatch",
            Self::IndexOutOfRange => "index_out_of_range",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live location an address resolved to. Valid only until the world changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Object(ObjectHandle),
    Component(ComponentHandle),
    Field {
        owner: InstanceRef,
        /// Registered type of `owner`; the field may be declared on an ancestor.
        owner_type: TypeName,
        field: String,
        slot: SlotKind,
    },
}

impl ResolvedTarget {
    /// Instance that holds the target: the object, the component, or the field's owner.
    pub fn instance(&self) -> InstanceRef {
        match self {
            Self::Object(handle) => InstanceRef::Object(*handle),
            Self::Component(handle) => InstanceRef::Component(*handle),
            Self::Field { owner, .. } => *owner,
        }
    }
}

impl From<InstanceRef> for ResolvedTarget {
    fn from(instance: InstanceRef) -> Self {
        match instance {
            InstanceRef::Object(handle) => Self::Object(handle),
            InstanceRef::Component(handle) => Self::Component(handle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    status: ResolveStatus,
    target: Option<ResolvedTarget>,
    is_slot_empty: bool,
}

impl ResolutionResult {
    pub fn succeeded(target: ResolvedTarget, is_slot_empty: bool) -> Self {
        Self {
            status: ResolveStatus::Succeeded,
            target: Some(target),
            is_slot_empty,
        }
    }

    /// Failed result. Passing `Succeeded` here is treated as `Unknown`.
    pub fn failed(status: ResolveStatus) -> Self {
        let status = if status.is_success() {
            ResolveStatus::Unknown
        } else {
            status
        };
        Self {
            status,
            target: None,
            is_slot_empty: true,
        }
    }

    pub fn status(&self) -> ResolveStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn target(&self) -> Option<&ResolvedTarget> {
        self.target.as_ref()
    }

    /// Whether the resolved slot currently holds nothing. Always true on failure.
    pub fn is_slot_empty(&self) -> bool {
        self.is_slot_empty
    }
}
