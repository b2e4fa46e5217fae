//! Collaborators the engine consumes from the host.
//!
//! The engine never owns the object graph. Every lookup goes through these
//! traits so resolution stays a function of the explicitly passed world.

mod memory;

use std::any::Any;

use crate::address::TypeName;

pub use memory::{MemoryWorld, SceneObject, WorldError};

/// Handle of one load of a scene. A reload yields a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentHandle(pub u64);

/// Anything that can own fields: a bare object or one of its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceRef {
    Object(ObjectHandle),
    Component(ComponentHandle),
}

impl From<ObjectHandle> for InstanceRef {
    fn from(handle: ObjectHandle) -> Self {
        Self::Object(handle)
    }
}

impl From<ComponentHandle> for InstanceRef {
    fn from(handle: ComponentHandle) -> Self {
        Self::Component(handle)
    }
}

/// Scene-loading orchestrator view.
pub trait SceneDirectory {
    fn is_scene_loaded(&self, scene_path: &str) -> bool;
    fn loaded_scene_handle(&self, scene_path: &str) -> Option<SceneHandle>;
}

/// Per-scene map from stable object identifiers to live handles.
pub trait IdentityRegistry {
    fn find_object_by_id(&self, scene: SceneHandle, object_id: &str) -> Option<ObjectHandle>;
}

/// Structural access to live instances.
pub trait ObjectGraph {
    fn contains(&self, instance: InstanceRef) -> bool;

    /// Registered type used for field lookup on the instance.
    fn instance_type(&self, instance: InstanceRef) -> Option<TypeName>;

    /// Components attached to `object`, in attachment order.
    fn components(&self, object: ObjectHandle) -> Vec<ComponentHandle>;

    fn instance(&self, instance: InstanceRef) -> Option<&dyn Any>;

    fn instance_mut(&mut self, instance: InstanceRef) -> Option<&mut dyn Any>;
}

pub trait World: SceneDirectory + IdentityRegistry + ObjectGraph {}

impl<T> World for T where T: SceneDirectory + IdentityRegistry + ObjectGraph + ?Sized {}
