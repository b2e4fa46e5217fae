use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::address::{TypeName, OBJECT};

use super::{
    ComponentHandle, IdentityRegistry, InstanceRef, ObjectGraph, ObjectHandle, SceneDirectory,
    SceneHandle,
};

/// Payload of a plain object that carries no custom type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub active: bool,
}

impl SceneObject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("scene is not loaded: {scene_path}")]
    SceneNotLoaded { scene_path: String },
    #[error("object id '{object_id}' already exists in scene {scene_path}")]
    DuplicateObjectId {
        scene_path: String,
        object_id: String,
    },
    #[error("object {0:?} does not exist")]
    MissingObject(ObjectHandle),
}

struct LoadedScene {
    handle: SceneHandle,
    objects_by_id: HashMap<String, ObjectHandle>,
}

struct ObjectRecord {
    scene_path: String,
    object_id: String,
    type_name: TypeName,
    data: Box<dyn Any>,
    components: Vec<ComponentHandle>,
}

struct ComponentRecord {
    owner: ObjectHandle,
    type_name: TypeName,
    data: Box<dyn Any>,
}

/// In-memory scene graph implementing every collaborator trait.
#[derive(Default)]
pub struct MemoryWorld {
    scenes: HashMap<String, LoadedScene>,
    objects: HashMap<ObjectHandle, ObjectRecord>,
    components: HashMap<ComponentHandle, ComponentRecord>,
    next_scene: u32,
    next_object: u64,
    next_component: u64,
}

impl fmt::Debug for MemoryWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryWorld")
            .field("loaded_scenes", &self.loaded_scenes())
            .field("object_count", &self.objects.len())
            .field("component_count", &self.components.len())
            .finish()
    }
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a scene loaded. Loading an already loaded scene keeps its handle.
    pub fn load_scene(&mut self, scene_path: &str) -> SceneHandle {
        if let Some(scene) = self.scenes.get(scene_path) {
            return scene.handle;
        }
        let handle = SceneHandle(self.next_scene);
        self.next_scene = self.next_scene.saturating_add(1);
        self.scenes.insert(
            scene_path.to_string(),
            LoadedScene {
                handle,
                objects_by_id: HashMap::new(),
            },
        );
        debug!(scene = scene_path, handle = handle.0, "memory_world_scene_loaded");
        handle
    }

    /// Unloads a scene and destroys every object it contains.
    pub fn unload_scene(&mut self, scene_path: &str) -> bool {
        let Some(scene) = self.scenes.remove(scene_path) else {
            return false;
        };
        let destroyed = scene.objects_by_id.len();
        for object in scene.objects_by_id.into_values() {
            self.remove_object_record(object);
        }
        debug!(
            scene = scene_path,
            destroyed_objects = destroyed,
            "memory_world_scene_unloaded"
        );
        true
    }

    pub fn loaded_scenes(&self) -> Vec<&str> {
        let mut scenes = self.scenes.keys().map(String::as_str).collect::<Vec<_>>();
        scenes.sort_unstable();
        scenes
    }

    pub fn spawn_object(
        &mut self,
        scene_path: &str,
        object_id: &str,
        name: &str,
    ) -> Result<ObjectHandle, WorldError> {
        self.spawn_object_with(scene_path, object_id, OBJECT, SceneObject::named(name))
    }

    pub fn spawn_object_with<T: Any>(
        &mut self,
        scene_path: &str,
        object_id: &str,
        type_name: impl Into<TypeName>,
        data: T,
    ) -> Result<ObjectHandle, WorldError> {
        let Some(scene) = self.scenes.get_mut(scene_path) else {
            return Err(WorldError::SceneNotLoaded {
                scene_path: scene_path.to_string(),
            });
        };
        if scene.objects_by_id.contains_key(object_id) {
            return Err(WorldError::DuplicateObjectId {
                scene_path: scene_path.to_string(),
                object_id: object_id.to_string(),
            });
        }

        let handle = ObjectHandle(self.next_object);
        self.next_object = self.next_object.saturating_add(1);
        scene.objects_by_id.insert(object_id.to_string(), handle);
        self.objects.insert(
            handle,
            ObjectRecord {
                scene_path: scene_path.to_string(),
                object_id: object_id.to_string(),
                type_name: type_name.into(),
                data: Box::new(data),
                components: Vec::new(),
            },
        );
        Ok(handle)
    }

    pub fn attach_component<T: Any>(
        &mut self,
        object: ObjectHandle,
        type_name: impl Into<TypeName>,
        data: T,
    ) -> Result<ComponentHandle, WorldError> {
        let Some(record) = self.objects.get_mut(&object) else {
            return Err(WorldError::MissingObject(object));
        };
        let handle = ComponentHandle(self.next_component);
        self.next_component = self.next_component.saturating_add(1);
        record.components.push(handle);
        self.components.insert(
            handle,
            ComponentRecord {
                owner: object,
                type_name: type_name.into(),
                data: Box::new(data),
            },
        );
        Ok(handle)
    }

    pub fn destroy_object(&mut self, object: ObjectHandle) -> bool {
        let Some(record) = self.objects.get(&object) else {
            return false;
        };
        if let Some(scene) = self.scenes.get_mut(&record.scene_path) {
            scene.objects_by_id.remove(&record.object_id);
        }
        self.remove_object_record(object);
        true
    }

    pub fn destroy_component(&mut self, component: ComponentHandle) -> bool {
        let Some(record) = self.components.remove(&component) else {
            return false;
        };
        if let Some(owner) = self.objects.get_mut(&record.owner) {
            owner.components.retain(|handle| *handle != component);
        }
        true
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_id(&self, object: ObjectHandle) -> Option<&str> {
        self.objects
            .get(&object)
            .map(|record| record.object_id.as_str())
    }

    pub fn object_scene(&self, object: ObjectHandle) -> Option<&str> {
        self.objects
            .get(&object)
            .map(|record| record.scene_path.as_str())
    }

    pub fn component_owner(&self, component: ComponentHandle) -> Option<ObjectHandle> {
        self.components.get(&component).map(|record| record.owner)
    }

    pub fn object_data<T: Any>(&self, object: ObjectHandle) -> Option<&T> {
        self.objects.get(&object)?.data.downcast_ref::<T>()
    }

    pub fn component<T: Any>(&self, component: ComponentHandle) -> Option<&T> {
        self.components.get(&component)?.data.downcast_ref::<T>()
    }

    pub fn component_mut<T: Any>(&mut self, component: ComponentHandle) -> Option<&mut T> {
        self.components
            .get_mut(&component)?
            .data
            .downcast_mut::<T>()
    }

    fn remove_object_record(&mut self, object: ObjectHandle) {
        if let Some(record) = self.objects.remove(&object) {
            for component in record.components {
                self.components.remove(&component);
            }
        }
    }
}

impl SceneDirectory for MemoryWorld {
    fn is_scene_loaded(&self, scene_path: &str) -> bool {
        self.scenes.contains_key(scene_path)
    }

    fn loaded_scene_handle(&self, scene_path: &str) -> Option<SceneHandle> {
        self.scenes.get(scene_path).map(|scene| scene.handle)
    }
}

impl IdentityRegistry for MemoryWorld {
    fn find_object_by_id(&self, scene: SceneHandle, object_id: &str) -> Option<ObjectHandle> {
        self.scenes
            .values()
            .find(|loaded| loaded.handle == scene)?
            .objects_by_id
            .get(object_id)
            .copied()
    }
}

impl ObjectGraph for MemoryWorld {
    fn contains(&self, instance: InstanceRef) -> bool {
        match instance {
            InstanceRef::Object(handle) => self.objects.contains_key(&handle),
            InstanceRef::Component(handle) => self.components.contains_key(&handle),
        }
    }

    fn instance_type(&self, instance: InstanceRef) -> Option<TypeName> {
        match instance {
            InstanceRef::Object(handle) => self
                .objects
                .get(&handle)
                .map(|record| record.type_name.clone()),
            InstanceRef::Component(handle) => self
                .components
                .get(&handle)
                .map(|record| record.type_name.clone()),
        }
    }

    fn components(&self, object: ObjectHandle) -> Vec<ComponentHandle> {
        self.objects
            .get(&object)
            .map(|record| record.components.clone())
            .unwrap_or_default()
    }

    fn instance(&self, instance: InstanceRef) -> Option<&dyn Any> {
        match instance {
            InstanceRef::Object(handle) => {
                let record = self.objects.get(&handle)?;
                Some(record.data.as_ref())
            }
            InstanceRef::Component(handle) => {
                let record = self.components.get(&handle)?;
                Some(record.data.as_ref())
            }
        }
    }

    fn instance_mut(&mut self, instance: InstanceRef) -> Option<&mut dyn Any> {
        match instance {
            InstanceRef::Object(handle) => {
                let record = self.objects.get_mut(&handle)?;
                Some(record.data.as_mut())
            }
            InstanceRef::Component(handle) => {
                let record = self.components.get_mut(&handle)?;
                Some(record.data.as_mut())
            }
        }
    }
}
