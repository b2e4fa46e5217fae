use tracing::warn;

use crate::address::{Address, SlotKind, TypeName};
use crate::reflect::{AccessError, AccessorRegistry, FieldShape, FieldType, Value};
use crate::world::{ComponentHandle, InstanceRef, ObjectGraph, ObjectHandle, World};

use super::{ResolutionResult, ResolveStatus, ResolvedTarget};

/// Stateless address resolver. Every call re-derives its answer from the world.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r AccessorRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r AccessorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r AccessorRegistry {
        self.registry
    }

    pub fn resolve<W: World + ?Sized>(&self, world: &W, address: &Address) -> ResolutionResult {
        let scene = match world.loaded_scene_handle(address.scene_path()) {
            Some(scene) if world.is_scene_loaded(address.scene_path()) => scene,
            _ => return ResolutionResult::failed(ResolveStatus::SceneIsNotOpen),
        };
        let Some(object) = world.find_object_by_id(scene, address.object_id()) else {
            return ResolutionResult::failed(ResolveStatus::InvalidObjectPath);
        };

        let owner = match address.component_type() {
            Some(component_type) => {
                let index = address.component_index();
                match self.nth_component(world, object, component_type, index) {
                    Some(component) => InstanceRef::Component(component),
                    None => return ResolutionResult::failed(ResolveStatus::ComponentNotFound),
                }
            }
            None => InstanceRef::Object(object),
        };

        let Some(field) = address.field_name() else {
            return ResolutionResult::succeeded(owner.into(), false);
        };

        match self.resolve_field(world, owner, field, address) {
            Ok(result) => result,
            Err(error) => {
                warn!(address = %address, error = %error, "cross_ref_resolve_fault");
                ResolutionResult::failed(ResolveStatus::Unknown)
            }
        }
    }

    /// Value currently held at a succeeded result's target.
    ///
    /// Object and component targets read as their own handle. Returns `None`
    /// for failed results or when the target has gone away since resolving.
    pub fn read<G: ObjectGraph + ?Sized>(
        &self,
        world: &G,
        result: &ResolutionResult,
    ) -> Option<Value> {
        match result.target()? {
            ResolvedTarget::Object(handle) => Some(Value::Object(*handle)),
            ResolvedTarget::Component(handle) => Some(Value::Component(*handle)),
            ResolvedTarget::Field {
                owner,
                owner_type,
                field,
                slot,
            } => {
                let binding = self.registry.find_field(owner_type, field)?;
                let current = binding.get(world.instance(*owner)?).ok()?;
                match (slot, current) {
                    (SlotKind::None, current) => Some(current),
                    (SlotKind::ArrayElement(index), Value::List(items)) => {
                        items.into_iter().nth(*index as usize)
                    }
                    (SlotKind::EventListener(index), Value::Listeners(listeners)) => {
                        listeners.listener_target(*index as usize).cloned()
                    }
                    _ => None,
                }
            }
        }
    }

    /// True when a field declared as `declared` may be addressed as `expected`.
    pub fn field_type_accepts(&self, declared: &FieldType, expected: &TypeName) -> bool {
        match declared.shape() {
            FieldShape::Single => self.registry.is_assignable(declared.value_type(), expected),
            FieldShape::List | FieldShape::Listeners => declared.type_name() == *expected,
        }
    }

    fn nth_component<W: World + ?Sized>(
        &self,
        world: &W,
        object: ObjectHandle,
        component_type: &TypeName,
        index: u32,
    ) -> Option<ComponentHandle> {
        world
            .components(object)
            .into_iter()
            .filter(|component| {
                world
                    .instance_type(InstanceRef::Component(*component))
                    .is_some_and(|actual| self.registry.is_assignable(&actual, component_type))
            })
            .nth(index as usize)
    }

    fn resolve_field<W: World + ?Sized>(
        &self,
        world: &W,
        owner: InstanceRef,
        field: &str,
        address: &Address,
    ) -> Result<ResolutionResult, AccessError> {
        let owner_type = world
            .instance_type(owner)
            .ok_or_else(|| AccessError::MissingInstance(format!("{owner:?}")))?;
        let Some(binding) = self.registry.find_field(&owner_type, field) else {
            return Ok(ResolutionResult::failed(ResolveStatus::InvalidField));
        };
        let instance = world
            .instance(owner)
            .ok_or_else(|| AccessError::MissingInstance(format!("{owner:?}")))?;
        let current = binding.get(instance)?;
        let declared = binding.field_type();

        let slot = address.slot();
        let is_slot_empty = match slot {
            SlotKind::None => {
                if let Some(expected) = address.field_type() {
                    if !self.field_type_accepts(declared, expected) {
                        return Ok(ResolutionResult::failed(ResolveStatus::TypeMismatch));
                    }
                }
                current.is_empty_in(world)
            }
            SlotKind::ArrayElement(index) => {
                if declared.shape() != FieldShape::List {
                    return Ok(ResolutionResult::failed(ResolveStatus::TypeMismatch));
                }
                let items: &[Value] = match &current {
                    Value::List(items) => items.as_slice(),
                    Value::None => &[],
                    _ => {
                        return Err(AccessError::IncompatibleValue {
                            field: field.to_string(),
                        })
                    }
                };
                match items.get(index as usize) {
                    Some(item) => item.is_empty_in(world),
                    None => return Ok(ResolutionResult::failed(ResolveStatus::IndexOutOfRange)),
                }
            }
            SlotKind::EventListener(index) => {
                if declared.shape() != FieldShape::Listeners {
                    return Ok(ResolutionResult::failed(ResolveStatus::TypeMismatch));
                }
                let target = match &current {
                    Value::Listeners(listeners) => listeners.listener_target(index as usize),
                    Value::None => None,
                    _ => {
                        return Err(AccessError::IncompatibleValue {
                            field: field.to_string(),
                        })
                    }
                };
                match target {
                    Some(target) => target.is_empty_in(world),
                    None => return Ok(ResolutionResult::failed(ResolveStatus::IndexOutOfRange)),
                }
            }
        };

        Ok(ResolutionResult::succeeded(
            ResolvedTarget::Field {
                owner,
                owner_type,
                field: field.to_string(),
                slot,
            },
            is_slot_empty,
        ))
    }
}
