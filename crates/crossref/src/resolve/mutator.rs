use tracing::{debug, warn};

use crate::address::{SlotKind, TypeName};
use crate::reflect::{AccessorRegistry, FieldBinding, FieldShape, FieldType, Value};
use crate::world::{InstanceRef, ObjectGraph, World};

use super::{ResolutionResult, ResolveStatus, ResolvedTarget, Resolver};

/// Writes values into resolved slots.
#[derive(Debug, Clone, Copy)]
pub struct Mutator<'r> {
    registry: &'r AccessorRegistry,
}

impl<'r> Mutator<'r> {
    pub fn new(registry: &'r AccessorRegistry) -> Self {
        Self { registry }
    }

    /// Copies the value held at `value`'s target into `variable`'s slot.
    ///
    /// Both results must have succeeded and `value` must hold something;
    /// anything else is caller misuse and reports `Unknown`.
    pub fn set_value<W: World + ?Sized>(
        &self,
        world: &mut W,
        variable: &ResolutionResult,
        value: &ResolutionResult,
    ) -> ResolveStatus {
        if !variable.is_success() || !value.is_success() || value.is_slot_empty() {
            debug!(
                variable_status = %variable.status(),
                value_status = %value.status(),
                value_empty = value.is_slot_empty(),
                "cross_ref_set_rejected"
            );
            return ResolveStatus::Unknown;
        }
        let payload = match Resolver::new(self.registry).read(&*world, value) {
            Some(payload) if !payload.is_empty_in(&*world) => payload,
            _ => return ResolveStatus::Unknown,
        };
        into_status(self.write(world, variable, Some(payload)))
    }

    /// Resets `variable`'s slot to the field type's default value.
    pub fn clear_value<W: World + ?Sized>(
        &self,
        world: &mut W,
        variable: &ResolutionResult,
    ) -> ResolveStatus {
        if !variable.is_success() {
            return ResolveStatus::Unknown;
        }
        into_status(self.write(world, variable, None))
    }

    fn write<W: World + ?Sized>(
        &self,
        world: &mut W,
        variable: &ResolutionResult,
        payload: Option<Value>,
    ) -> Result<(), ResolveStatus> {
        // Whole objects and components are not slots.
        let Some(ResolvedTarget::Field {
            owner,
            owner_type,
            field,
            slot,
        }) = variable.target()
        else {
            return Err(ResolveStatus::Unknown);
        };
        let binding = self
            .registry
            .find_field(owner_type, field)
            .ok_or(ResolveStatus::InvalidField)?;
        let declared = binding.field_type().clone();

        match slot {
            SlotKind::None => {
                let value = match payload {
                    Some(value) if self.fits_field(&*world, &declared, &value) => value,
                    Some(_) => return Err(ResolveStatus::TypeMismatch),
                    None => declared.default_value(),
                };
                store(world, *owner, &binding, value)
            }
            SlotKind::ArrayElement(index) => {
                if declared.shape() != FieldShape::List {
                    return Err(ResolveStatus::TypeMismatch);
                }
                let element = match payload {
                    Some(value) if self.fits(&*world, declared.value_type(), &value) => value,
                    Some(_) => return Err(ResolveStatus::TypeMismatch),
                    None => declared.default_element(),
                };
                let mut items = match load(&*world, *owner, &binding)? {
                    Value::List(items) => items,
                    Value::None => Vec::new(),
                    _ => return Err(ResolveStatus::Unknown),
                };
                let item = items
                    .get_mut(*index as usize)
                    .ok_or(ResolveStatus::IndexOutOfRange)?;
                *item = element;
                store(world, *owner, &binding, Value::List(items))
            }
            SlotKind::EventListener(index) => {
                if declared.shape() != FieldShape::Listeners {
                    return Err(ResolveStatus::TypeMismatch);
                }
                let target = match payload {
                    Some(value) if self.fits(&*world, declared.value_type(), &value) => value,
                    Some(_) => return Err(ResolveStatus::TypeMismatch),
                    None => Value::None,
                };
                let mut listeners = match load(&*world, *owner, &binding)? {
                    Value::Listeners(listeners) => listeners,
                    Value::None => return Err(ResolveStatus::IndexOutOfRange),
                    _ => return Err(ResolveStatus::Unknown),
                };
                if !listeners.set_listener_target(*index as usize, target) {
                    return Err(ResolveStatus::IndexOutOfRange);
                }
                store(world, *owner, &binding, Value::Listeners(listeners))
            }
        }
    }

    /// Whether `value` may be assigned to a field declared as `declared`.
    fn fits_field<G: ObjectGraph + ?Sized>(
        &self,
        world: &G,
        declared: &FieldType,
        value: &Value,
    ) -> bool {
        match (declared.shape(), value) {
            (FieldShape::Single, value) => self.fits(world, declared.value_type(), value),
            (FieldShape::List, Value::List(items)) => items
                .iter()
                .all(|item| item.is_none() || self.fits(world, declared.value_type(), item)),
            (FieldShape::Listeners, Value::Listeners(_)) => true,
            _ => false,
        }
    }

    fn fits<G: ObjectGraph + ?Sized>(&self, world: &G, expected: &TypeName, value: &Value) -> bool {
        match value.runtime_type(world) {
            Some(actual) => self.registry.is_assignable(&actual, expected),
            None => false,
        }
    }
}

fn load<G: ObjectGraph + ?Sized>(
    world: &G,
    owner: InstanceRef,
    binding: &FieldBinding<'_>,
) -> Result<Value, ResolveStatus> {
    let Some(instance) = world.instance(owner) else {
        return Err(ResolveStatus::Unknown);
    };
    binding.get(instance).map_err(|error| {
        warn!(field = binding.name(), error = %error, "cross_ref_write_fault");
        ResolveStatus::Unknown
    })
}

fn store<G: ObjectGraph + ?Sized>(
    world: &mut G,
    owner: InstanceRef,
    binding: &FieldBinding<'_>,
    value: Value,
) -> Result<(), ResolveStatus> {
    let Some(instance) = world.instance_mut(owner) else {
        return Err(ResolveStatus::Unknown);
    };
    binding.set(instance, value).map_err(|error| {
        warn!(field = binding.name(), error = %error, "cross_ref_write_fault");
        ResolveStatus::Unknown
    })
}

fn into_status(outcome: Result<(), ResolveStatus>) -> ResolveStatus {
    match outcome {
        Ok(()) => ResolveStatus::Succeeded,
        Err(status) => status,
    }
}
