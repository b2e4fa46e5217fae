pub mod address;
pub mod binding;
pub mod reflect;
pub mod resolve;
pub mod world;

#[cfg(test)]
mod test_support;

pub use address::{Address, AddressError, SlotKind, TypeName};
pub use binding::{
    ApplyReport, Binding, BindingDiagnostic, BindingDiff, BindingId, BindingSet, BindingSetError,
    ClearReport, Linker, LinkerConfig,
};
pub use reflect::{
    AccessError, AccessorRegistry, FieldAccessor, FieldBinding, FieldShape, FieldType, FromValue,
    Listener, ListenerList, TypeRegistration, Value,
};
pub use resolve::{Mutator, ResolutionResult, ResolveStatus, ResolvedTarget, Resolver};
pub use world::{
    ComponentHandle, IdentityRegistry, InstanceRef, MemoryWorld, ObjectGraph, ObjectHandle,
    SceneDirectory, SceneHandle, SceneObject, World, WorldError,
};
