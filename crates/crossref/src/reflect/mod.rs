mod listeners;
mod registry;
mod value;

pub use listeners::{Listener, ListenerList};
pub use registry::{
    AccessError, AccessorRegistry, FieldAccessor, FieldBinding, FieldShape, FieldType,
    TypeRegistration,
};
pub use value::{FromValue, Value};
