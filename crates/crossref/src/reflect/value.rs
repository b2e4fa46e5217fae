use crate::address::{TypeName, BOOL, F32, F64, I32, I64, OBJECT, STRING};
use crate::world::{ComponentHandle, InstanceRef, ObjectGraph, ObjectHandle};

use super::listeners::ListenerList;

/// Dynamic value exchanged through field accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Object(ObjectHandle),
    Component(ComponentHandle),
    List(Vec<Value>),
    Listeners(ListenerList),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_instance(&self) -> Option<InstanceRef> {
        match self {
            Self::Object(handle) => Some(InstanceRef::Object(*handle)),
            Self::Component(handle) => Some(InstanceRef::Component(*handle)),
            _ => None,
        }
    }

    /// A slot is empty when it holds nothing or a reference whose target is gone.
    pub fn is_empty_in<G: ObjectGraph + ?Sized>(&self, graph: &G) -> bool {
        match self.as_instance() {
            Some(instance) => !graph.contains(instance),
            None => self.is_none(),
        }
    }

    /// Runtime type used for assignability checks. `None` has no type.
    pub fn runtime_type<G: ObjectGraph + ?Sized>(&self, graph: &G) -> Option<TypeName> {
        let name = match self {
            Self::None | Self::List(_) | Self::Listeners(_) => return None,
            Self::Bool(_) => BOOL,
            Self::I32(_) => I32,
            Self::I64(_) => I64,
            Self::F32(_) => F32,
            Self::F64(_) => F64,
            Self::String(_) => STRING,
            Self::Object(_) => OBJECT,
            Self::Component(handle) => {
                return graph.instance_type(InstanceRef::Component(*handle));
            }
        };
        Some(TypeName::from(name))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<ObjectHandle> for Value {
    fn from(value: ObjectHandle) -> Self {
        Self::Object(value)
    }
}

impl From<ComponentHandle> for Value {
    fn from(value: ComponentHandle) -> Self {
        Self::Component(value)
    }
}

impl From<ListenerList> for Value {
    fn from(value: ListenerList) -> Self {
        Self::Listeners(value)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(value: Vec<V>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Conversion back out of a [`Value`]; `None` when the variant does not fit.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

macro_rules! from_value_variant {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

from_value_variant!(bool, Bool);
from_value_variant!(i32, I32);
from_value_variant!(i64, I64);
from_value_variant!(f32, F32);
from_value_variant!(f64, F64);
from_value_variant!(String, String);
from_value_variant!(ObjectHandle, Object);
from_value_variant!(ComponentHandle, Component);
from_value_variant!(ListenerList, Listeners);

impl<V: FromValue> FromValue for Option<V> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => V::from_value(other).map(Some),
        }
    }
}

impl<V: FromValue> FromValue for Vec<V> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(Vec::new()),
            Value::List(items) => items.into_iter().map(V::from_value).collect(),
            _ => None,
        }
    }
}
