use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use crate::address::{TypeName, BOOL, F32, F64, I32, I64, STRING};

use super::listeners::ListenerList;
use super::value::{FromValue, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("instance is not a {expected}")]
    WrongInstance { expected: TypeName },
    #[error("field {field} cannot hold the supplied value")]
    IncompatibleValue { field: String },
    #[error("field {field} is read-only")]
    ReadOnly { field: String },
    #[error("instance {0} is missing from the world")]
    MissingInstance(String),
    #[error("{0}")]
    Host(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    Single,
    List,
    Listeners,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    shape: FieldShape,
    value_type: TypeName,
}

impl FieldType {
    pub fn single(value_type: impl Into<TypeName>) -> Self {
        Self {
            shape: FieldShape::Single,
            value_type: value_type.into(),
        }
    }

    pub fn list(element_type: impl Into<TypeName>) -> Self {
        Self {
            shape: FieldShape::List,
            value_type: element_type.into(),
        }
    }

    pub fn listeners(target_type: impl Into<TypeName>) -> Self {
        Self {
            shape: FieldShape::Listeners,
            value_type: target_type.into(),
        }
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn value_type(&self) -> &TypeName {
        &self.value_type
    }

    /// Name of the whole field type: `i32`, `[i32]`, `listeners<Door>`.
    pub fn type_name(&self) -> TypeName {
        match self.shape {
            FieldShape::Single => self.value_type.clone(),
            FieldShape::List => TypeName::new(format!("[{}]", self.value_type)),
            FieldShape::Listeners => TypeName::new(format!("listeners<{}>", self.value_type)),
        }
    }

    /// Value written by a clear: zero for primitives, empty for everything else.
    pub fn default_value(&self) -> Value {
        match self.shape {
            FieldShape::Single => default_for(&self.value_type),
            FieldShape::List => Value::List(Vec::new()),
            FieldShape::Listeners => Value::Listeners(ListenerList::new()),
        }
    }

    pub fn default_element(&self) -> Value {
        default_for(&self.value_type)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn default_for(value_type: &TypeName) -> Value {
    match value_type.as_str() {
        BOOL => Value::Bool(false),
        I32 => Value::I32(0),
        I64 => Value::I64(0),
        F32 => Value::F32(0.0),
        F64 => Value::F64(0.0),
        STRING => Value::String(String::new()),
        _ => Value::None,
    }
}

type Getter = Arc<dyn Fn(&dyn Any) -> Result<Value, AccessError> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), AccessError> + Send + Sync>;
type Upcast = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;
type UpcastMut = Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

#[derive(Clone)]
pub struct FieldAccessor {
    name: String,
    field_type: FieldType,
    get: Getter,
    set: Option<Setter>,
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("writable", &self.set.is_some())
            .finish()
    }
}

impl FieldAccessor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn get(&self, instance: &dyn Any) -> Result<Value, AccessError> {
        (self.get)(instance)
    }

    pub fn set(&self, instance: &mut dyn Any, value: Value) -> Result<(), AccessError> {
        match &self.set {
            Some(set) => set(instance, value),
            None => Err(AccessError::ReadOnly {
                field: self.name.clone(),
            }),
        }
    }
}

#[derive(Clone)]
struct Projection {
    upcast: Upcast,
    upcast_mut: UpcastMut,
}

#[derive(Clone)]
struct ParentLink {
    name: TypeName,
    projection: Option<Projection>,
}

#[derive(Clone)]
struct TypeAccessors {
    parent: Option<ParentLink>,
    fields: HashMap<String, FieldAccessor>,
}

/// Field found on a type or one of its ancestors, with the upcasts needed to reach it.
pub struct FieldBinding<'r> {
    owner_type: TypeName,
    upcasts: Vec<&'r Projection>,
    accessor: &'r FieldAccessor,
}

impl FieldBinding<'_> {
    pub fn name(&self) -> &str {
        self.accessor.name()
    }

    /// Type that declares the field, which may be an ancestor of the queried type.
    pub fn owner_type(&self) -> &TypeName {
        &self.owner_type
    }

    pub fn field_type(&self) -> &FieldType {
        self.accessor.field_type()
    }

    pub fn get(&self, instance: &dyn Any) -> Result<Value, AccessError> {
        let mut current = instance;
        for projection in &self.upcasts {
            current = (projection.upcast)(current).ok_or_else(|| self.wrong_instance())?;
        }
        self.accessor.get(current)
    }

    pub fn set(&self, instance: &mut dyn Any, value: Value) -> Result<(), AccessError> {
        let mut current = instance;
        for projection in &self.upcasts {
            current = (projection.upcast_mut)(current).ok_or_else(|| self.wrong_instance())?;
        }
        self.accessor.set(current, value)
    }

    fn wrong_instance(&self) -> AccessError {
        AccessError::WrongInstance {
            expected: self.owner_type.clone(),
        }
    }
}

/// Explicit `(type, field) -> (getter, setter)` table, built once at startup.
#[derive(Clone, Default)]
pub struct AccessorRegistry {
    types: HashMap<TypeName, TypeAccessors>,
}

impl fmt::Debug for AccessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.types.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("AccessorRegistry")
            .field("types", &names)
            .finish()
    }
}

impl AccessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any>(&mut self, name: impl Into<TypeName>) -> TypeRegistration<'_, T> {
        let name = name.into();
        self.types.entry(name.clone()).or_insert_with(|| TypeAccessors {
            parent: None,
            fields: HashMap::new(),
        });
        TypeRegistration {
            registry: self,
            name,
            _marker: PhantomData,
        }
    }

    /// Registers a component type; it is assignable to `component` unless re-parented.
    pub fn register_component<T: Any>(
        &mut self,
        name: impl Into<TypeName>,
    ) -> TypeRegistration<'_, T> {
        let mut registration = self.register::<T>(name);
        registration.set_parent(ParentLink {
            name: TypeName::component(),
            projection: None,
        });
        registration
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&TypeName> {
        self.types
            .get(name)?
            .parent
            .as_ref()
            .map(|parent| &parent.name)
    }

    pub fn find_field(&self, type_name: &TypeName, field: &str) -> Option<FieldBinding<'_>> {
        let mut current = type_name;
        let mut upcasts = Vec::new();
        for _ in 0..=self.types.len() {
            let accessors = self.types.get(current)?;
            if let Some(accessor) = accessors.fields.get(field) {
                return Some(FieldBinding {
                    owner_type: current.clone(),
                    upcasts,
                    accessor,
                });
            }
            let parent = accessors.parent.as_ref()?;
            upcasts.push(parent.projection.as_ref()?);
            current = &parent.name;
        }
        None
    }

    pub fn is_assignable(&self, from: &TypeName, to: &TypeName) -> bool {
        let mut current = from;
        for _ in 0..=self.types.len() {
            if current == to {
                return true;
            }
            match self.parent_of(current.as_str()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

pub struct TypeRegistration<'r, T> {
    registry: &'r mut AccessorRegistry,
    name: TypeName,
    _marker: PhantomData<fn(T)>,
}

impl<T: Any> TypeRegistration<'_, T> {
    pub fn extends<P: Any>(
        mut self,
        parent: impl Into<TypeName>,
        upcast: fn(&T) -> &P,
        upcast_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        self.set_parent(ParentLink {
            name: parent.into(),
            projection: Some(Projection {
                upcast: upcaster(upcast),
                upcast_mut: upcaster_mut(upcast_mut),
            }),
        });
        self
    }

    pub fn property<V, G, S>(self, name: &str, field_type: FieldType, get: G, set: S) -> Self
    where
        V: Into<Value> + FromValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let field = name.to_string();
        self.field(
            name,
            field_type,
            move |instance| get(instance).into(),
            move |instance, value| {
                let typed = V::from_value(value).ok_or_else(|| AccessError::IncompatibleValue {
                    field: field.clone(),
                })?;
                set(instance, typed);
                Ok(())
            },
        )
    }

    pub fn read_only<V, G>(self, name: &str, field_type: FieldType, get: G) -> Self
    where
        V: Into<Value> + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        let getter = self.getter(move |instance| get(instance).into());
        self.insert_field(name, field_type, getter, None)
    }

    pub fn field<G, S>(self, name: &str, field_type: FieldType, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), AccessError> + Send + Sync + 'static,
    {
        let getter = self.getter(get);
        let expected = self.name.clone();
        let setter: Setter = Arc::new(move |instance: &mut dyn Any, value: Value| {
            let typed = instance
                .downcast_mut::<T>()
                .ok_or_else(|| AccessError::WrongInstance {
                    expected: expected.clone(),
                })?;
            set(typed, value)
        });
        self.insert_field(name, field_type, getter, Some(setter))
    }

    fn getter<G>(&self, get: G) -> Getter
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let expected = self.name.clone();
        Arc::new(move |instance: &dyn Any| {
            instance
                .downcast_ref::<T>()
                .map(&get)
                .ok_or_else(|| AccessError::WrongInstance {
                    expected: expected.clone(),
                })
        })
    }

    fn insert_field(
        self,
        name: &str,
        field_type: FieldType,
        get: Getter,
        set: Option<Setter>,
    ) -> Self {
        if let Some(accessors) = self.registry.types.get_mut(&self.name) {
            accessors.fields.insert(
                name.to_string(),
                FieldAccessor {
                    name: name.to_string(),
                    field_type,
                    get,
                    set,
                },
            );
        }
        self
    }

    fn set_parent(&mut self, parent: ParentLink) {
        if let Some(accessors) = self.registry.types.get_mut(&self.name) {
            accessors.parent = Some(parent);
        }
    }
}

fn upcaster<T: Any, P: Any>(upcast: fn(&T) -> &P) -> Upcast {
    fn bind<F>(f: F) -> F
    where
        F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
    {
        f
    }
    Arc::new(bind(move |instance| {
        instance
            .downcast_ref::<T>()
            .map(|value| upcast(value) as &dyn Any)
    }))
}

fn upcaster_mut<T: Any, P: Any>(upcast_mut: fn(&mut T) -> &mut P) -> UpcastMut {
    fn bind<F>(f: F) -> F
    where
        F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
    {
        f
    }
    Arc::new(bind(move |instance| {
        instance
            .downcast_mut::<T>()
            .map(|value| upcast_mut(value) as &mut dyn Any)
    }))
}
