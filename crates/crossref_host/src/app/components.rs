//! Demo component types the host knows how to spawn and address.

use crossref::address::{I32, OBJECT};
use crossref::{
    AccessorRegistry, ComponentHandle, FieldType, ListenerList, MemoryWorld, ObjectHandle, Value,
    WorldError,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Health {
    pub current: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct BossHealth {
    pub base: Health,
    pub phase: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BossHealthData {
    current: i32,
    max: i32,
    phase: i32,
}

impl From<BossHealthData> for BossHealth {
    fn from(data: BossHealthData) -> Self {
        Self {
            base: Health {
                current: data.current,
                max: data.max,
            },
            phase: data.phase,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Portal {
    pub destination: Option<ObjectHandle>,
    pub waypoints: Vec<Option<ObjectHandle>>,
    pub on_enter: ListenerList,
}

/// Authoring form of a portal: references start empty and are filled by bindings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PortalData {
    waypoint_slots: usize,
    listeners: Vec<String>,
}

impl From<PortalData> for Portal {
    fn from(data: PortalData) -> Self {
        let mut on_enter = ListenerList::new();
        for method in data.listeners {
            on_enter.push(Value::None, method);
        }
        Self {
            destination: None,
            waypoints: vec![None; data.waypoint_slots],
            on_enter,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ComponentError {
    #[error("unknown component type '{0}'")]
    UnknownType(String),
    #[error("invalid data for component '{type_name}': {source}")]
    InvalidData {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}

pub(crate) fn build_registry() -> AccessorRegistry {
    let mut registry = AccessorRegistry::new();
    registry
        .register_component::<Health>("Health")
        .property(
            "current",
            FieldType::single(I32),
            |health: &Health| health.current,
            |health: &mut Health, value| health.current = value,
        )
        .property(
            "max",
            FieldType::single(I32),
            |health: &Health| health.max,
            |health: &mut Health, value| health.max = value,
        );
    registry
        .register_component::<BossHealth>("BossHealth")
        .extends::<Health>("Health", |boss| &boss.base, |boss| &mut boss.base)
        .property(
            "phase",
            FieldType::single(I32),
            |boss: &BossHealth| boss.phase,
            |boss: &mut BossHealth, value| boss.phase = value,
        );
    registry
        .register_component::<Portal>("Portal")
        .property(
            "destination",
            FieldType::single(OBJECT),
            |portal: &Portal| portal.destination,
            |portal: &mut Portal, value| portal.destination = value,
        )
        .property(
            "waypoints",
            FieldType::list(OBJECT),
            |portal: &Portal| portal.waypoints.clone(),
            |portal: &mut Portal, value| portal.waypoints = value,
        )
        .property(
            "on_enter",
            FieldType::listeners(OBJECT),
            |portal: &Portal| portal.on_enter.clone(),
            |portal: &mut Portal, value| portal.on_enter = value,
        );
    registry
}

pub(crate) fn attach_component(
    world: &mut MemoryWorld,
    object: ObjectHandle,
    type_name: &str,
    data: &serde_json::Value,
) -> Result<ComponentHandle, ComponentError> {
    let handle = match type_name {
        "Health" => {
            let health = decode::<Health>(type_name, data)?;
            world.attach_component(object, type_name, health)?
        }
        "BossHealth" => {
            let boss = BossHealth::from(decode::<BossHealthData>(type_name, data)?);
            world.attach_component(object, type_name, boss)?
        }
        "Portal" => {
            let portal = Portal::from(decode::<PortalData>(type_name, data)?);
            world.attach_component(object, type_name, portal)?
        }
        other => return Err(ComponentError::UnknownType(other.to_string())),
    };
    Ok(handle)
}

fn decode<T>(type_name: &str, data: &serde_json::Value) -> Result<T, ComponentError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data.clone()).map_err(|source| ComponentError::InvalidData {
        type_name: type_name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossref::{Address, Linker};
    use serde_json::json;

    #[test]
    fn boss_health_exposes_inherited_fields() {
        let registry = build_registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        world.load_scene("arena.scene");
        let boss = world.spawn_object("arena.scene", "boss", "Boss").expect("spawn");
        attach_component(
            &mut world,
            boss,
            "BossHealth",
            &json!({"current": 300, "max": 500, "phase": 2}),
        )
        .expect("attach");

        let current = Address::object("arena.scene", "boss")
            .with_component("Health", 0)
            .with_field("current");
        assert_eq!(linker.read(&world, &current), Some(Value::I32(300)));
        let phase = Address::object("arena.scene", "boss")
            .with_component("BossHealth", 0)
            .with_field("phase");
        assert_eq!(linker.read(&world, &phase), Some(Value::I32(2)));
    }

    #[test]
    fn portal_data_sizes_the_reference_slots() {
        let mut world = MemoryWorld::new();
        world.load_scene("hub.scene");
        let door = world.spawn_object("hub.scene", "door", "Door").expect("spawn");
        let portal = attach_component(
            &mut world,
            door,
            "Portal",
            &json!({"waypoint_slots": 2, "listeners": ["open", "chime"]}),
        )
        .expect("attach");

        let portal = world.component::<Portal>(portal).expect("portal");
        assert_eq!(portal.waypoints, vec![None, None]);
        assert_eq!(portal.on_enter.len(), 2);
        assert_eq!(portal.on_enter.method(1), Some("chime"));
    }

    #[test]
    fn null_data_uses_defaults_and_unknown_types_fail() {
        let mut world = MemoryWorld::new();
        world.load_scene("hub.scene");
        let door = world.spawn_object("hub.scene", "door", "Door").expect("spawn");
        let health = attach_component(&mut world, door, "Health", &serde_json::Value::Null)
            .expect("attach");
        assert_eq!(world.component::<Health>(health), Some(&Health::default()));

        let err = attach_component(&mut world, door, "Mana", &json!({})).expect_err("unknown");
        assert!(matches!(err, ComponentError::UnknownType(name) if name == "Mana"));

        let err = attach_component(&mut world, door, "Health", &json!({"hp": 3}))
            .expect_err("bad field");
        assert!(matches!(err, ComponentError::InvalidData { .. }));
    }
}
