//! Shared fixtures for the in-crate tests: a small arena scene and hub scene.

use crate::address::{I32, OBJECT, STRING};
use crate::reflect::{AccessorRegistry, FieldType, ListenerList, Value};
use crate::world::{ComponentHandle, MemoryWorld, ObjectHandle};

pub const ARENA: &str = "levels/arena.scene";
pub const HUB: &str = "levels/hub.scene";

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub health: i32,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BossHealth {
    pub base: Health,
    pub phase: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portal {
    pub destination: Option<ObjectHandle>,
    pub waypoints: Vec<Option<ObjectHandle>>,
    pub on_enter: ListenerList,
}

pub fn registry() -> AccessorRegistry {
    let mut registry = AccessorRegistry::new();
    registry
        .register::<Enemy>("Enemy")
        .property(
            "health",
            FieldType::single(I32),
            |enemy: &Enemy| enemy.health,
            |enemy: &mut Enemy, value| enemy.health = value,
        )
        .property(
            "tag",
            FieldType::single(STRING),
            |enemy: &Enemy| enemy.tag.clone(),
            |enemy: &mut Enemy, value| enemy.tag = value,
        );
    registry
        .register_component::<Health>("Health")
        .property(
            "current",
            FieldType::single(I32),
            |health: &Health| health.current,
            |health: &mut Health, value| health.current = value,
        )
        .read_only("max", FieldType::single(I32), |health: &Health| health.max);
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

pub struct Arena {
    pub enemy: ObjectHandle,
    pub grunt: ObjectHandle,
    pub boss: ObjectHandle,
    pub plain_health: ComponentHandle,
    pub boss_health: ComponentHandle,
    pub gate: ObjectHandle,
    pub portal: ComponentHandle,
}

/// Loads the arena: `guid-42` (Enemy, health 100), `guid-7` (Enemy, health 42),
/// `boss` (Health then BossHealth) and `gate` (Portal with three waypoints and
/// one listener).
pub fn spawn_arena(world: &mut MemoryWorld) -> Arena {
    world.load_scene(ARENA);
    let enemy = world
        .spawn_object_with(
            ARENA,
            "guid-42",
            "Enemy",
            Enemy {
                health: 100,
                tag: "brute".to_string(),
            },
        )
        .expect("enemy");
    let grunt = world
        .spawn_object_with(
            ARENA,
            "guid-7",
            "Enemy",
            Enemy {
                health: 42,
                tag: "grunt".to_string(),
            },
        )
        .expect("grunt");
    let boss = world.spawn_object(ARENA, "boss", "Boss").expect("boss");
    let plain_health = world
        .attach_component(
            boss,
            "Health",
            Health {
                current: 100,
                max: 100,
            },
        )
        .expect("health");
    let boss_health = world
        .attach_component(
            boss,
            "BossHealth",
            BossHealth {
                base: Health {
                    current: 500,
                    max: 500,
                },
                phase: 1,
            },
        )
        .expect("boss health");
    let gate = world.spawn_object(ARENA, "gate", "Gate").expect("gate");
    let portal = world
        .attach_component(gate, "Portal", portal_with_slots())
        .expect("portal");
    Arena {
        enemy,
        grunt,
        boss,
        plain_health,
        boss_health,
        gate,
        portal,
    }
}

pub struct Hub {
    pub door: ObjectHandle,
    pub portal: ComponentHandle,
}

/// Loads the hub: `door` carrying an empty Portal.
pub fn spawn_hub(world: &mut MemoryWorld) -> Hub {
    world.load_scene(HUB);
    let door = world.spawn_object(HUB, "door", "Door").expect("door");
    let portal = world
        .attach_component(door, "Portal", portal_with_slots())
        .expect("portal");
    Hub { door, portal }
}

fn portal_with_slots() -> Portal {
    let mut on_enter = ListenerList::new();
    on_enter.push(Value::None, "open");
    Portal {
        destination: None,
        waypoints: vec![None, None, None],
        on_enter,
    }
}
