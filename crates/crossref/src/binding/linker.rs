use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::reflect::{AccessorRegistry, Value};
use crate::resolve::{Mutator, ResolutionResult, ResolveStatus, Resolver};
use crate::world::World;

use super::{Binding, BindingId, BindingSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    pub treat_unloaded_scene_as_valid: bool,
    pub clear_variables_on_unload: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            treat_unloaded_scene_as_valid: true,
            clear_variables_on_unload: true,
        }
    }
}

/// Outcome of applying one binding. `write_status` is `Succeeded` only when a
/// value was written; otherwise it repeats the first failing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub binding: BindingId,
    pub variable_status: ResolveStatus,
    pub value_status: ResolveStatus,
    pub write_status: ResolveStatus,
}

impl ApplyReport {
    pub fn is_applied(&self) -> bool {
        self.write_status.is_success()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub binding: BindingId,
    pub status: ResolveStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BindingDiagnostic {
    pub binding: BindingId,
    pub variable_status: ResolveStatus,
    pub value_status: ResolveStatus,
    pub variable_valid: bool,
    pub value_valid: bool,
}

impl BindingDiagnostic {
    pub fn is_valid(&self) -> bool {
        self.variable_valid && self.value_valid
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Linker<'r> {
    resolver: Resolver<'r>,
    mutator: Mutator<'r>,
    config: LinkerConfig,
}

impl<'r> Linker<'r> {
    pub fn new(registry: &'r AccessorRegistry) -> Self {
        Self::with_config(registry, LinkerConfig::default())
    }

    pub fn with_config(registry: &'r AccessorRegistry, config: LinkerConfig) -> Self {
        Self {
            resolver: Resolver::new(registry),
            mutator: Mutator::new(registry),
            config,
        }
    }

    pub fn config(&self) -> LinkerConfig {
        self.config
    }

    pub fn resolve<W: World + ?Sized>(&self, world: &W, address: &Address) -> ResolutionResult {
        self.resolver.resolve(world, address)
    }

    pub fn read<W: World + ?Sized>(&self, world: &W, address: &Address) -> Option<Value> {
        let result = self.resolver.resolve(world, address);
        self.resolver.read(world, &result)
    }

    /// True when `address` resolves to a non-empty slot. Addresses into an
    /// unloaded scene count as valid when `treat_unloaded_scene_as_valid` is set.
    pub fn is_valid<W: World + ?Sized>(
        &self,
        world: &W,
        address: &Address,
        treat_unloaded_scene_as_valid: bool,
    ) -> bool {
        let result = self.resolver.resolve(world, address);
        is_valid_result(&result, treat_unloaded_scene_as_valid)
    }

    pub fn set_value<W: World + ?Sized>(
        &self,
        world: &mut W,
        variable: &Address,
        value: &Address,
    ) -> ResolveStatus {
        let variable = self.resolver.resolve(&*world, variable);
        let value = self.resolver.resolve(&*world, value);
        match first_failure(&variable, &value) {
            Some(status) => status,
            None => self.mutator.set_value(world, &variable, &value),
        }
    }

    pub fn clear_value<W: World + ?Sized>(
        &self,
        world: &mut W,
        variable: &Address,
    ) -> ResolveStatus {
        let variable = self.resolver.resolve(&*world, variable);
        if !variable.is_success() {
            return variable.status();
        }
        self.mutator.clear_value(world, &variable)
    }

    pub fn apply<W: World + ?Sized>(&self, world: &mut W, binding: &Binding) -> ApplyReport {
        let variable = self.resolver.resolve(&*world, binding.variable());
        let value = self.resolver.resolve(&*world, binding.value());
        let write_status = match first_failure(&variable, &value) {
            Some(status) => status,
            None => self.mutator.set_value(world, &variable, &value),
        };
        let report = ApplyReport {
            binding: binding.id(),
            variable_status: variable.status(),
            value_status: value.status(),
            write_status,
        };

        match write_status {
            ResolveStatus::Succeeded => info!(
                binding = %binding.id(),
                variable = %binding.variable(),
                value = %binding.value(),
                "cross_ref_applied"
            ),
            ResolveStatus::SceneIsNotOpen => debug!(
                binding = %binding.id(),
                variable_status = %report.variable_status,
                value_status = %report.value_status,
                "cross_ref_deferred"
            ),
            status => warn!(
                binding = %binding.id(),
                variable = %binding.variable(),
                value = %binding.value(),
                status = %status,
                "cross_ref_unresolved"
            ),
        }
        report
    }

    pub fn apply_scene_loaded<W: World + ?Sized>(
        &self,
        world: &mut W,
        bindings: &BindingSet,
        scene_path: &str,
    ) -> Vec<ApplyReport> {
        let reports = bindings
            .referencing_scene(scene_path)
            .map(|binding| self.apply(&mut *world, binding))
            .collect::<Vec<_>>();
        info!(
            scene = scene_path,
            candidates = reports.len(),
            applied = reports.iter().filter(|report| report.is_applied()).count(),
            "cross_ref_scene_loaded"
        );
        reports
    }

    /// Clears variables outside `scene_path` whose value lives inside it, so no
    /// reference into the scene survives its unload.
    pub fn clear_scene_unloading<W: World + ?Sized>(
        &self,
        world: &mut W,
        bindings: &BindingSet,
        scene_path: &str,
    ) -> Vec<ClearReport> {
        if !self.config.clear_variables_on_unload {
            debug!(scene = scene_path, "cross_ref_unload_clear_disabled");
            return Vec::new();
        }
        let reports = bindings
            .iter()
            .filter(|binding| {
                binding.value().is_in_scene(scene_path)
                    && !binding.variable().is_in_scene(scene_path)
            })
            .map(|binding| ClearReport {
                binding: binding.id(),
                status: self.clear_value(&mut *world, binding.variable()),
            })
            .collect::<Vec<_>>();
        info!(
            scene = scene_path,
            cleared = reports
                .iter()
                .filter(|report| report.status.is_success())
                .count(),
            candidates = reports.len(),
            "cross_ref_scene_unloading"
        );
        reports
    }

    pub fn diagnose<W: World + ?Sized>(
        &self,
        world: &W,
        bindings: &BindingSet,
    ) -> Vec<BindingDiagnostic> {
        let lenient = self.config.treat_unloaded_scene_as_valid;
        bindings
            .iter()
            .map(|binding| {
                let variable = self.resolver.resolve(world, binding.variable());
                let value = self.resolver.resolve(world, binding.value());
                BindingDiagnostic {
                    binding: binding.id(),
                    variable_status: variable.status(),
                    value_status: value.status(),
                    variable_valid: is_valid_result(&variable, lenient),
                    value_valid: is_valid_result(&value, lenient),
                }
            })
            .collect()
    }
}

fn is_valid_result(result: &ResolutionResult, treat_unloaded_scene_as_valid: bool) -> bool {
    match result.status() {
        ResolveStatus::SceneIsNotOpen => treat_unloaded_scene_as_valid,
        ResolveStatus::Succeeded => !result.is_slot_empty(),
        _ => false,
    }
}

fn first_failure(variable: &ResolutionResult, value: &ResolutionResult) -> Option<ResolveStatus> {
    [variable.status(), value.status()]
        .into_iter()
        .find(|status| !status.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{SlotKind, I32};
    use crate::test_support::{registry, spawn_arena, spawn_hub, Enemy, Portal, ARENA, HUB};
    use crate::world::MemoryWorld;

    fn door_destination() -> Address {
        Address::object(HUB, "door")
            .with_component("Portal", 0)
            .with_field("destination")
    }

    #[test]
    fn is_valid_honours_the_unloaded_scene_flag() {
        let registry = registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        let address = Address::object(ARENA, "guid-42").with_field("health");

        assert!(linker.is_valid(&world, &address, true));
        assert!(!linker.is_valid(&world, &address, false));

        spawn_arena(&mut world);
        assert!(linker.is_valid(&world, &address, false));
        assert!(!linker.is_valid(&world, &Address::object(ARENA, "guid-404"), true));

        spawn_hub(&mut world);
        assert!(!linker.is_valid(&world, &door_destination(), true));
    }

    #[test]
    fn apply_waits_for_both_scenes_then_writes() {
        let registry = registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        let binding = Binding::new(door_destination(), Address::object(ARENA, "gate"));

        let hub = spawn_hub(&mut world);
        let report = linker.apply(&mut world, &binding);
        assert_eq!(report.variable_status, ResolveStatus::Succeeded);
        assert_eq!(report.value_status, ResolveStatus::SceneIsNotOpen);
        assert_eq!(report.write_status, ResolveStatus::SceneIsNotOpen);
        assert!(!report.is_applied());

        let arena = spawn_arena(&mut world);
        let report = linker.apply(&mut world, &binding);
        assert!(report.is_applied());
        assert_eq!(
            world
                .component::<Portal>(hub.portal)
                .and_then(|portal| portal.destination),
            Some(arena.gate)
        );
        assert_eq!(
            linker.read(&world, &door_destination()),
            Some(Value::Object(arena.gate))
        );
    }

    #[test]
    fn write_status_repeats_the_variable_failure_first() {
        let registry = registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        spawn_arena(&mut world);

        let binding = Binding::new(
            Address::object(ARENA, "guid-42").with_field("mana"),
            Address::object(ARENA, "guid-404"),
        );
        let report = linker.apply(&mut world, &binding);
        assert_eq!(report.variable_status, ResolveStatus::InvalidField);
        assert_eq!(report.value_status, ResolveStatus::InvalidObjectPath);
        assert_eq!(report.write_status, ResolveStatus::InvalidField);
    }

    #[test]
    fn scene_load_applies_only_bindings_that_touch_it() {
        let registry = registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        let cross = Binding::new(door_destination(), Address::object(ARENA, "gate"));
        let local = Binding::new(
            Address::object(ARENA, "guid-42")
                .with_field("health")
                .with_field_type(I32),
            Address::object(ARENA, "guid-7").with_field("health"),
        );
        let elsewhere = Binding::new(
            Address::object("levels/cave.scene", "bat").with_field("health"),
            Address::object("levels/cave.scene", "cave_cfg").with_field("health"),
        );
        let set = BindingSet::try_from(vec![cross.clone(), local.clone(), elsewhere]).expect("set");

        spawn_hub(&mut world);
        let hub_reports = linker.apply_scene_loaded(&mut world, &set, HUB);
        assert_eq!(hub_reports.len(), 1);
        assert_eq!(hub_reports[0].binding, cross.id());
        assert!(!hub_reports[0].is_applied());

        let arena = spawn_arena(&mut world);
        let arena_reports = linker.apply_scene_loaded(&mut world, &set, ARENA);
        let ids = arena_reports.iter().map(|report| report.binding).collect::<Vec<_>>();
        assert_eq!(ids, vec![cross.id(), local.id()]);
        assert!(arena_reports.iter().all(ApplyReport::is_applied));
        assert_eq!(
            world.object_data::<Enemy>(arena.enemy).map(|enemy| enemy.health),
            Some(42)
        );
    }

    #[test]
    fn unloading_clears_references_into_the_scene() {
        let registry = registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        let hub = spawn_hub(&mut world);
        spawn_arena(&mut world);

        let waypoint = Address::object(HUB, "door")
            .with_component("Portal", 0)
            .with_field("waypoints")
            .with_slot(SlotKind::ArrayElement(0))
            .expect("slot");
        let set = BindingSet::try_from(vec![
            Binding::new(door_destination(), Address::object(ARENA, "gate")),
            Binding::new(waypoint, Address::object(ARENA, "boss")),
        ])
        .expect("set");
        let applied = linker.apply_scene_loaded(&mut world, &set, ARENA);
        assert!(applied.iter().all(ApplyReport::is_applied));

        let cleared = linker.clear_scene_unloading(&mut world, &set, ARENA);
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|report| report.status.is_success()));
        world.unload_scene(ARENA);

        let portal = world
            .component::<Portal>(hub.portal)
            .cloned()
            .unwrap_or_default();
        assert_eq!(portal.destination, None);
        assert_eq!(portal.waypoints, vec![None, None, None]);
        assert!(linker.is_valid(&world, &Address::object(ARENA, "gate"), true));
    }

    #[test]
    fn unload_clearing_can_be_disabled() {
        let registry = registry();
        let config = LinkerConfig {
            clear_variables_on_unload: false,
            ..LinkerConfig::default()
        };
        let linker = Linker::with_config(&registry, config);
        let mut world = MemoryWorld::new();
        let hub = spawn_hub(&mut world);
        let arena = spawn_arena(&mut world);
        let set = BindingSet::try_from(vec![Binding::new(
            door_destination(),
            Address::object(ARENA, "gate"),
        )])
        .expect("set");

        linker.apply_scene_loaded(&mut world, &set, ARENA);
        assert!(linker.clear_scene_unloading(&mut world, &set, ARENA).is_empty());
        assert_eq!(
            world
                .component::<Portal>(hub.portal)
                .and_then(|portal| portal.destination),
            Some(arena.gate)
        );
    }

    #[test]
    fn diagnose_uses_the_configured_leniency() {
        let registry = registry();
        let mut world = MemoryWorld::new();
        spawn_hub(&mut world);
        let set = BindingSet::try_from(vec![Binding::new(
            door_destination(),
            Address::object(ARENA, "gate"),
        )])
        .expect("set");

        let lenient = Linker::new(&registry).diagnose(&world, &set);
        assert_eq!(lenient[0].value_status, ResolveStatus::SceneIsNotOpen);
        assert!(lenient[0].value_valid);
        assert!(!lenient[0].variable_valid);

        let strict = Linker::with_config(
            &registry,
            LinkerConfig {
                treat_unloaded_scene_as_valid: false,
                ..LinkerConfig::default()
            },
        )
        .diagnose(&world, &set);
        assert!(!strict[0].value_valid);
        assert!(!strict[0].is_valid());
    }

    #[test]
    fn set_and_clear_by_address() {
        let registry = registry();
        let linker = Linker::new(&registry);
        let mut world = MemoryWorld::new();
        spawn_arena(&mut world);
        let health = Address::object(ARENA, "guid-42").with_field("health");

        assert_eq!(
            linker.set_value(&mut world, &health, &Address::object(HUB, "door")),
            ResolveStatus::SceneIsNotOpen
        );
        assert_eq!(
            linker.set_value(
                &mut world,
                &health,
                &Address::object(ARENA, "guid-7").with_field("health")
            ),
            ResolveStatus::Succeeded
        );
        assert_eq!(linker.read(&world, &health), Some(Value::I32(42)));
        assert_eq!(linker.clear_value(&mut world, &health), ResolveStatus::Succeeded);
        assert_eq!(linker.read(&world, &health), Some(Value::I32(0)));
    }
}
