use crossref::{
    ApplyReport, BindingDiagnostic, ClearReport, InstanceRef, Linker, LinkerConfig, MemoryWorld,
    ObjectGraph, ObjectHandle, ResolveStatus, SceneDirectory, Value, WorldError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::components::{attach_component, build_registry, ComponentError};
use super::scenario::{ExpectedReference, ExpectedValue, Expectation, Scenario, Step};

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error("failed to spawn component on {scene}#{object}: {source}")]
    Spawn {
        scene: String,
        object: String,
        #[source]
        source: ComponentError,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunReport {
    pub scenario: String,
    pub binding_count: usize,
    pub binding_fingerprint: String,
    pub linker: LinkerConfig,
    pub steps: Vec<StepReport>,
    pub diagnostics: Vec<BindingDiagnostic>,
    pub checks_passed: usize,
    pub checks_failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub(crate) enum StepReport {
    Load {
        scene: String,
        spawned_objects: usize,
        applied: Vec<ApplyReport>,
    },
    Unload {
        scene: String,
        cleared: Vec<ClearReport>,
        unloaded: bool,
    },
    Expect {
        address: String,
        status: ResolveStatus,
        actual: String,
        passed: bool,
    },
}

/// Drives every step of `scenario` against a fresh world.
pub(crate) fn run_scenario(
    scenario: &Scenario,
    name: &str,
    config: LinkerConfig,
) -> Result<RunReport, RunError> {
    let registry = build_registry();
    let linker = Linker::with_config(&registry, config);
    let mut world = MemoryWorld::new();
    let mut report = RunReport {
        scenario: name.to_string(),
        binding_count: scenario.bindings.len(),
        binding_fingerprint: scenario.bindings.fingerprint(),
        linker: linker.config(),
        steps: Vec::with_capacity(scenario.steps.len()),
        diagnostics: Vec::new(),
        checks_passed: 0,
        checks_failed: 0,
    };
    info!(
        scenario = name,
        bindings = report.binding_count,
        steps = scenario.steps.len(),
        fingerprint = %report.binding_fingerprint,
        "scenario_started"
    );

    for step in &scenario.steps {
        let step_report = match step {
            Step::Load(scene) => load_scene(&linker, &mut world, scenario, scene)?,
            Step::Unload(scene) => {
                let cleared = linker.clear_scene_unloading(&mut world, &scenario.bindings, scene);
                let unloaded = world.unload_scene(scene);
                if !unloaded {
                    warn!(scene = scene.as_str(), "scene_not_loaded");
                }
                StepReport::Unload {
                    scene: scene.clone(),
                    cleared,
                    unloaded,
                }
            }
            Step::Expect(expectation) => {
                let step_report = check(&linker, &world, expectation);
                if let StepReport::Expect {
                    passed: true,
                    ..
                } = step_report
                {
                    report.checks_passed += 1;
                } else {
                    report.checks_failed += 1;
                }
                step_report
            }
        };
        report.steps.push(step_report);
    }

    report.diagnostics = linker.diagnose(&world, &scenario.bindings);
    Ok(report)
}

fn load_scene(
    linker: &Linker<'_>,
    world: &mut MemoryWorld,
    scenario: &Scenario,
    scene: &str,
) -> Result<StepReport, RunError> {
    let spawned_objects = if world.is_scene_loaded(scene) {
        warn!(scene, "scene_already_loaded");
        0
    } else {
        world.load_scene(scene);
        let objects = scenario
            .scene(scene)
            .map(|spec| spec.objects.as_slice())
            .unwrap_or_default();
        for object in objects {
            let handle = world.spawn_object(scene, &object.id, &object.name)?;
            for component in &object.components {
                attach_component(world, handle, &component.type_name, &component.data).map_err(
                    |source| RunError::Spawn {
                        scene: scene.to_string(),
                        object: object.id.clone(),
                        source,
                    },
                )?;
            }
        }
        objects.len()
    };

    let applied = linker.apply_scene_loaded(world, &scenario.bindings, scene);
    Ok(StepReport::Load {
        scene: scene.to_string(),
        spawned_objects,
        applied,
    })
}

fn check(linker: &Linker<'_>, world: &MemoryWorld, expectation: &Expectation) -> StepReport {
    let result = linker.resolve(world, &expectation.address);
    let actual = linker.read(world, &expectation.address);
    let passed =
        result.is_success() && matches_expected(world, actual.as_ref(), &expectation.value);
    let actual = describe(world, actual.as_ref());
    if !passed {
        warn!(
            address = %expectation.address,
            status = %result.status(),
            actual = actual.as_str(),
            "expectation_failed"
        );
    }
    StepReport::Expect {
        address: expectation.address.to_string(),
        status: result.status(),
        actual,
        passed,
    }
}

fn matches_expected(world: &MemoryWorld, actual: Option<&Value>, expected: &ExpectedValue) -> bool {
    match expected {
        ExpectedValue::Reference(reference) => match actual.and_then(Value::as_instance) {
            Some(InstanceRef::Object(object)) => {
                reference.component.is_none() && object_is(world, object, reference)
            }
            Some(InstanceRef::Component(component)) => {
                let Some(expected_type) = reference.component.as_deref() else {
                    return false;
                };
                let type_matches = world
                    .instance_type(InstanceRef::Component(component))
                    .is_some_and(|actual_type| actual_type == expected_type);
                type_matches
                    && world
                        .component_owner(component)
                        .is_some_and(|owner| object_is(world, owner, reference))
            }
            None => false,
        },
        ExpectedValue::Literal(literal) => literal_matches(actual, literal),
    }
}

fn object_is(world: &MemoryWorld, object: ObjectHandle, reference: &ExpectedReference) -> bool {
    world.object_scene(object) == Some(reference.scene.as_str())
        && world.object_id(object) == Some(reference.object.as_str())
}

fn literal_matches(actual: Option<&Value>, literal: &serde_json::Value) -> bool {
    use serde_json::Value as Json;

    let Some(actual) = actual else {
        return false;
    };
    match (literal, actual) {
        (Json::Null, Value::None) => true,
        (Json::Bool(expected), Value::Bool(actual)) => expected == actual,
        (Json::Number(expected), Value::I32(actual)) => {
            expected.as_i64() == Some(i64::from(*actual))
        }
        (Json::Number(expected), Value::I64(actual)) => expected.as_i64() == Some(*actual),
        (Json::Number(expected), Value::F32(actual)) => expected
            .as_f64()
            .is_some_and(|expected| (expected - f64::from(*actual)).abs() < 1e-6),
        (Json::Number(expected), Value::F64(actual)) => expected
            .as_f64()
            .is_some_and(|expected| (expected - actual).abs() < 1e-9),
        (Json::String(expected), Value::String(actual)) => expected == actual,
        _ => false,
    }
}

/// Human-readable form of a read value for the run report.
fn describe(world: &MemoryWorld, actual: Option<&Value>) -> String {
    let describe_object = |object: ObjectHandle| {
        match (world.object_scene(object), world.object_id(object)) {
            (Some(scene), Some(id)) => format!("{scene}#{id}"),
            _ => format!("<stale object {}>", object.0),
        }
    };
    match actual {
        None => "<unresolved>".to_string(),
        Some(Value::None) => "null".to_string(),
        Some(Value::Object(object)) => describe_object(*object),
        Some(Value::Component(component)) => {
            match (
                world.component_owner(*component),
                world.instance_type(InstanceRef::Component(*component)),
            ) {
                (Some(owner), Some(type_name)) => format!("{}/{type_name}", describe_object(owner)),
                _ => format!("<stale component {}>", component.0),
            }
        }
        Some(Value::Bool(value)) => value.to_string(),
        Some(Value::I32(value)) => value.to_string(),
        Some(Value::I64(value)) => value.to_string(),
        Some(Value::F32(value)) => value.to_string(),
        Some(Value::F64(value)) => value.to_string(),
        Some(Value::String(value)) => format!("{value:?}"),
        Some(other) => format!("{other:?}"),
    }
}
