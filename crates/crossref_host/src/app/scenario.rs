use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use crossref::{Address, BindingSet};
use serde::Deserialize;
use thiserror::Error;

pub(crate) const SCENARIO_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse scenario json at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
}

/// Scripted world: the scenes that exist, the bindings between them and the
/// load/unload/expect steps to drive.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub scenario_version: u32,
    pub scenes: Vec<SceneSpec>,
    #[serde(default)]
    pub bindings: BindingSet,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SceneSpec {
    pub path: String,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObjectSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ComponentSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Step {
    Load(String),
    Unload(String),
    Expect(Expectation),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Expectation {
    pub address: Address,
    pub value: ExpectedValue,
}

/// What an `expect` step wants to read back.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ExpectedValue {
    /// An object (or one of its components) in a given scene.
    Reference(ExpectedReference),
    /// `null`, a bool, a number or a string.
    Literal(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExpectedReference {
    pub scene: String,
    pub object: String,
    #[serde(default)]
    pub component: Option<String>,
}

impl Scenario {
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self, ScenarioError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let scenario = match serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer) {
            Ok(scenario) => scenario,
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                return Err(ScenarioError::Parse {
                    path: if path.is_empty() { ".".to_string() } else { path },
                    message: source.to_string(),
                });
            }
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub(crate) fn scene(&self, path: &str) -> Option<&SceneSpec> {
        self.scenes.iter().find(|scene| scene.path == path)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.scenario_version != SCENARIO_VERSION {
            return Err(expected_actual(
                "scenario_version",
                SCENARIO_VERSION,
                self.scenario_version,
            ));
        }

        let mut known_scenes = HashSet::with_capacity(self.scenes.len());
        for (scene_index, scene) in self.scenes.iter().enumerate() {
            if !known_scenes.insert(scene.path.as_str()) {
                return Err(validation_err(
                    &format!("scenes[{scene_index}].path"),
                    format!("duplicate scene path '{}'", scene.path),
                ));
            }
            let mut known_ids = HashSet::with_capacity(scene.objects.len());
            for (object_index, object) in scene.objects.iter().enumerate() {
                if !known_ids.insert(object.id.as_str()) {
                    return Err(validation_err(
                        &format!("scenes[{scene_index}].objects[{object_index}].id"),
                        format!("duplicate object id '{}'", object.id),
                    ));
                }
            }
        }

        for (step_index, step) in self.steps.iter().enumerate() {
            let (kind, scene) = match step {
                Step::Load(scene) => ("load", scene),
                Step::Unload(scene) => ("unload", scene),
                Step::Expect(_) => continue,
            };
            if !known_scenes.contains(scene.as_str()) {
                return Err(validation_err(
                    &format!("steps[{step_index}].{kind}"),
                    format!("scene '{scene}' is not declared in scenes"),
                ));
            }
        }
        Ok(())
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> ScenarioError {
    ScenarioError::Validation {
        path: path.to_string(),
        message: message.into(),
    }
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> ScenarioError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}
