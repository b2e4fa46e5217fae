use std::path::{Path, PathBuf};

use crossref::LinkerConfig;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::atomic_io::write_text_atomic;
use super::runner::{run_scenario, RunError, RunReport};
use super::scenario::{Scenario, ScenarioError};

const SCENARIO_ENV_VAR: &str = "CROSSREF_SCENARIO";
const REPORT_ENV_VAR: &str = "CROSSREF_REPORT";

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error("no scenario given: pass a path or set CROSSREF_SCENARIO")]
    MissingScenario,
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
    #[error("flag {0} requires a value")]
    MissingFlagValue(&'static str),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("failed to encode run report: {0}")]
    EncodeReport(#[source] serde_json::Error),
    #[error("failed to write run report {path}: {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HostConfig {
    pub scenario_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub linker: LinkerConfig,
}

impl HostConfig {
    pub(crate) fn from_env_and_args(
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, HostError> {
        Self::from_parts(args, |key| std::env::var(key).ok())
    }

    /// Command-line values win over the environment.
    fn from_parts(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HostError> {
        let mut scenario_path = None;
        let mut report_path = None;
        let mut linker = LinkerConfig::default();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--report" => {
                    let path = args.next().ok_or(HostError::MissingFlagValue("--report"))?;
                    report_path = Some(PathBuf::from(path));
                }
                "--strict-unloaded" => linker.treat_unloaded_scene_as_valid = false,
                "--keep-on-unload" => linker.clear_variables_on_unload = false,
                flag if flag.starts_with("--") => {
                    return Err(HostError::UnknownArgument(flag.to_string()));
                }
                path if scenario_path.is_none() => scenario_path = Some(PathBuf::from(path)),
                extra => return Err(HostError::UnknownArgument(extra.to_string())),
            }
        }

        let scenario_path = scenario_path
            .or_else(|| non_empty(env(SCENARIO_ENV_VAR)).map(PathBuf::from))
            .ok_or(HostError::MissingScenario)?;
        let report_path = report_path.or_else(|| non_empty(env(REPORT_ENV_VAR)).map(PathBuf::from));

        Ok(Self {
            scenario_path,
            report_path,
            linker,
        })
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn run(config: &HostConfig) -> Result<RunReport, HostError> {
    let scenario = Scenario::load(&config.scenario_path)?;
    info!(
        path = %config.scenario_path.display(),
        scenes = scenario.scenes.len(),
        bindings = scenario.bindings.len(),
        "scenario_loaded"
    );

    let name = config.scenario_path.display().to_string();
    let report = run_scenario(&scenario, &name, config.linker)?;
    if let Some(path) = &config.report_path {
        write_report(path, &report)?;
    }
    Ok(report)
}

fn write_report(path: &Path, report: &RunReport) -> Result<(), HostError> {
    let text = serde_json::to_string_pretty(report).map_err(HostError::EncodeReport)?;
    write_text_atomic(path, &text).map_err(|source| HostError::WriteReport {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "run_report_written");
    Ok(())
}
