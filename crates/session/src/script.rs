use crate::error::SessionError;
use crate::simulation::{Handled, Simulation};
use glam::Vec2;
use gridworld_common::{Cell, EntityId, ObjectKind, RobotCommand, SimConfig};
use gridworld_input::{Action, PadButton};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Errors from loading or running configs and scenarios.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot start simulation: {0}")]
    Start(#[from] SessionError),
    #[error("step {step}: no object named {name:?}")]
    UnknownName { step: usize, name: String },
    #[error("step {step}: {source}")]
    Step {
        step: usize,
        #[source]
        source: SessionError,
    },
}

/// One scripted user interaction.
///
/// Objects are referred to by the names given when they were spawned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Spawn {
        kind: ObjectKind,
        #[serde(default)]
        name: Option<String>,
    },
    SpawnAt {
        kind: ObjectKind,
        x: i32,
        z: i32,
        #[serde(default)]
        name: Option<String>,
    },
    Select(String),
    Press(PadButton),
    Dispatch {
        robot: String,
        command: RobotCommand,
    },
    Drag {
        object: String,
        x: f32,
        z: f32,
    },
    Tick {
        ms: u64,
        #[serde(default = "one")]
        times: u32,
    },
    Pause,
    Scrub(usize),
    Resume,
    Confirm,
    Cancel,
}

fn one() -> u32 {
    1
}

/// A config plus a list of steps, as read from YAML.
///
/// ```yaml
/// config:
///   motion_lock_ms: 200
/// steps:
///   - spawn_at: { kind: robot, x: 0, z: 0, name: r1 }
///   - select: r1
///   - press: up
///   - tick: { ms: 16, times: 20 }
///   - pause
///   - scrub: 0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: SimConfig,
    /// Steps are written as single-key maps (`- scrub: 0`) or bare names (`- pause`).
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a scenario from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let file = std::fs::File::open(path)?;
        let scenario: Self = serde_yaml::from_reader(file)?;
        Ok(scenario)
    }
}

/// Load a standalone [`SimConfig`] YAML file. Missing fields take defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig, ScriptError> {
    let file = std::fs::File::open(path)?;
    let config: SimConfig = serde_yaml::from_reader(file)?;
    Ok(config)
}

/// Plays scenario steps against a [`Simulation`], tracking spawned names.
pub struct ScriptRunner {
    sim: Simulation,
    names: BTreeMap<String, EntityId>,
}

impl ScriptRunner {
    pub fn new(config: SimConfig) -> Result<Self, ScriptError> {
        Ok(Self {
            sim: Simulation::new(config)?,
            names: BTreeMap::new(),
        })
    }

    /// Build a runner from the scenario's config and play all of its steps.
    pub fn run_scenario(scenario: &Scenario) -> Result<Self, ScriptError> {
        let mut runner = Self::new(scenario.config.clone())?;
        runner.run(&scenario.steps)?;
        Ok(runner)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn into_simulation(self) -> Simulation {
        self.sim
    }

    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Spawned names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Play steps in order, stopping at the first failure.
    pub fn run(&mut self, steps: &[Step]) -> Result<(), ScriptError> {
        for (index, step) in steps.iter().enumerate() {
            self.apply(index, step)?;
        }
        Ok(())
    }

    /// Play one step. `index` is only used for error reporting.
    pub fn apply(&mut self, index: usize, step: &Step) -> Result<Handled, ScriptError> {
        tracing::debug!(step = index, ?step, "scenario step");
        let fail = |source| ScriptError::Step {
            step: index,
            source,
        };
        let Some(action) = self.action_for(index, step)? else {
            if let Step::Tick { ms, times } = step {
                for _ in 0..*times {
                    self.sim.tick(Duration::from_millis(*ms)).map_err(fail)?;
                }
            }
            return Ok(Handled::Done);
        };
        let handled = self.sim.handle(action).map_err(fail)?;

        let name = match step {
            Step::Spawn { name, .. } | Step::SpawnAt { name, .. } => name.as_ref(),
            _ => None,
        };
        if let (Handled::Spawned(Some(id)), Some(name)) = (&handled, name) {
            self.names.insert(name.clone(), *id);
        }
        Ok(handled)
    }

    /// The action a step maps to. Ticks drive the clock and map to none.
    fn action_for(&self, index: usize, step: &Step) -> Result<Option<Action>, ScriptError> {
        let action = match step {
            Step::Spawn { kind, .. } => Action::Spawn(*kind),
            Step::SpawnAt { kind, x, z, .. } => Action::SpawnAt(*kind, Cell::new(*x, *z)),
            Step::Select(name) => Action::Select(self.lookup(index, name)?),
            Step::Press(button) => Action::Press(*button),
            Step::Dispatch { robot, command } => {
                Action::Dispatch(self.lookup(index, robot)?, *command)
            }
            Step::Drag { object, x, z } => Action::Drag {
                id: self.lookup(index, object)?,
                to: Vec2::new(*x, *z),
            },
            Step::Tick { .. } => return Ok(None),
            Step::Pause => Action::Pause,
            Step::Scrub(at) => Action::Scrub(*at),
            Step::Resume => Action::Resume,
            Step::Confirm => Action::ConfirmResume,
            Step::Cancel => Action::CancelResume,
        };
        Ok(Some(action))
    }

    fn lookup(&self, step: usize, name: &str) -> Result<EntityId, ScriptError> {
        self.id_of(name).ok_or_else(|| ScriptError::UnknownName {
            step,
            name: name.to_string(),
        })
    }
}
