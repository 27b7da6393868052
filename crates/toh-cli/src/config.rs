//! Configuration loading
//!
//! Defaults, then a TOML file, then `TOH__SECTION__KEY` environment
//! variables. Command-line flags are applied on top by each command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use toh_core::TohMdpConfig;
use toh_rl::{EpsilonSchedule, QLearningConfig, ValueIterationSolver};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "toh.toml";

const ENV_PREFIX: &str = "TOH";

/// Configuration for the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mdp: TohMdpConfig,
    pub value_iteration: ValueIterationSolver,
    pub q_learning: QLearningConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit JSON instead of text
    pub json: bool,
    /// Cap on the length of the printed greedy path
    pub max_rollout_steps: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            max_rollout_steps: 500,
        }
    }
}

impl Config {
    /// Load from `explicit` (or the first file found) plus the environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_with(explicit, env)
    }

    fn load_with(explicit: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        match explicit {
            Some(path) => {
                tracing::debug!("Loading config from: {:?}", path);
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = Self::find_config_file() {
                    tracing::debug!("Loading config from: {:?}", path);
                    builder = builder.add_source(File::from(path).required(false));
                } else {
                    tracing::debug!("No config file found, using defaults");
                }
            }
        }

        let config: Self = builder
            .add_source(env)
            .build()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Check in order: ./toh.toml, ~/.config/toh/toh.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("toh").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    pub fn validate(&self) -> Result<()> {
        self.mdp.validate().context("invalid [mdp] section")?;
        if !(self.value_iteration.threshold > 0.0) {
            anyhow::bail!(
                "value_iteration.threshold must be positive, got {}",
                self.value_iteration.threshold
            );
        }
        if self.value_iteration.max_iterations == 0 {
            anyhow::bail!("value_iteration.max_iterations must be at least 1");
        }
        EpsilonSchedule::new(self.q_learning.epsilon.decay)
            .context("invalid [q_learning.epsilon] section")?;
        self.q_learning
            .alpha
            .validate()
            .context("invalid [q_learning.alpha] section")?;
        Ok(())
    }
}
