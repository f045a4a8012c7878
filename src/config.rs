use std::{fs, path::Path};

use serde::Deserialize;

use crate::{ForgeError, Result, flow::CostTable, orchestrator::RunOptions};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// store config
    pub store: StoreConfig,
    /// ready nodes a run executes at the same time, at least 1, defaults to 1
    pub max_concurrency: usize,
    /// re-check remaining sparks before every node, defaults to false
    pub strict_budget: bool,
    /// per node type price overrides, merged over the reference prices
    pub costs: CostTable,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StoreConfig {
    /// store type
    #[serde(default)]
    pub store_type: StoreType,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Mem,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            max_concurrency: 1,
            strict_budget: false,
            costs: CostTable::default(),
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| ForgeError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(ForgeError::Config("max_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_concurrency: self.max_concurrency,
            strict_budget: self.strict_budget,
        }
    }
}
