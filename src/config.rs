//! Configuration management for blockledger

use crate::blockchain::{DEFAULT_DB_PATH, DEFAULT_DIFFICULTY};
use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// File read by [`load_config`] when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    /// Leading zero bits required of a block seal.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.database.path.is_empty() {
            return Err(ChainError::Config("database.path must not be empty".to_string()));
        }
        if !(1..=255).contains(&self.mining.difficulty) {
            return Err(ChainError::Config(format!(
                "mining.difficulty must be between 1 and 255, got {}",
                self.mining.difficulty
            )));
        }
        Ok(())
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Reads a TOML config file. A missing file yields the defaults.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = match fs::read_to_string(path.as_ref()) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    parse_config(&config_str)
}

/// Reads a config file the user named explicitly. A missing file is an error.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        ChainError::Config(format!("cannot read config file {}: {}", path.display(), e))
    })?;
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(config_str)?
    };
    config.validate()?;
    Ok(config)
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}
