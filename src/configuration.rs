// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{fs, io, path::{Path, PathBuf}};
use serde::Deserialize;
use structopt::StructOpt;
use thiserror::Error;
use tracing::Level;
use crate::rate::RateUnit;

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config.toml", "/etc/stats-enricher/config.toml"];

#[derive(StructOpt, Debug, Clone)]
#[structopt(name = "stats-enricher")]
/// Turns docker container stats into rates, one json document per line
pub struct AppConfig {
    #[structopt(short, long, parse(from_os_str))]
    /// Path to the configuration file, `config.toml` or `/etc/stats-enricher/config.toml` by default
    pub config: Option<PathBuf>,
    #[structopt(short, long, parse(from_os_str))]
    /// Read snapshots from the file instead of the standard input
    pub input: Option<PathBuf>,
    #[structopt(long)]
    /// Merge the raw snapshot into the output
    pub raw: bool,
    #[structopt(long, possible_values = &["per_tick", "per_second"])]
    /// Overrides `rate_unit` of the configuration file
    pub rate_unit: Option<String>,
}

/// Content of the configuration file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rate_unit: RateUnit,
    pub include_raw: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rate_unit: RateUnit::PerSecond,
            include_raw: false,
            log_level: "info".to_owned(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown log level `{0}`")]
    LogLevel(String),
    #[error("unknown rate unit `{0}`")]
    RateUnit(String),
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn open<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig::from_args()
    }

    /// The explicit file must exist, the default locations are optional
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::open(path)?,
            None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).is_file()) {
                Some(path) => Config::open(path)?,
                None => Config::default(),
            },
        };

        if let Some(unit) = &self.rate_unit {
            config.rate_unit = match unit.as_str() {
                "per_tick" => RateUnit::PerTick,
                "per_second" => RateUnit::PerSecond,
                _ => return Err(ConfigError::RateUnit(unit.clone())),
            };
        }
        config.include_raw |= self.raw;
        Ok(config)
    }
}
