//! Network simulation settings
//!
//! Defaults describe the 50-computer network with its NAT at address 255 and
//! `-1` as the "no packet" input. Values can come from a JSON file, from
//! `INTNET_*` environment variables, or from CLI flags layered on top.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_NETWORK_SIZE: &str = "INTNET_NETWORK_SIZE";
pub const ENV_NAT_ADDRESS: &str = "INTNET_NAT_ADDRESS";
pub const ENV_IDLE_INPUT: &str = "INTNET_IDLE_INPUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of computers, with ids `0..size`
    pub size: usize,

    /// Reserved recipient id of the NAT
    pub nat_address: i64,

    /// Value fed to a computer that asks for input with nothing queued
    pub idle_input: i64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: 50,
            nat_address: 255,
            idle_input: -1,
        }
    }
}

impl NetworkConfig {
    /// Defaults overridden by any `INTNET_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load a JSON settings file; missing fields keep their defaults
    ///
    /// Values are not validated here so that later overrides can still fix
    /// them. Call `validate` once the settings are final.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_NETWORK_SIZE) {
            config.size = parse_value(ENV_NETWORK_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_NAT_ADDRESS) {
            config.nat_address = parse_value(ENV_NAT_ADDRESS, &value)?;
        }
        if let Some(value) = lookup(ENV_IDLE_INPUT) {
            config.idle_input = parse_value(ENV_IDLE_INPUT, &value)?;
        }
        Ok(config)
    }

    /// Check that the network is non-empty and the NAT id is not a computer id
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::Invalid {
                key: "size".to_string(),
                value: self.size.to_string(),
            });
        }
        if self.is_computer(self.nat_address) {
            return Err(ConfigError::Invalid {
                key: "nat_address".to_string(),
                value: self.nat_address.to_string(),
            });
        }
        Ok(())
    }

    /// Whether `id` addresses one of the computers
    pub fn is_computer(&self, id: i64) -> bool {
        usize::try_from(id).map_or(false, |index| index < self.size)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}
