//! Network configuration loading.
//!
//! Reads a set of named [`NetworkConfig`]s from TOML, JSON or YAML, with
//! `${VAR}` substitution and per-network environment overrides.

mod loader;

pub use loader::ConfigLoader;

use anchor_types::NetworkConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Unsupported config format: {0}")]
	UnsupportedFormat(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Named backend networks an application connects to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
	#[serde(default)]
	pub networks: BTreeMap<String, NetworkConfig>,
}

impl AnchorConfig {
	pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
		self.networks.get(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.networks.keys().map(String::as_str)
	}
}
