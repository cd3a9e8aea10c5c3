//! Configuration loading from files and environment.

use crate::{AnchorConfig, ConfigError};
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
	Toml,
	Json,
	Yaml,
}

impl Format {
	fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "ANCHOR_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Reads the configured file, then applies overrides and validation.
	pub async fn load(&self) -> Result<AnchorConfig, ConfigError> {
		let path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;
		info!("Loading configuration from {:?}", path);

		let format = Format::from_path(path)?;
		let content = match tokio::fs::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(path.display().to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		self.finish(self.parse(&content, format)?)
	}

	/// Loads from TOML text.
	pub fn from_toml(&self, content: &str) -> Result<AnchorConfig, ConfigError> {
		self.finish(self.parse(content, Format::Toml)?)
	}

	/// Loads from JSON text.
	pub fn from_json(&self, content: &str) -> Result<AnchorConfig, ConfigError> {
		self.finish(self.parse(content, Format::Json)?)
	}

	/// Loads from YAML text.
	pub fn from_yaml(&self, content: &str) -> Result<AnchorConfig, ConfigError> {
		self.finish(self.parse(content, Format::Yaml)?)
	}

	fn parse(&self, content: &str, format: Format) -> Result<AnchorConfig, ConfigError> {
		let substituted = self.substitute_env_vars(content)?;

		match format {
			Format::Toml => toml::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e))),
			Format::Json => serde_json::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {}", e))),
			Format::Yaml => serde_yaml::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse YAML: {}", e))),
		}
	}

	fn finish(&self, mut config: AnchorConfig) -> Result<AnchorConfig, ConfigError> {
		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;
		Ok(config)
	}

	/// Replaces `${VAR}` and `${VAR:-default}` references.
	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		let mut missing = None;
		let result = re.replace_all(content, |caps: &regex::Captures| {
			let name = &caps[1];
			match (env::var(name), caps.get(2)) {
				(Ok(value), _) => value,
				(Err(_), Some(default)) => default.as_str().to_string(),
				(Err(_), None) => {
					missing.get_or_insert_with(|| name.to_string());
					String::new()
				}
			}
		});

		match missing {
			Some(name) => Err(ConfigError::EnvVarNotFound(name)),
			None => Ok(result.into_owned()),
		}
	}

	/// Applies `<PREFIX><NAME>_PRIVATE_KEY` and `<PREFIX><NAME>_ENDPOINTS`.
	fn apply_env_overrides(&self, config: &mut AnchorConfig) -> Result<(), ConfigError> {
		for (name, network) in config.networks.iter_mut() {
			let key = format!("{}{}", self.env_prefix, env_segment(name));

			if let Ok(private_key) = env::var(format!("{}_PRIVATE_KEY", key)) {
				debug!("Overriding private key for network {} from environment", name);
				network.private_key = Some(private_key);
			}

			if let Ok(endpoints) = env::var(format!("{}_ENDPOINTS", key)) {
				debug!("Overriding endpoints for network {} from environment", name);
				network.endpoints = endpoints
					.split(',')
					.map(str::trim)
					.filter(|e| !e.is_empty())
					.map(String::from)
					.collect();
			}
		}

		Ok(())
	}
}

/// `poa-local` becomes `POA_LOCAL`.
fn env_segment(name: &str) -> String {
	name.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() {
				c.to_ascii_uppercase()
			} else {
				'_'
			}
		})
		.collect()
}

fn validate_config(config: &AnchorConfig) -> Result<(), ConfigError> {
	if config.networks.is_empty() {
		return Err(ConfigError::ValidationError(
			"At least one network must be configured".to_string(),
		));
	}

	for (name, network) in &config.networks {
		if network.endpoints.is_empty() {
			return Err(ConfigError::ValidationError(format!(
				"Network {} has no endpoints",
				name
			)));
		}
		if network.endpoints.iter().any(|e| e.trim().is_empty()) {
			return Err(ConfigError::ValidationError(format!(
				"Network {} has an empty endpoint",
				name
			)));
		}
		if network.timeout_ms == 0 {
			return Err(ConfigError::ValidationError(format!(
				"Network {} must have a positive timeout_ms",
				name
			)));
		}
	}

	Ok(())
}
