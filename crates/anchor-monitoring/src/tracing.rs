use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{
	fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[derive(Error, Debug)]
pub enum TracingError {
	#[error("Invalid filter directive {directive:?}: {reason}")]
	InvalidFilter { directive: String, reason: String },

	#[error("Failed to initialize tracing: {0}")]
	Init(String),
}

/// Tracing configuration
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `anchor_chains=debug,info`. A set `RUST_LOG` takes precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
	pub level: String,
	pub json_format: bool,
	pub with_thread_ids: bool,
	pub with_file_and_line: bool,
	pub with_target: bool,
	pub with_span_events: bool,
}

impl Default for TracingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			json_format: false,
			with_thread_ids: true,
			with_file_and_line: true,
			with_target: true,
			with_span_events: false,
		}
	}
}

impl TracingConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_level(mut self, level: impl Into<String>) -> Self {
		self.level = level.into();
		self
	}

	pub fn with_json_format(mut self, json: bool) -> Self {
		self.json_format = json;
		self
	}

	pub fn debug() -> Self {
		Self {
			with_span_events: true,
			..Self::default()
		}
		.with_level("debug")
	}

	pub fn production() -> Self {
		Self {
			level: "info".to_string(),
			json_format: true,
			with_thread_ids: false,
			with_file_and_line: false,
			with_target: true,
			with_span_events: false,
		}
	}

	fn span_events(&self) -> FmtSpan {
		if self.with_span_events {
			FmtSpan::ENTER | FmtSpan::CLOSE
		} else {
			FmtSpan::NONE
		}
	}

	/// The filter the subscriber will use.
	pub fn filter(&self) -> Result<EnvFilter, TracingError> {
		if let Ok(filter) = EnvFilter::try_from_default_env() {
			return Ok(filter);
		}
		EnvFilter::try_new(&self.level).map_err(|e| TracingError::InvalidFilter {
			directive: self.level.clone(),
			reason: e.to_string(),
		})
	}
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
	let subscriber = tracing_subscriber::registry().with(config.filter()?);

	if config.json_format {
		let json_layer = tracing_subscriber::fmt::layer()
			.json()
			.with_span_events(config.span_events())
			.with_thread_ids(config.with_thread_ids)
			.with_file(config.with_file_and_line)
			.with_line_number(config.with_file_and_line)
			.with_target(config.with_target);

		subscriber
			.with(json_layer)
			.try_init()
			.map_err(|e| TracingError::Init(e.to_string()))?;
	} else {
		let fmt_layer = tracing_subscriber::fmt::layer()
			.pretty()
			.with_span_events(config.span_events())
			.with_thread_ids(config.with_thread_ids)
			.with_file(config.with_file_and_line)
			.with_line_number(config.with_file_and_line)
			.with_target(config.with_target);

		subscriber
			.with(fmt_layer)
			.try_init()
			.map_err(|e| TracingError::Init(e.to_string()))?;
	}

	info!("Tracing initialized with filter: {}", config.level);
	Ok(())
}
