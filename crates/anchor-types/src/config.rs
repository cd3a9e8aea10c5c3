//! Backend identity and per-network connection settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AdapterError, AdapterResult};

/// Default timeout applied to handshakes and close operations.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// The closed set of ledger backends the adapter layer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendKind {
	/// Custom proof-of-authority chain.
	#[serde(alias = "poa")]
	Poa,
	/// Polygon-style rollup.
	#[serde(alias = "polygon")]
	Polygon,
	/// Ethereum-compatible chain.
	#[serde(alias = "ethereum")]
	Ethereum,
}

impl BackendKind {
	pub const ALL: [BackendKind; 3] = [Self::Poa, Self::Polygon, Self::Ethereum];

	/// The token callers use to name this backend.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Poa => "POA",
			Self::Polygon => "POLYGON",
			Self::Ethereum => "ETHEREUM",
		}
	}
}

impl fmt::Display for BackendKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for BackendKind {
	type Err = AdapterError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let token = s.trim();
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(token))
			.ok_or_else(|| AdapterError::UnsupportedBackend(token.to_string()))
	}
}

/// Connection settings for one backend network.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub backend: BackendKind,
	/// Endpoint URLs, tried in order on connect.
	#[serde(default)]
	pub endpoints: Vec<String>,
	/// Hex-encoded secp256k1 signing key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub private_key: Option<String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	/// Identity proofs are verified against. Defaults to the key's address.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub verifier: Option<String>,
	/// Allows EVM backends to run without a signing key.
	#[serde(default)]
	pub read_only: bool,
}

fn default_timeout_ms() -> u64 {
	DEFAULT_TIMEOUT_MS
}

/// Whether an adapter needs signing material to operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningRequirement {
	/// The backend signs on the caller's behalf.
	Delegated,
	/// The adapter signs locally unless the config is read-only.
	Local,
}

impl NetworkConfig {
	pub fn new<I, S>(backend: BackendKind, endpoints: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			backend,
			endpoints: endpoints.into_iter().map(Into::into).collect(),
			private_key: None,
			timeout_ms: DEFAULT_TIMEOUT_MS,
			chain_id: None,
			version: None,
			verifier: None,
			read_only: false,
		}
	}

	pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
		self.private_key = Some(key.into());
		self
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	pub fn with_chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = Some(chain_id);
		self
	}

	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = Some(version.into());
		self
	}

	pub fn with_verifier(mut self, verifier: impl Into<String>) -> Self {
		self.verifier = Some(verifier.into());
		self
	}

	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	/// Checks the fields `backend` needs before any client is constructed.
	pub fn validate_for(
		&self,
		backend: BackendKind,
		signing: SigningRequirement,
	) -> AdapterResult<()> {
		let invalid = |reason: String| AdapterError::Configuration { backend, reason };

		if self.backend != backend {
			return Err(invalid(format!(
				"config targets {} but adapter is {}",
				self.backend, backend
			)));
		}

		if self.endpoints.is_empty() {
			return Err(invalid("at least one endpoint is required".to_string()));
		}

		if let Some(position) = self.endpoints.iter().position(|e| e.trim().is_empty()) {
			return Err(invalid(format!("endpoint #{} is empty", position)));
		}

		if self.timeout_ms == 0 {
			return Err(invalid("timeout_ms must be positive".to_string()));
		}

		let has_key = self
			.private_key
			.as_deref()
			.is_some_and(|k| !k.trim().is_empty());
		if signing == SigningRequirement::Local && !self.read_only && !has_key {
			return Err(invalid(
				"private_key is required unless read_only is set".to_string(),
			));
		}

		Ok(())
	}
}

impl fmt::Debug for NetworkConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NetworkConfig")
			.field("backend", &self.backend)
			.field("endpoints", &self.endpoints)
			.field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
			.field("timeout_ms", &self.timeout_ms)
			.field("chain_id", &self.chain_id)
			.field("version", &self.version)
			.field("verifier", &self.verifier)
			.field("read_only", &self.read_only)
			.finish()
	}
}
