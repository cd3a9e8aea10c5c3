//! The capability contract every backend adapter implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
	block::{Block, BlockTag},
	config::{BackendKind, NetworkConfig},
	errors::{AdapterError, AdapterResult},
	metrics::NetworkMetrics,
	proof::ProofFormat,
	transaction::{ContractCall, Transaction},
};

/// Lifecycle position of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
	Uninitialized,
	Initialized,
	Connected,
	Disconnected,
}

impl AdapterState {
	/// Fails with `NotConnected` unless the adapter is connected.
	pub fn require_connected(
		&self,
		backend: BackendKind,
		operation: &'static str,
	) -> AdapterResult<()> {
		match self {
			Self::Connected => Ok(()),
			state => Err(AdapterError::NotConnected {
				backend,
				operation,
				state: *state,
			}),
		}
	}
}

impl fmt::Display for AdapterState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Uninitialized => "uninitialized",
			Self::Initialized => "initialized",
			Self::Connected => "connected",
			Self::Disconnected => "disconnected",
		};
		f.write_str(s)
	}
}

/// Uniform contract over one backend connection.
///
/// The lifecycle is explicit: `initialize → connect → … → disconnect`. Every
/// operational method fails with [`AdapterError::NotConnected`] until `connect`
/// has succeeded. Operational methods take `&self`, so a connected adapter can be
/// driven from several tasks; whether concurrent submissions are safe depends on
/// the backend's nonce model and is documented on each implementation.
#[async_trait]
pub trait ChainAdapter: Send + Sync + fmt::Debug {
	fn backend(&self) -> BackendKind;

	fn state(&self) -> AdapterState;

	/// Validates `config` and constructs the backend clients.
	async fn initialize(&mut self, config: NetworkConfig) -> AdapterResult<()>;

	/// Establishes the connection. Not retried internally.
	async fn connect(&mut self) -> AdapterResult<()>;

	/// Releases connection resources. Idempotent and best-effort.
	async fn disconnect(&mut self);

	/// Returns the backend-assigned identifier once the backend accepts the
	/// transaction for inclusion.
	async fn submit_transaction(&self, tx: Transaction) -> AdapterResult<String>;

	async fn call_contract(&self, call: ContractCall) -> AdapterResult<serde_json::Value>;

	async fn get_block(&self, block: BlockTag) -> AdapterResult<Block>;

	async fn get_metrics(&self) -> AdapterResult<NetworkMetrics>;

	async fn generate_proof(&self, data: &serde_json::Value) -> AdapterResult<ProofFormat>;

	/// Checks `proof` against the configured verifier identity. Malformed proofs
	/// yield `Ok(false)`.
	async fn verify_proof(&self, proof: &ProofFormat) -> AdapterResult<bool>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_require_connected() {
		assert!(AdapterState::Connected
			.require_connected(BackendKind::Poa, "get_block")
			.is_ok());

		for state in [
			AdapterState::Uninitialized,
			AdapterState::Initialized,
			AdapterState::Disconnected,
		] {
			match state.require_connected(BackendKind::Poa, "get_block") {
				Err(AdapterError::NotConnected {
					operation,
					state: reported,
					..
				}) => {
					assert_eq!(operation, "get_block");
					assert_eq!(reported, state);
				}
				other => panic!("unexpected result: {:?}", other),
			}
		}
	}
}
