//! Proof-of-authority backend adapter.
//!
//! Transactions carry zero fees with a 10% gas margin. Proof generation and
//! verification are delegated to the node.
//!
//! Nonces are assigned by the node, so one connected adapter may be used for
//! concurrent submissions without external serialization.

mod client;

pub use client::{PoaAttestation, PoaClient, PoaNetworkReport, PoaRpcClient, LOCAL_ENDPOINT};

use crate::connection::BackendConnection;
use crate::fees::{FeeQuote, FeeStrategy, PoaFeeStrategy};
use anchor_types::{
	AdapterError, AdapterResult, AdapterState, AuthorityMetrics, BackendKind, Block, BlockTag,
	ChainAdapter, ContractCall, NetworkConfig, NetworkMetrics, ProofFormat, SigningRequirement,
	Transaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const BACKEND: BackendKind = BackendKind::Poa;

/// Adapter for a proof-of-authority node.
#[derive(Debug)]
pub struct PoaAdapter {
	connection: BackendConnection<dyn PoaClient>,
	fees: PoaFeeStrategy,
	client_override: Option<Arc<dyn PoaClient>>,
}

impl Default for PoaAdapter {
	fn default() -> Self {
		Self::new()
	}
}

impl PoaAdapter {
	pub fn new() -> Self {
		Self {
			connection: BackendConnection::new(BACKEND),
			fees: PoaFeeStrategy,
			client_override: None,
		}
	}

	/// Uses `client` instead of building RPC clients from the configured endpoints.
	pub fn with_client(client: Arc<dyn PoaClient>) -> Self {
		Self {
			client_override: Some(client),
			..Self::new()
		}
	}

	fn client(&self, operation: &'static str) -> AdapterResult<&Arc<dyn PoaClient>> {
		self.connection.client(operation)
	}
}

#[async_trait]
impl ChainAdapter for PoaAdapter {
	fn backend(&self) -> BackendKind {
		BACKEND
	}

	fn state(&self) -> AdapterState {
		self.connection.state()
	}

	async fn initialize(&mut self, config: NetworkConfig) -> AdapterResult<()> {
		config.validate_for(BACKEND, SigningRequirement::Delegated)?;

		let clients: Vec<Arc<dyn PoaClient>> = match &self.client_override {
			Some(client) => vec![client.clone()],
			None => config
				.endpoints
				.iter()
				.map(|endpoint| {
					PoaRpcClient::new(endpoint, config.timeout())
						.map(|c| Arc::new(c) as Arc<dyn PoaClient>)
						.map_err(|e| AdapterError::BackendUnavailable {
							backend: BACKEND,
							reason: e.to_string(),
						})
				})
				.collect::<AdapterResult<_>>()?,
		};

		self.connection.initialize(config, clients)
	}

	async fn connect(&mut self) -> AdapterResult<()> {
		self.connection.connect().await
	}

	async fn disconnect(&mut self) {
		self.connection.disconnect().await
	}

	async fn submit_transaction(&self, tx: Transaction) -> AdapterResult<String> {
		let client = self.client("submit_transaction")?;
		let chain_id = self.connection.node_info().and_then(|n| n.chain_id);
		let prepared = self.fees.prepare(&tx, &FeeQuote::default(), chain_id)?;

		let id = client
			.submit_transaction(&prepared)
			.await
			.map_err(|source| AdapterError::Submission {
				backend: BACKEND,
				source,
			})?;

		info!("Submitted PoA transaction {} to {}", id, prepared.to);
		Ok(id)
	}

	async fn call_contract(&self, call: ContractCall) -> AdapterResult<Value> {
		let client = self.client("call_contract")?;
		call.check().map_err(|reason| AdapterError::call(BACKEND, reason))?;

		debug!("Calling {} on {}", call.method, call.address);
		client
			.call(&call)
			.await
			.map_err(|source| AdapterError::Call {
				backend: BACKEND,
				source,
			})
	}

	async fn get_block(&self, block: BlockTag) -> AdapterResult<Block> {
		let client = self.client("get_block")?;

		match client.block(block).await {
			Ok(Some(found)) => Ok(found),
			Ok(None) => Err(AdapterError::NotFound {
				backend: BACKEND,
				what: format!("block {}", block),
			}),
			Err(e) => Err(AdapterError::Connection {
				backend: BACKEND,
				reason: format!("block {}: {}", block, e),
			}),
		}
	}

	async fn get_metrics(&self) -> AdapterResult<NetworkMetrics> {
		let client = self.client("get_metrics")?;
		let unavailable = |reason: String| AdapterError::MetricsUnavailable {
			backend: BACKEND,
			reason,
		};

		let started = Instant::now();
		let report = client
			.network_report()
			.await
			.map_err(|e| unavailable(e.to_string()))?;
		let latency_ms = started.elapsed().as_millis() as u64;

		let missing = |field: &str| unavailable(format!("node did not report {}", field));
		Ok(NetworkMetrics::Authority(AuthorityMetrics {
			average_block_time_secs: report
				.average_block_time
				.ok_or_else(|| missing("average block time"))?,
			throughput_tps: report.throughput.ok_or_else(|| missing("throughput"))?,
			validator_count: report
				.validator_count
				.ok_or_else(|| missing("validator count"))?,
			latency_ms,
		}))
	}

	async fn generate_proof(&self, data: &Value) -> AdapterResult<ProofFormat> {
		let client = self.client("generate_proof")?;

		let attestation =
			client
				.generate_proof(data)
				.await
				.map_err(|e| AdapterError::ProofGeneration {
					backend: BACKEND,
					reason: e.to_string(),
				})?;

		Ok(ProofFormat {
			backend: BACKEND,
			payload: attestation.payload,
			signature: attestation.signature,
			signer: attestation.signer,
			chain_id: self.connection.node_info().and_then(|n| n.chain_id),
		})
	}

	async fn verify_proof(&self, proof: &ProofFormat) -> AdapterResult<bool> {
		let client = self.client("verify_proof")?;
		let verifier = self
			.connection
			.connected_config("verify_proof")?
			.verifier
			.as_deref();
		if !proof.is_well_formed_for(BACKEND) {
			return Ok(false);
		}
		if let (Some(expected), Some(signer)) = (verifier, proof.signer.as_deref()) {
			if expected != signer {
				debug!("Proof signed by {}, expected {}", signer, expected);
				return Ok(false);
			}
		}

		match client
			.verify_proof(&proof.payload, &proof.signature, verifier)
			.await
		{
			Ok(valid) => Ok(valid),
			// A rejection or an undecodable answer both mean the node did not accept it.
			Err(e) if !e.transient => {
				debug!("Node did not accept proof: {}", e);
				Ok(false)
			}
			Err(e) => Err(AdapterError::Connection {
				backend: BACKEND,
				reason: e.to_string(),
			}),
		}
	}
}
