//! EVM backends: Polygon and Ethereum.
//!
//! Both adapters share connection handling, block reads, metrics sampling and
//! the EIP-191 proof codec through [`EvmCore`]. They differ in fee strategy,
//! call encoding rules and how active nodes are counted.

pub mod abi;
mod alloy_client;
pub mod ethereum;
pub mod polygon;

pub use alloy_client::AlloyClient;
pub use ethereum::EthereumAdapter;
pub use polygon::PolygonAdapter;

use crate::connection::{BackendClient, BackendConnection};
use crate::fees::{FeeQuote, FeeStrategy};
use crate::proofs::{ProofCodec, SignatureCodec};
use abi::AbiSource;
use anchor_types::{
	AdapterError, AdapterResult, AdapterState, BackendKind, BackendResult, Block, BlockTag,
	ContractCall, FeeMarketMetrics, NetworkConfig, NetworkMetrics, PreparedTransaction,
	ProofFormat, SigningRequirement, Transaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Blocks between the two samples used for the average block time.
pub const SAMPLE_WINDOW: u64 = 100;

/// Primitives an EVM node supplies.
#[async_trait]
pub trait EvmClient: BackendClient + std::fmt::Debug {
	async fn block_number(&self) -> BackendResult<u64>;

	/// `None` when the block does not exist yet.
	async fn block(&self, tag: BlockTag) -> BackendResult<Option<Block>>;

	/// Base fee of the latest block, if the chain reports one.
	async fn base_fee(&self) -> BackendResult<Option<u128>>;

	/// Provider EIP-1559 estimate as `(max_fee, max_priority_fee)`.
	async fn fee_estimate(&self) -> BackendResult<Option<(u128, u128)>>;

	async fn gas_price(&self) -> BackendResult<u128>;

	/// Signs and broadcasts; returns the transaction hash once accepted.
	async fn send_transaction(&self, tx: &PreparedTransaction) -> BackendResult<String>;

	async fn call(&self, to: &str, calldata: &[u8]) -> BackendResult<Vec<u8>>;

	async fn peer_count(&self) -> BackendResult<u64>;

	async fn validator_count(&self) -> BackendResult<u64>;
}

/// How a backend reports its active node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeCount {
	Peers,
	Validators,
}

/// State and behaviour shared by the EVM adapters.
#[derive(Debug)]
pub(crate) struct EvmCore<F> {
	backend: BackendKind,
	connection: BackendConnection<dyn EvmClient>,
	fees: F,
	codec: Option<SignatureCodec>,
	abi_source: AbiSource,
	node_count: NodeCount,
	client_override: Option<Arc<dyn EvmClient>>,
}

impl<F: FeeStrategy> EvmCore<F> {
	pub(crate) fn new(fees: F, abi_source: AbiSource, node_count: NodeCount) -> Self {
		let backend = fees.backend();
		Self {
			backend,
			connection: BackendConnection::new(backend),
			fees,
			codec: None,
			abi_source,
			node_count,
			client_override: None,
		}
	}

	pub(crate) fn with_client(mut self, client: Arc<dyn EvmClient>) -> Self {
		self.client_override = Some(client);
		self
	}

	pub(crate) fn backend(&self) -> BackendKind {
		self.backend
	}

	pub(crate) fn state(&self) -> AdapterState {
		self.connection.state()
	}

	pub(crate) fn client(&self, operation: &'static str) -> AdapterResult<&Arc<dyn EvmClient>> {
		self.connection.client(operation)
	}

	pub(crate) async fn initialize(&mut self, config: NetworkConfig) -> AdapterResult<()> {
		config.validate_for(self.backend, SigningRequirement::Local)?;

		let codec = SignatureCodec::new(
			self.backend,
			config.private_key.as_deref(),
			config.verifier.as_deref(),
			config.chain_id,
		)?;

		let clients: Vec<Arc<dyn EvmClient>> = match &self.client_override {
			Some(client) => vec![client.clone()],
			None => config
				.endpoints
				.iter()
				.map(|endpoint| {
					AlloyClient::new(endpoint, config.timeout(), codec.signer().cloned())
						.map(|c| Arc::new(c) as Arc<dyn EvmClient>)
						.map_err(|e| AdapterError::BackendUnavailable {
							backend: self.backend,
							reason: e.to_string(),
						})
				})
				.collect::<AdapterResult<_>>()?,
		};

		self.connection.initialize(config, clients)?;
		if let Some(signer) = codec.signer_address() {
			info!("{} adapter signing as {}", self.backend, signer);
		}
		self.codec = Some(codec);
		Ok(())
	}

	pub(crate) async fn connect(&mut self) -> AdapterResult<()> {
		self.connection.connect().await
	}

	pub(crate) async fn disconnect(&mut self) {
		self.connection.disconnect().await
	}

	fn codec(&self, operation: &'static str) -> AdapterResult<&SignatureCodec> {
		self.client(operation)?;
		self.codec.as_ref().ok_or(AdapterError::NotConnected {
			backend: self.backend,
			operation,
			state: self.state(),
		})
	}

	/// Prices `tx` with `quote` and broadcasts it.
	pub(crate) async fn dispatch(&self, tx: Transaction, quote: FeeQuote) -> AdapterResult<String> {
		let client = self.client("submit_transaction")?;
		if self.codec("submit_transaction")?.signer().is_none() {
			return Err(AdapterError::submission(
				self.backend,
				"adapter is read-only: no signing key configured",
			));
		}

		let chain_id = self
			.connection
			.node_info()
			.and_then(|n| n.chain_id)
			.or(self.connection.connected_config("submit_transaction")?.chain_id);
		let prepared = self.fees.prepare(&tx, &quote, chain_id)?;

		let hash = client
			.send_transaction(&prepared)
			.await
			.map_err(|source| AdapterError::Submission {
				backend: self.backend,
				source,
			})?;

		info!("Submitted {} transaction {} to {}", self.backend, hash, prepared.to);
		Ok(hash)
	}

	pub(crate) fn submission_error(&self, source: anchor_types::BackendError) -> AdapterError {
		AdapterError::Submission {
			backend: self.backend,
			source,
		}
	}

	pub(crate) async fn call_contract(&self, call: ContractCall) -> AdapterResult<Value> {
		let client = self.client("call_contract")?;
		let backend = self.backend;
		call.check().map_err(|reason| AdapterError::call(backend, reason))?;

		let function = abi::resolve_function(&call, self.abi_source, backend.as_str())
			.map_err(|e| AdapterError::call(backend, e.to_string()))?;
		let calldata = abi::encode_call(&function, &call.params)
			.map_err(|e| AdapterError::call(backend, e.to_string()))?;

		debug!("Calling {} on {}", function.signature(), call.address);
		let output = client
			.call(&call.address, &calldata)
			.await
			.map_err(|source| AdapterError::Call { backend, source })?;

		abi::decode_output(&function, &output).map_err(|e| AdapterError::call(backend, e.to_string()))
	}

	pub(crate) async fn get_block(&self, tag: BlockTag) -> AdapterResult<Block> {
		let client = self.client("get_block")?;
		match client.block(tag).await {
			Ok(Some(block)) => Ok(block),
			Ok(None) => Err(AdapterError::NotFound {
				backend: self.backend,
				what: format!("block {}", tag),
			}),
			Err(e) => Err(AdapterError::Connection {
				backend: self.backend,
				reason: format!("block {}: {}", tag, e),
			}),
		}
	}

	/// Samples two blocks [`SAMPLE_WINDOW`] apart. Fails rather than report
	/// partial or undefined values.
	pub(crate) async fn get_metrics(&self) -> AdapterResult<NetworkMetrics> {
		let client = self.client("get_metrics")?;
		let backend = self.backend;
		let unavailable = |reason: String| AdapterError::MetricsUnavailable { backend, reason };

		let started = Instant::now();
		let latest = client
			.block_number()
			.await
			.map_err(|e| unavailable(e.to_string()))?;
		let latency_ms = started.elapsed().as_millis() as u64;

		if latest < SAMPLE_WINDOW {
			return Err(unavailable(format!(
				"chain has {} blocks, at least {} needed for block time",
				latest, SAMPLE_WINDOW
			)));
		}

		let fetch = |number: u64| async move {
			client
				.block(BlockTag::Number(number))
				.await
				.map_err(|e| unavailable(e.to_string()))?
				.ok_or_else(|| unavailable(format!("block {} missing", number)))
		};
		let head = fetch(latest).await?;
		let earlier = fetch(latest - SAMPLE_WINDOW).await?;

		if head.timestamp <= earlier.timestamp {
			return Err(unavailable(format!(
				"block timestamps do not increase ({} -> {})",
				earlier.timestamp, head.timestamp
			)));
		}
		let average_block_time_secs =
			(head.timestamp - earlier.timestamp) as f64 / SAMPLE_WINDOW as f64;
		let throughput_tps = head.transactions.len() as f64 / average_block_time_secs;

		let active_nodes = match self.node_count {
			NodeCount::Peers => client.peer_count().await,
			NodeCount::Validators => client.validator_count().await,
		}
		.map_err(|e| unavailable(format!("active node count: {}", e)))?;

		let gas_price = client
			.gas_price()
			.await
			.map_err(|e| unavailable(format!("gas price: {}", e)))?;
		let base_fee = client
			.base_fee()
			.await
			.map_err(|e| unavailable(format!("base fee: {}", e)))?;

		debug!(
			"{} metrics: block time {:.2}s over blocks {}..{}",
			backend,
			average_block_time_secs,
			latest - SAMPLE_WINDOW,
			latest
		);

		Ok(NetworkMetrics::FeeMarket(FeeMarketMetrics {
			average_block_time_secs,
			throughput_tps,
			active_nodes,
			latency_ms,
			gas_price,
			base_fee,
		}))
	}

	pub(crate) fn generate_proof(&self, data: &Value) -> AdapterResult<ProofFormat> {
		self.codec("generate_proof")?.generate(data)
	}

	pub(crate) fn verify_proof(&self, proof: &ProofFormat) -> AdapterResult<bool> {
		Ok(self.codec("verify_proof")?.verify(proof))
	}
}
