//! Ethereum-compatible backend adapter.
//!
//! Fees come from the provider's EIP-1559 estimate, falling back to fixed
//! constants. Calls require a JSON ABI. Active nodes are the connected peer
//! count.
//!
//! Nonces are filled from the account's pending transaction count at each
//! submission unless the transaction carries one, so concurrent submissions
//! from one key must be serialized by the caller.

use super::abi::AbiSource;
use super::{EvmClient, EvmCore, NodeCount};
use crate::fees::{EthereumFeeStrategy, FeeQuote};
use anchor_types::{
	AdapterResult, AdapterState, BackendKind, Block, BlockTag, ChainAdapter, ContractCall,
	NetworkConfig, NetworkMetrics, ProofFormat, Transaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug)]
pub struct EthereumAdapter {
	core: EvmCore<EthereumFeeStrategy>,
}

impl Default for EthereumAdapter {
	fn default() -> Self {
		Self::new()
	}
}

impl EthereumAdapter {
	pub fn new() -> Self {
		Self {
			core: EvmCore::new(EthereumFeeStrategy, AbiSource::JsonOnly, NodeCount::Peers),
		}
	}

	/// Uses `client` instead of building providers from the configured endpoints.
	pub fn with_client(client: Arc<dyn EvmClient>) -> Self {
		Self {
			core: EvmCore::new(EthereumFeeStrategy, AbiSource::JsonOnly, NodeCount::Peers)
				.with_client(client),
		}
	}
}

#[async_trait]
impl ChainAdapter for EthereumAdapter {
	fn backend(&self) -> BackendKind {
		self.core.backend()
	}

	fn state(&self) -> AdapterState {
		self.core.state()
	}

	async fn initialize(&mut self, config: NetworkConfig) -> AdapterResult<()> {
		self.core.initialize(config).await
	}

	async fn connect(&mut self) -> AdapterResult<()> {
		self.core.connect().await
	}

	async fn disconnect(&mut self) {
		self.core.disconnect().await
	}

	async fn submit_transaction(&self, tx: Transaction) -> AdapterResult<String> {
		let client = self.core.client("submit_transaction")?;
		let estimate = client
			.fee_estimate()
			.await
			.map_err(|e| self.core.submission_error(e))?;

		let quote = FeeQuote {
			base_fee: None,
			eip1559: estimate,
		};
		self.core.dispatch(tx, quote).await
	}

	async fn call_contract(&self, call: ContractCall) -> AdapterResult<Value> {
		self.core.call_contract(call).await
	}

	async fn get_block(&self, block: BlockTag) -> AdapterResult<Block> {
		self.core.get_block(block).await
	}

	async fn get_metrics(&self) -> AdapterResult<NetworkMetrics> {
		self.core.get_metrics().await
	}

	async fn generate_proof(&self, data: &Value) -> AdapterResult<ProofFormat> {
		self.core.generate_proof(data)
	}

	async fn verify_proof(&self, proof: &ProofFormat) -> AdapterResult<bool> {
		self.core.verify_proof(proof)
	}
}
