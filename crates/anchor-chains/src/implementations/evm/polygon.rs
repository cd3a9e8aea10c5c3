//! Polygon-style backend adapter.
//!
//! `max_fee = 2 × base_fee` with a fixed priority fee. Calls accept a JSON ABI
//! or a human-readable signature in the method field. Active nodes are the
//! current validator set size.
//!
//! Nonces are filled from the account's pending transaction count at each
//! submission unless the transaction carries one, so concurrent submissions
//! from one key must be serialized by the caller.

use super::abi::AbiSource;
use super::{EvmClient, EvmCore, NodeCount};
use crate::fees::{FeeQuote, PolygonFeeStrategy};
use anchor_types::{
	AdapterResult, AdapterState, BackendKind, Block, BlockTag, ChainAdapter, ContractCall,
	NetworkConfig, NetworkMetrics, ProofFormat, Transaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug)]
pub struct PolygonAdapter {
	core: EvmCore<PolygonFeeStrategy>,
}

impl Default for PolygonAdapter {
	fn default() -> Self {
		Self::new()
	}
}

impl PolygonAdapter {
	pub fn new() -> Self {
		Self {
			core: EvmCore::new(
				PolygonFeeStrategy,
				AbiSource::JsonOrSignature,
				NodeCount::Validators,
			),
		}
	}

	pub fn with_client(client: Arc<dyn EvmClient>) -> Self {
		Self {
			core: EvmCore::new(
				PolygonFeeStrategy,
				AbiSource::JsonOrSignature,
				NodeCount::Validators,
			)
			.with_client(client),
		}
	}
}

#[async_trait]
impl ChainAdapter for PolygonAdapter {
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
		let base_fee = client
			.base_fee()
			.await
			.map_err(|e| self.core.submission_error(e))?;

		let quote = FeeQuote {
			base_fee,
			eip1559: None,
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
