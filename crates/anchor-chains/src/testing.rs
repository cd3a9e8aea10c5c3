//! In-memory backend clients for adapter tests.

use crate::connection::{BackendClient, NodeInfo};
use crate::implementations::evm::EvmClient;
use crate::implementations::poa::{PoaAttestation, PoaClient, PoaNetworkReport};
use anchor_types::{
	BackendError, BackendResult, Block, BlockTag, ContractCall, PreparedTransaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Identity the mock PoA node signs proofs as.
pub const AUTHORITY: &str = "authority-1";

/// A PoA node that includes every submitted transaction in the next block.
#[derive(Debug)]
pub struct MockPoaClient {
	pub chain_id: Option<u64>,
	pub next_tx_id: String,
	pub report: PoaNetworkReport,
	pub reject_verification: bool,
	pub fail_transport: bool,
	pub submitted: Mutex<Vec<PreparedTransaction>>,
	blocks: Mutex<Vec<Block>>,
}

impl Default for MockPoaClient {
	fn default() -> Self {
		Self {
			chain_id: Some(1337),
			next_tx_id: "0xabc".to_string(),
			report: PoaNetworkReport {
				average_block_time: Some(5.0),
				throughput: Some(42.5),
				validator_count: Some(4),
			},
			reject_verification: false,
			fail_transport: false,
			submitted: Mutex::new(Vec::new()),
			blocks: Mutex::new(vec![Block {
				number: 0,
				hash: "0x00".to_string(),
				timestamp: 1_700_000_000,
				transactions: Vec::new(),
			}]),
		}
	}
}

impl MockPoaClient {
	fn transport(&self) -> BackendResult<()> {
		if self.fail_transport {
			Err(BackendError::transient("connection reset by peer"))
		} else {
			Ok(())
		}
	}
}

#[async_trait]
impl BackendClient for MockPoaClient {
	fn endpoint(&self) -> &str {
		"local"
	}

	async fn handshake(&self) -> BackendResult<NodeInfo> {
		self.transport()?;
		Ok(NodeInfo {
			chain_id: self.chain_id,
			client_version: Some("mock-poa/1.0".to_string()),
		})
	}
}

#[async_trait]
impl PoaClient for MockPoaClient {
	async fn submit_transaction(&self, tx: &PreparedTransaction) -> BackendResult<String> {
		self.transport()?;
		self.submitted.lock().unwrap().push(tx.clone());

		let mut blocks = self.blocks.lock().unwrap();
		let parent = blocks.last().cloned().unwrap();
		blocks.push(Block {
			number: parent.number + 1,
			hash: format!("0x{:02x}", parent.number + 1),
			timestamp: parent.timestamp + 5,
			transactions: vec![self.next_tx_id.clone()],
		});
		Ok(self.next_tx_id.clone())
	}

	async fn call(&self, call: &ContractCall) -> BackendResult<Value> {
		self.transport()?;
		Ok(serde_json::json!({"method": call.method, "params": call.params}))
	}

	async fn block(&self, tag: BlockTag) -> BackendResult<Option<Block>> {
		self.transport()?;
		let blocks = self.blocks.lock().unwrap();
		Ok(match tag {
			BlockTag::Latest => blocks.last().cloned(),
			BlockTag::Number(n) => blocks.iter().find(|b| b.number == n).cloned(),
		})
	}

	async fn network_report(&self) -> BackendResult<PoaNetworkReport> {
		self.transport()?;
		Ok(self.report.clone())
	}

	async fn generate_proof(&self, data: &Value) -> BackendResult<PoaAttestation> {
		self.transport()?;
		let payload = serde_json::to_vec(data).unwrap();
		let signature = payload.iter().rev().copied().collect();
		Ok(PoaAttestation {
			payload,
			signature,
			signer: Some(AUTHORITY.to_string()),
		})
	}

	async fn verify_proof(
		&self,
		payload: &[u8],
		signature: &[u8],
		verifier: Option<&str>,
	) -> BackendResult<bool> {
		self.transport()?;
		if self.reject_verification {
			return Err(BackendError::rejected(-32602, "invalid proof encoding"));
		}
		if verifier.is_some_and(|v| v != AUTHORITY) {
			return Ok(false);
		}
		Ok(payload.iter().rev().copied().eq(signature.iter().copied()))
	}
}

/// An EVM node with a fixed chain of blocks spaced `block_time` seconds apart.
#[derive(Debug)]
pub struct MockEvmClient {
	pub chain_id: u64,
	pub latest: u64,
	pub block_time: u64,
	pub txs_per_block: usize,
	pub base_fee: Option<u128>,
	pub fee_estimate: Option<(u128, u128)>,
	pub gas_price: u128,
	pub peers: u64,
	pub validators: Option<u64>,
	pub call_results: BTreeMap<String, Vec<u8>>,
	/// Returned by every block read when set.
	pub block_error: Option<BackendError>,
	pub sent: Mutex<Vec<PreparedTransaction>>,
}

impl Default for MockEvmClient {
	fn default() -> Self {
		Self {
			chain_id: 1,
			latest: 1_000,
			block_time: 12,
			txs_per_block: 3,
			base_fee: Some(10_000_000_000),
			fee_estimate: Some((40_000_000_000, 1_500_000_000)),
			gas_price: 20_000_000_000,
			peers: 25,
			validators: None,
			call_results: BTreeMap::new(),
			block_error: None,
			sent: Mutex::new(Vec::new()),
		}
	}
}

impl MockEvmClient {
	fn make_block(&self, number: u64) -> Block {
		Block {
			number,
			hash: format!("0x{:064x}", number),
			timestamp: 1_600_000_000 + number * self.block_time,
			transactions: (0..self.txs_per_block)
				.map(|i| format!("0x{:062x}{:02x}", number, i))
				.collect(),
		}
	}
}

#[async_trait]
impl BackendClient for MockEvmClient {
	fn endpoint(&self) -> &str {
		"mock-evm"
	}

	async fn handshake(&self) -> BackendResult<NodeInfo> {
		Ok(NodeInfo {
			chain_id: Some(self.chain_id),
			client_version: Some("mock-geth/1.14".to_string()),
		})
	}
}

#[async_trait]
impl EvmClient for MockEvmClient {
	async fn block_number(&self) -> BackendResult<u64> {
		Ok(self.latest)
	}

	async fn block(&self, tag: BlockTag) -> BackendResult<Option<Block>> {
		if let Some(err) = &self.block_error {
			return Err(err.clone());
		}
		let number = match tag {
			BlockTag::Latest => self.latest,
			BlockTag::Number(n) if n <= self.latest => n,
			BlockTag::Number(_) => return Ok(None),
		};
		Ok(Some(self.make_block(number)))
	}

	async fn base_fee(&self) -> BackendResult<Option<u128>> {
		Ok(self.base_fee)
	}

	async fn fee_estimate(&self) -> BackendResult<Option<(u128, u128)>> {
		Ok(self.fee_estimate)
	}

	async fn gas_price(&self) -> BackendResult<u128> {
		Ok(self.gas_price)
	}

	async fn send_transaction(&self, tx: &PreparedTransaction) -> BackendResult<String> {
		let mut sent = self.sent.lock().unwrap();
		sent.push(tx.clone());
		Ok(format!("0x{:064x}", sent.len()))
	}

	async fn call(&self, to: &str, calldata: &[u8]) -> BackendResult<Vec<u8>> {
		let selector = hex::encode(&calldata[..4.min(calldata.len())]);
		self.call_results
			.get(&selector)
			.cloned()
			.ok_or_else(|| BackendError::rejected(3, format!("execution reverted at {}", to)))
	}

	async fn peer_count(&self) -> BackendResult<u64> {
		Ok(self.peers)
	}

	async fn validator_count(&self) -> BackendResult<u64> {
		self.validators
			.ok_or_else(|| BackendError::rejected(-32601, "method not found"))
	}
}
