//! Alloy-backed EVM client.

use super::EvmClient;
use crate::connection::{BackendClient, NodeInfo};
use alloy::eips::BlockNumberOrTag;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, U256, U64};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::{http::reqwest::Url, TransportError};
use anchor_types::{BackendError, BackendResult, Block, BlockTag, FeeFields, PreparedTransaction};
use async_trait::async_trait;
use std::future::{Future, IntoFuture};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// JSON-RPC code nodes use for rate limiting.
const LIMIT_EXCEEDED: i64 = -32005;

/// One HTTP provider for one endpoint. Signs locally when a key is given.
pub struct AlloyClient {
	endpoint: String,
	provider: DynProvider,
	timeout: Duration,
}

impl AlloyClient {
	pub fn new(
		endpoint: &str,
		timeout: Duration,
		signer: Option<PrivateKeySigner>,
	) -> BackendResult<Self> {
		let url: Url = endpoint
			.trim()
			.parse()
			.map_err(|e| BackendError::new(format!("invalid endpoint {}: {}", endpoint, e)))?;

		let provider = match signer {
			Some(signer) => {
				debug!("Wallet configured for address: {}", signer.address());
				ProviderBuilder::new()
					.wallet(EthereumWallet::from(signer))
					.connect_http(url)
					.erased()
			}
			None => ProviderBuilder::new().connect_http(url).erased(),
		};

		Ok(Self {
			endpoint: endpoint.to_string(),
			provider,
			timeout,
		})
	}

	async fn bounded<T, F>(&self, method: &str, fut: F) -> BackendResult<T>
	where
		F: Future<Output = Result<T, TransportError>>,
	{
		match tokio::time::timeout(self.timeout, fut).await {
			Ok(result) => result.map_err(|e| classify(method, e)),
			Err(_) => Err(BackendError::transient(format!(
				"{} timed out after {:?}",
				method, self.timeout
			))),
		}
	}
}

/// Keeps the node's error code and marks transport failures as transient.
fn classify(method: &str, err: TransportError) -> BackendError {
	if let Some(resp) = err.as_error_resp() {
		let mut rejected = BackendError::rejected(resp.code, resp.message.to_string());
		rejected.transient = resp.code == LIMIT_EXCEEDED;
		return rejected;
	}

	if err.is_transport_error() {
		BackendError::transient(format!("{}: {}", method, err))
	} else {
		BackendError::new(format!("{}: {}", method, err))
	}
}

fn parse_address(value: &str) -> BackendResult<Address> {
	Address::from_str(value.trim())
		.map_err(|e| BackendError::new(format!("invalid address {}: {}", value, e)))
}

fn to_block_id(tag: BlockTag) -> BlockNumberOrTag {
	match tag {
		BlockTag::Latest => BlockNumberOrTag::Latest,
		BlockTag::Number(n) => BlockNumberOrTag::Number(n),
	}
}

#[async_trait]
impl BackendClient for AlloyClient {
	fn endpoint(&self) -> &str {
		&self.endpoint
	}

	async fn handshake(&self) -> BackendResult<NodeInfo> {
		let chain_id = self
			.bounded("eth_chainId", self.provider.get_chain_id())
			.await?;
		// Older nodes do not implement web3_clientVersion.
		let client_version = self
			.bounded("web3_clientVersion", self.provider.get_client_version())
			.await
			.ok();

		Ok(NodeInfo {
			chain_id: Some(chain_id),
			client_version,
		})
	}
}

#[async_trait]
impl EvmClient for AlloyClient {
	async fn block_number(&self) -> BackendResult<u64> {
		self.bounded("eth_blockNumber", self.provider.get_block_number())
			.await
	}

	async fn block(&self, tag: BlockTag) -> BackendResult<Option<Block>> {
		let block = self
			.bounded(
				"eth_getBlockByNumber",
				self.provider.get_block_by_number(to_block_id(tag)).into_future(),
			)
			.await?;

		Ok(block.map(|b| Block {
			number: b.header.inner.number,
			hash: format!("{:?}", b.header.hash),
			timestamp: b.header.inner.timestamp,
			transactions: b.transactions.hashes().map(|h| format!("{:?}", h)).collect(),
		}))
	}

	async fn base_fee(&self) -> BackendResult<Option<u128>> {
		let block = self
			.bounded(
				"eth_getBlockByNumber",
				self.provider
					.get_block_by_number(BlockNumberOrTag::Latest)
					.into_future(),
			)
			.await?;

		Ok(block.and_then(|b| b.header.inner.base_fee_per_gas.map(u128::from)))
	}

	async fn fee_estimate(&self) -> BackendResult<Option<(u128, u128)>> {
		match self
			.bounded("eth_feeHistory", self.provider.estimate_eip1559_fees())
			.await
		{
			Ok(fees) => Ok(Some((fees.max_fee_per_gas, fees.max_priority_fee_per_gas))),
			Err(e) if e.transient => Err(e),
			Err(e) => {
				debug!("EIP-1559 estimate unavailable: {}", e);
				Ok(None)
			}
		}
	}

	async fn gas_price(&self) -> BackendResult<u128> {
		self.bounded("eth_gasPrice", self.provider.get_gas_price())
			.await
	}

	async fn send_transaction(&self, tx: &PreparedTransaction) -> BackendResult<String> {
		let mut request = TransactionRequest::default()
			.with_to(parse_address(&tx.to)?)
			.with_input(tx.data.clone())
			.with_value(U256::from(tx.value))
			.with_gas_limit(tx.gas_limit);

		request = match tx.fees {
			FeeFields::Legacy { gas_price } => request.with_gas_price(gas_price),
			FeeFields::Dynamic {
				max_fee_per_gas,
				max_priority_fee_per_gas,
			} => request
				.with_max_fee_per_gas(max_fee_per_gas)
				.with_max_priority_fee_per_gas(max_priority_fee_per_gas),
		};
		if let Some(chain_id) = tx.chain_id {
			request = request.with_chain_id(chain_id);
		}
		if let Some(nonce) = tx.nonce {
			request = request.with_nonce(nonce);
		}
		request.transaction_type = Some(tx.tx_type.type_byte());

		let pending = self
			.bounded(
				"eth_sendRawTransaction",
				self.provider.send_transaction(request),
			)
			.await?;

		Ok(format!("{:?}", pending.tx_hash()))
	}

	async fn call(&self, to: &str, calldata: &[u8]) -> BackendResult<Vec<u8>> {
		let request = TransactionRequest::default()
			.with_to(parse_address(to)?)
			.with_input(calldata.to_vec());

		let output = self
			.bounded("eth_call", self.provider.call(request).into_future())
			.await?;
		Ok(output.to_vec())
	}

	async fn peer_count(&self) -> BackendResult<u64> {
		let peers: U64 = self
			.bounded(
				"net_peerCount",
				self.provider
					.raw_request::<_, U64>("net_peerCount".into(), [(); 0]),
			)
			.await?;
		Ok(peers.to::<u64>())
	}

	async fn validator_count(&self) -> BackendResult<u64> {
		let validators: Vec<serde_json::Value> = self
			.bounded(
				"bor_getCurrentValidators",
				self.provider.raw_request::<_, Vec<serde_json::Value>>(
					"bor_getCurrentValidators".into(),
					[(); 0],
				),
			)
			.await?;
		Ok(validators.len() as u64)
	}
}

impl std::fmt::Debug for AlloyClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AlloyClient")
			.field("endpoint", &self.endpoint)
			.field("timeout", &self.timeout)
			.finish()
	}
}
