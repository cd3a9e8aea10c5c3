//! JSON-RPC client for proof-of-authority nodes.

use crate::connection::{BackendClient, NodeInfo};
use anchor_types::{
	serde_helpers::hex_bytes, BackendError, BackendResult, Block, BlockTag, ContractCall,
	PreparedTransaction,
};
use async_trait::async_trait;
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Endpoint used when a config names the `local` node.
pub const LOCAL_ENDPOINT: &str = "http://127.0.0.1:8545";

/// JSON-RPC code nodes use for rate limiting.
const LIMIT_EXCEEDED: i64 = -32005;

/// Network report returned by `poa_networkMetrics`. Fields the node omits are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoaNetworkReport {
	#[serde(default, alias = "blockTime")]
	pub average_block_time: Option<f64>,
	#[serde(default, alias = "tps")]
	pub throughput: Option<f64>,
	#[serde(default, alias = "validators")]
	pub validator_count: Option<u64>,
}

/// Attestation produced by the node for `poa_generateProof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoaAttestation {
	#[serde(with = "hex_bytes")]
	pub payload: Vec<u8>,
	#[serde(with = "hex_bytes")]
	pub signature: Vec<u8>,
	#[serde(default)]
	pub signer: Option<String>,
}

/// Primitives a PoA node supplies.
#[async_trait]
pub trait PoaClient: BackendClient + std::fmt::Debug {
	async fn submit_transaction(&self, tx: &PreparedTransaction) -> BackendResult<String>;

	async fn call(&self, call: &ContractCall) -> BackendResult<Value>;

	/// `None` when the block does not exist yet.
	async fn block(&self, tag: BlockTag) -> BackendResult<Option<Block>>;

	async fn network_report(&self) -> BackendResult<PoaNetworkReport>;

	async fn generate_proof(&self, data: &Value) -> BackendResult<PoaAttestation>;

	/// Asks the node whether `signature` attests `payload`, optionally
	/// requiring that `verifier` produced it.
	async fn verify_proof(
		&self,
		payload: &[u8],
		signature: &[u8],
		verifier: Option<&str>,
	) -> BackendResult<bool>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNodeInfo {
	#[serde(default)]
	chain_id: Option<u64>,
	#[serde(default, alias = "clientVersion")]
	version: Option<String>,
}

/// `reqwest`-backed client for one node endpoint.
#[derive(Debug)]
pub struct PoaRpcClient {
	endpoint: String,
	url: Url,
	http: reqwest::Client,
	next_id: AtomicU64,
}

impl PoaRpcClient {
	/// Parses `endpoint` (or the `local` alias) and builds an HTTP client
	/// whose requests are bounded by `timeout`.
	pub fn new(endpoint: &str, timeout: Duration) -> BackendResult<Self> {
		let raw = match endpoint.trim() {
			"local" => LOCAL_ENDPOINT,
			other => other,
		};
		let url = Url::parse(raw)
			.map_err(|e| BackendError::new(format!("invalid endpoint {}: {}", endpoint, e)))?;

		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| BackendError::new(format!("failed to build HTTP client: {}", e)))?;

		Ok(Self {
			endpoint: endpoint.to_string(),
			url,
			http,
			next_id: AtomicU64::new(1),
		})
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	async fn request<R: DeserializeOwned>(&self, method: &str, params: Value) -> BackendResult<R> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		debug!("-> {} {} (id {})", self.endpoint, method, id);

		let response = self
			.http
			.post(self.url.clone())
			.json(&RpcRequest {
				jsonrpc: "2.0",
				id,
				method,
				params,
			})
			.send()
			.await
			.map_err(|e| BackendError::transient(format!("{} request failed: {}", method, e)))?;

		let status = response.status();
		if !status.is_success() {
			let message = format!("{} returned HTTP status {}", method, status);
			return Err(if status.is_server_error() || status.as_u16() == 429 {
				BackendError::transient(message)
			} else {
				BackendError::new(message)
			});
		}

		let body: RpcResponse = response
			.json()
			.await
			.map_err(|e| BackendError::transient(format!("{} response unreadable: {}", method, e)))?;

		if let Some(error) = body.error {
			let mut rejected = BackendError::rejected(error.code, error.message);
			rejected.transient = error.code == LIMIT_EXCEEDED;
			return Err(rejected);
		}

		serde_json::from_value(body.result.unwrap_or(Value::Null))
			.map_err(|e| BackendError::new(format!("{} result malformed: {}", method, e)))
	}
}

#[async_trait]
impl BackendClient for PoaRpcClient {
	fn endpoint(&self) -> &str {
		&self.endpoint
	}

	async fn handshake(&self) -> BackendResult<NodeInfo> {
		let info: RawNodeInfo = self.request("poa_nodeInfo", json!([])).await?;
		Ok(NodeInfo {
			chain_id: info.chain_id,
			client_version: info.version,
		})
	}
}

#[async_trait]
impl PoaClient for PoaRpcClient {
	async fn submit_transaction(&self, tx: &PreparedTransaction) -> BackendResult<String> {
		self.request("poa_submitTransaction", json!([tx])).await
	}

	async fn call(&self, call: &ContractCall) -> BackendResult<Value> {
		self.request("poa_call", json!([call])).await
	}

	async fn block(&self, tag: BlockTag) -> BackendResult<Option<Block>> {
		self.request("poa_getBlockByNumber", json!([tag])).await
	}

	async fn network_report(&self) -> BackendResult<PoaNetworkReport> {
		self.request("poa_networkMetrics", json!([])).await
	}

	async fn generate_proof(&self, data: &Value) -> BackendResult<PoaAttestation> {
		self.request("poa_generateProof", json!([data])).await
	}

	async fn verify_proof(
		&self,
		payload: &[u8],
		signature: &[u8],
		verifier: Option<&str>,
	) -> BackendResult<bool> {
		let mut proof = json!({
			"payload": format!("0x{}", hex::encode(payload)),
			"signature": format!("0x{}", hex::encode(signature)),
		});
		if let Some(verifier) = verifier {
			proof["verifier"] = json!(verifier);
		}
		self.request("poa_verifyProof", json!([proof])).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anchor_types::{FeeFields, TxType};
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn rpc_result(result: Value) -> ResponseTemplate {
		ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
	}

	fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
		ResponseTemplate::new(200).set_body_json(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"error": {"code": code, "message": message}
		}))
	}

	async fn client(server: &MockServer) -> PoaRpcClient {
		PoaRpcClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
	}

	#[test]
	fn test_local_alias_and_invalid_endpoint() {
		let local = PoaRpcClient::new("local", Duration::from_secs(1)).unwrap();
		assert_eq!(local.url().as_str(), "http://127.0.0.1:8545/");
		assert_eq!(local.endpoint(), "local");

		assert!(PoaRpcClient::new("not a url", Duration::from_secs(1)).is_err());
	}

	#[tokio::test]
	async fn test_handshake_reads_node_info() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"jsonrpc": "2.0", "method": "poa_nodeInfo"})))
			.respond_with(rpc_result(json!({"chainId": 1337, "version": "poa-node/2.1.0"})))
			.mount(&server)
			.await;

		let info = client(&server).await.handshake().await.unwrap();
		assert_eq!(info.chain_id, Some(1337));
		assert_eq!(info.client_version.as_deref(), Some("poa-node/2.1.0"));
	}

	#[tokio::test]
	async fn test_submit_sends_prepared_transaction() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "poa_submitTransaction",
				"params": [{"gasLimit": 110, "fees": {"kind": "legacy", "gas_price": 0}}]
			})))
			.respond_with(rpc_result(json!("0xabc")))
			.expect(1)
			.mount(&server)
			.await;

		let tx = PreparedTransaction {
			to: "0xdead".to_string(),
			data: vec![0xca, 0xfe],
			value: 0,
			gas_limit: 110,
			fees: FeeFields::Legacy { gas_price: 0 },
			tx_type: TxType::Legacy,
			chain_id: None,
			nonce: None,
		};
		let id = client(&server).await.submit_transaction(&tx).await.unwrap();
		assert_eq!(id, "0xabc");
	}

	#[tokio::test]
	async fn test_rejection_keeps_code() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(rpc_error(-32000, "nonce too low"))
			.mount(&server)
			.await;

		let err = client(&server)
			.await
			.call(&ContractCall::new("0xdead", "balance"))
			.await
			.unwrap_err();
		assert_eq!(err.code, Some(-32000));
		assert_eq!(err.message, "nonce too low");
		assert!(!err.transient);
	}

	#[tokio::test]
	async fn test_server_error_is_transient() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		let err = client(&server).await.network_report().await.unwrap_err();
		assert!(err.transient);
		assert_eq!(err.code, None);
	}

	#[tokio::test]
	async fn test_missing_block_is_none() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "poa_getBlockByNumber", "params": [42]})))
			.respond_with(rpc_result(Value::Null))
			.mount(&server)
			.await;

		let block = client(&server).await.block(BlockTag::Number(42)).await.unwrap();
		assert!(block.is_none());
	}

	#[tokio::test]
	async fn test_latest_block_decodes() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"params": ["latest"]})))
			.respond_with(rpc_result(json!({
				"number": 9,
				"hash": "0x09",
				"timestamp": 1_700_000_000u64,
				"transactions": ["0xabc"]
			})))
			.mount(&server)
			.await;

		let block = client(&server)
			.await
			.block(BlockTag::Latest)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(block.number, 9);
		assert!(block.contains("0xabc"));
	}

	#[tokio::test]
	async fn test_verify_proof_sends_hex() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "poa_verifyProof",
				"params": [{"payload": "0x0102", "signature": "0xff"}]
			})))
			.respond_with(rpc_result(json!(true)))
			.mount(&server)
			.await;

		assert!(client(&server)
			.await
			.verify_proof(&[1, 2], &[0xff], None)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_verify_proof_sends_verifier() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "poa_verifyProof",
				"params": [{"payload": "0x01", "signature": "0x02", "verifier": "authority-1"}]
			})))
			.respond_with(rpc_result(json!(false)))
			.expect(1)
			.mount(&server)
			.await;

		assert!(!client(&server)
			.await
			.verify_proof(&[1], &[2], Some("authority-1"))
			.await
			.unwrap());
	}
}
