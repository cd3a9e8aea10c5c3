//! Connection lifecycle shared by every backend.
//!
//! A `BackendConnection` owns the candidate clients built during `initialize`,
//! picks the first endpoint that answers a handshake during `connect`, and
//! closes it within the configured timeout on `disconnect`.

use anchor_types::{AdapterError, AdapterResult, AdapterState, BackendKind, BackendResult, NetworkConfig};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a node reports about itself during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
	pub chain_id: Option<u64>,
	pub client_version: Option<String>,
}

/// Low-level primitives every backend client supplies.
#[async_trait]
pub trait BackendClient: Send + Sync {
	/// Endpoint this client talks to, for logs and errors.
	fn endpoint(&self) -> &str;

	/// Proves the endpoint is reachable and reports its identity.
	async fn handshake(&self) -> BackendResult<NodeInfo>;

	/// Releases transport resources.
	async fn close(&self) -> BackendResult<()> {
		Ok(())
	}
}

/// Lifecycle state plus the active client for one backend.
pub struct BackendConnection<C: ?Sized> {
	backend: BackendKind,
	state: AdapterState,
	config: Option<NetworkConfig>,
	candidates: Vec<Arc<C>>,
	active: Option<Arc<C>>,
	node: Option<NodeInfo>,
}

impl<C: ?Sized + BackendClient> BackendConnection<C> {
	pub fn new(backend: BackendKind) -> Self {
		Self {
			backend,
			state: AdapterState::Uninitialized,
			config: None,
			candidates: Vec::new(),
			active: None,
			node: None,
		}
	}

	pub fn backend(&self) -> BackendKind {
		self.backend
	}

	pub fn state(&self) -> AdapterState {
		self.state
	}

	pub fn node_info(&self) -> Option<&NodeInfo> {
		self.node.as_ref()
	}

	/// Stores the config and candidate clients. Rejected while connected.
	pub fn initialize(&mut self, config: NetworkConfig, candidates: Vec<Arc<C>>) -> AdapterResult<()> {
		if self.state == AdapterState::Connected {
			return Err(AdapterError::Configuration {
				backend: self.backend,
				reason: "cannot re-initialize a connected adapter; disconnect first".to_string(),
			});
		}

		if candidates.is_empty() {
			return Err(AdapterError::BackendUnavailable {
				backend: self.backend,
				reason: "no backend client could be constructed".to_string(),
			});
		}

		info!(
			"Initialized {} adapter with {} endpoint(s)",
			self.backend,
			candidates.len()
		);

		self.config = Some(config);
		self.candidates = candidates;
		self.active = None;
		self.node = None;
		self.state = AdapterState::Initialized;
		Ok(())
	}

	/// Handshakes each candidate in order; the first that answers becomes active.
	pub async fn connect(&mut self) -> AdapterResult<()> {
		let config = match (&self.state, &self.config) {
			(AdapterState::Connected, _) => return Ok(()),
			(AdapterState::Uninitialized, _) | (_, None) => {
				return Err(AdapterError::Connection {
					backend: self.backend,
					reason: "initialize must succeed before connect".to_string(),
				})
			}
			(_, Some(config)) => config.clone(),
		};

		let timeout = config.timeout();
		let mut failures = Vec::new();

		for client in &self.candidates {
			debug!("Connecting {} adapter to {}", self.backend, client.endpoint());

			let node = match tokio::time::timeout(timeout, client.handshake()).await {
				Ok(Ok(node)) => node,
				Ok(Err(e)) => {
					warn!("Handshake with {} failed: {}", client.endpoint(), e);
					failures.push(format!("{}: {}", client.endpoint(), e));
					continue;
				}
				Err(_) => {
					warn!(
						"Handshake with {} timed out after {}ms",
						client.endpoint(),
						config.timeout_ms
					);
					failures.push(format!(
						"{}: timed out after {}ms",
						client.endpoint(),
						config.timeout_ms
					));
					continue;
				}
			};

			if let (Some(expected), Some(actual)) = (config.chain_id, node.chain_id) {
				if expected != actual {
					return Err(AdapterError::Connection {
						backend: self.backend,
						reason: format!(
							"chain id mismatch at {}: expected {}, got {}",
							client.endpoint(),
							expected,
							actual
						),
					});
				}
			}

			if let (Some(expected), Some(actual)) = (&config.version, &node.client_version) {
				if !version_matches(expected, actual) {
					warn!(
						"{} node at {} reports version {}, configured {}",
						self.backend,
						client.endpoint(),
						actual,
						expected
					);
				}
			}

			info!(
				"Connected {} adapter to {} (chain id {:?})",
				self.backend,
				client.endpoint(),
				node.chain_id
			);

			self.active = Some(client.clone());
			self.node = Some(node);
			self.state = AdapterState::Connected;
			return Ok(());
		}

		Err(AdapterError::Connection {
			backend: self.backend,
			reason: format!("no endpoint reachable: {}", failures.join("; ")),
		})
	}

	/// Closes the active client within the configured timeout. Never fails.
	pub async fn disconnect(&mut self) {
		let Some(client) = self.active.take() else {
			if self.state != AdapterState::Uninitialized {
				self.state = AdapterState::Disconnected;
			}
			debug!("{} adapter has no active connection to close", self.backend);
			return;
		};

		let timeout = self
			.config
			.as_ref()
			.map(NetworkConfig::timeout)
			.unwrap_or_else(|| std::time::Duration::from_millis(anchor_types::DEFAULT_TIMEOUT_MS));

		match tokio::time::timeout(timeout, client.close()).await {
			Ok(Ok(())) => info!("Disconnected {} adapter from {}", self.backend, client.endpoint()),
			Ok(Err(e)) => warn!("Closing {} connection failed: {}", self.backend, e),
			Err(_) => warn!(
				"Closing {} connection timed out after {:?}",
				self.backend, timeout
			),
		}

		self.node = None;
		self.state = AdapterState::Disconnected;
	}

	/// The active client, or `NotConnected` for `operation`.
	pub fn client(&self, operation: &'static str) -> AdapterResult<&Arc<C>> {
		self.state.require_connected(self.backend, operation)?;
		self.active.as_ref().ok_or(AdapterError::NotConnected {
			backend: self.backend,
			operation,
			state: self.state,
		})
	}

	/// The config of a connected adapter.
	pub(crate) fn connected_config(&self, operation: &'static str) -> AdapterResult<&NetworkConfig> {
		self.client(operation)?;
		self.config.as_ref().ok_or(AdapterError::NotConnected {
			backend: self.backend,
			operation,
			state: self.state,
		})
	}
}

/// A configured version matches any client string that mentions it, so
/// `1.14` accepts `Geth/v1.14.8-stable/linux-amd64`.
fn version_matches(configured: &str, reported: &str) -> bool {
	reported.contains(configured)
}

impl<C: ?Sized> fmt::Debug for BackendConnection<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BackendConnection")
			.field("backend", &self.backend)
			.field("state", &self.state)
			.field("candidates", &self.candidates.len())
			.field("connected", &self.active.is_some())
			.field("node", &self.node)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anchor_types::BackendError;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	struct StubClient {
		endpoint: String,
		reachable: bool,
		chain_id: Option<u64>,
		hang_on_close: bool,
		closes: AtomicUsize,
	}

	impl StubClient {
		fn new(endpoint: &str, reachable: bool) -> Self {
			Self {
				endpoint: endpoint.to_string(),
				reachable,
				chain_id: Some(7),
				hang_on_close: false,
				closes: AtomicUsize::new(0),
			}
		}
	}

	#[async_trait]
	impl BackendClient for StubClient {
		fn endpoint(&self) -> &str {
			&self.endpoint
		}

		async fn handshake(&self) -> BackendResult<NodeInfo> {
			if self.reachable {
				Ok(NodeInfo {
					chain_id: self.chain_id,
					client_version: Some("stub/1.0".to_string()),
				})
			} else {
				Err(BackendError::transient("connection refused"))
			}
		}

		async fn close(&self) -> BackendResult<()> {
			self.closes.fetch_add(1, Ordering::SeqCst);
			if self.hang_on_close {
				tokio::time::sleep(Duration::from_secs(3600)).await;
			}
			Ok(())
		}
	}

	fn config() -> NetworkConfig {
		NetworkConfig::new(BackendKind::Poa, ["a", "b"]).with_timeout_ms(50)
	}

	#[tokio::test]
	async fn test_connect_before_initialize_fails() {
		let mut connection = BackendConnection::<StubClient>::new(BackendKind::Poa);
		let err = connection.connect().await.unwrap_err();
		assert!(matches!(err, AdapterError::Connection { .. }));
		assert_eq!(connection.state(), AdapterState::Uninitialized);
	}

	#[tokio::test]
	async fn test_connect_fails_over_to_next_endpoint() {
		let mut connection = BackendConnection::new(BackendKind::Poa);
		let first = Arc::new(StubClient::new("a", false));
		let second = Arc::new(StubClient::new("b", true));
		connection
			.initialize(config(), vec![first, second])
			.unwrap();

		connection.connect().await.unwrap();
		assert_eq!(connection.state(), AdapterState::Connected);
		assert_eq!(connection.client("test").unwrap().endpoint(), "b");
	}

	#[tokio::test]
	async fn test_connect_reports_all_failures() {
		let mut connection = BackendConnection::new(BackendKind::Poa);
		connection
			.initialize(
				config(),
				vec![
					Arc::new(StubClient::new("a", false)),
					Arc::new(StubClient::new("b", false)),
				],
			)
			.unwrap();

		match connection.connect().await {
			Err(AdapterError::Connection { reason, .. }) => {
				assert!(reason.contains("a:"));
				assert!(reason.contains("b:"));
			}
			other => panic!("unexpected result: {:?}", other),
		}
		assert!(connection.client("test").is_err());
	}

	#[tokio::test]
	async fn test_chain_id_mismatch_rejected() {
		let mut connection = BackendConnection::new(BackendKind::Poa);
		connection
			.initialize(
				config().with_chain_id(99),
				vec![Arc::new(StubClient::new("a", true))],
			)
			.unwrap();

		let err = connection.connect().await.unwrap_err();
		assert!(err.to_string().contains("chain id mismatch"));
	}

	#[test]
	fn test_version_matching() {
		assert!(version_matches("1.14", "Geth/v1.14.8-stable/linux-amd64"));
		assert!(version_matches("stub/1.0", "stub/1.0"));
		assert!(!version_matches("2.0", "stub/1.0"));
	}

	#[tokio::test]
	async fn test_version_mismatch_only_warns() {
		let mut connection = BackendConnection::new(BackendKind::Poa);
		let configured = config().with_version("2.0");
		assert!(!version_matches("2.0", "stub/1.0"));
		connection
			.initialize(configured, vec![Arc::new(StubClient::new("a", true))])
			.unwrap();

		connection.connect().await.unwrap();
		assert_eq!(connection.state(), AdapterState::Connected);
		assert_eq!(
			connection.node_info().and_then(|n| n.client_version.as_deref()),
			Some("stub/1.0")
		);
		assert_eq!(
			connection.connected_config("test").unwrap().version.as_deref(),
			Some("2.0")
		);
	}

	#[tokio::test]
	async fn test_disconnect_is_idempotent_and_bounded() {
		let mut connection = BackendConnection::new(BackendKind::Poa);

		// Never initialized.
		connection.disconnect().await;
		connection.disconnect().await;
		assert_eq!(connection.state(), AdapterState::Uninitialized);

		let mut hanging = StubClient::new("a", true);
		hanging.hang_on_close = true;
		let hanging = Arc::new(hanging);
		connection
			.initialize(config(), vec![hanging.clone()])
			.unwrap();
		connection.connect().await.unwrap();

		let started = std::time::Instant::now();
		connection.disconnect().await;
		assert!(started.elapsed() < Duration::from_secs(5));
		assert_eq!(connection.state(), AdapterState::Disconnected);
		assert_eq!(hanging.closes.load(Ordering::SeqCst), 1);

		connection.disconnect().await;
		assert_eq!(hanging.closes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_reinitialize_while_connected_rejected() {
		let mut connection = BackendConnection::new(BackendKind::Poa);
		connection
			.initialize(config(), vec![Arc::new(StubClient::new("a", true))])
			.unwrap();
		connection.connect().await.unwrap();

		let err = connection
			.initialize(config(), vec![Arc::new(StubClient::new("b", true))])
			.unwrap_err();
		assert!(matches!(err, AdapterError::Configuration { .. }));
	}
}
