//! Backend-token dispatch.

use crate::implementations::evm::{EthereumAdapter, PolygonAdapter};
use crate::implementations::poa::PoaAdapter;
use anchor_types::{AdapterError, AdapterResult, BackendKind, ChainAdapter, NetworkConfig};
use tracing::debug;

/// A fresh, uninitialized adapter for `backend`.
pub fn adapter_for(backend: BackendKind) -> Box<dyn ChainAdapter> {
	match backend {
		BackendKind::Poa => Box::new(PoaAdapter::new()),
		BackendKind::Polygon => Box::new(PolygonAdapter::new()),
		BackendKind::Ethereum => Box::new(EthereumAdapter::new()),
	}
}

/// Parses `token` and returns a fresh adapter for it.
///
/// `config` is only checked against the token here; pass it to
/// [`ChainAdapter::initialize`] to bring the adapter up. Nothing is cached,
/// and nothing is constructed for an unknown token.
pub fn create_adapter(token: &str, config: &NetworkConfig) -> AdapterResult<Box<dyn ChainAdapter>> {
	let backend = requested_backend(token, config)?;
	debug!("Creating {} adapter", backend);
	Ok(adapter_for(backend))
}

fn requested_backend(token: &str, config: &NetworkConfig) -> AdapterResult<BackendKind> {
	let backend: BackendKind = token.parse()?;

	if config.backend != backend {
		return Err(AdapterError::Configuration {
			backend,
			reason: format!(
				"requested {} adapter for a {} network config",
				backend, config.backend
			),
		});
	}
	Ok(backend)
}

/// [`create_adapter`] for EVM tokens, with `client` in place of the
/// endpoint clients.
#[cfg(test)]
pub(crate) fn create_evm_adapter_with_client(
	token: &str,
	config: &NetworkConfig,
	client: std::sync::Arc<dyn crate::implementations::evm::EvmClient>,
) -> AdapterResult<Box<dyn ChainAdapter>> {
	match requested_backend(token, config)? {
		BackendKind::Poa => Err(AdapterError::Configuration {
			backend: BackendKind::Poa,
			reason: "not an EVM backend".to_string(),
		}),
		BackendKind::Polygon => Ok(Box::new(PolygonAdapter::with_client(client))),
		BackendKind::Ethereum => Ok(Box::new(EthereumAdapter::with_client(client))),
	}
}
