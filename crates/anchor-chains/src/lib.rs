//! Chain adapters for the anchoring layer.
//!
//! Each backend is reached through a [`ChainAdapter`](anchor_types::ChainAdapter)
//! built by [`create_adapter`]. Underneath, an adapter combines a
//! [`BackendConnection`](connection::BackendConnection), a
//! [`FeeStrategy`](fees::FeeStrategy) and a [`ProofCodec`](proofs::ProofCodec).
//!
//! ```ignore
//! let mut adapter = create_adapter("POA", &config)?;
//! adapter.initialize(config).await?;
//! adapter.connect().await?;
//! let id = adapter.submit_transaction(tx).await?;
//! adapter.disconnect().await;
//! ```

pub mod connection;
pub mod factory;
pub mod fees;
pub mod implementations;
pub mod proofs;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{BackendClient, BackendConnection, NodeInfo};
pub use factory::{adapter_for, create_adapter};
pub use fees::{EthereumFeeStrategy, FeeQuote, FeeStrategy, PoaFeeStrategy, PolygonFeeStrategy};
pub use implementations::evm::{AlloyClient, EthereumAdapter, EvmClient, PolygonAdapter};
pub use implementations::poa::{PoaAdapter, PoaClient, PoaRpcClient};
pub use proofs::{ProofCodec, SignatureCodec};
pub use utils::{with_retry, RetryPolicy};
