//! Shared types for the chain adapter layer.
//!
//! This crate defines the data model exchanged with callers (`NetworkConfig`,
//! `Transaction`, `Block`, `NetworkMetrics`, `ProofFormat`), the error taxonomy,
//! and the `ChainAdapter` capability contract that every backend implements.

pub mod adapter;
pub mod block;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod proof;
pub mod serde_helpers;
pub mod transaction;

pub use adapter::{AdapterState, ChainAdapter};
pub use block::{Block, BlockTag};
pub use config::{BackendKind, NetworkConfig, SigningRequirement, DEFAULT_TIMEOUT_MS};
pub use errors::{AdapterError, AdapterResult, BackendError, BackendResult};
pub use metrics::{AuthorityMetrics, FeeMarketMetrics, NetworkMetrics};
pub use proof::ProofFormat;
pub use transaction::{ContractCall, FeeFields, PreparedTransaction, Transaction, TxType};
