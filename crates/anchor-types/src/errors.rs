//! Error types for the adapter layer.

use std::fmt;
use thiserror::Error;

use crate::adapter::AdapterState;
use crate::config::BackendKind;

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failure reported by a backend client, keeping the backend's own classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
	/// JSON-RPC error code, when the backend returned one.
	pub code: Option<i64>,
	pub message: String,
	/// Transport-level failure that may succeed on retry.
	pub transient: bool,
}

impl BackendError {
	/// A permanent failure without a backend code (e.g. a local encoding problem).
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			code: None,
			message: message.into(),
			transient: false,
		}
	}

	/// A transport failure: timeout, refused connection, dropped socket.
	pub fn transient(message: impl Into<String>) -> Self {
		Self {
			code: None,
			message: message.into(),
			transient: true,
		}
	}

	/// An explicit rejection carrying the backend's error code.
	pub fn rejected(code: i64, message: impl Into<String>) -> Self {
		Self {
			code: Some(code),
			message: message.into(),
			transient: false,
		}
	}
}

impl fmt::Display for BackendError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.code {
			Some(code) => write!(f, "{} (code {})", self.message, code),
			None => f.write_str(&self.message),
		}
	}
}

#[derive(Error, Debug)]
pub enum AdapterError {
	#[error("{backend} configuration error: {reason}")]
	Configuration { backend: BackendKind, reason: String },

	#[error("{backend} backend unavailable: {reason}")]
	BackendUnavailable { backend: BackendKind, reason: String },

	#[error("{backend} connection error: {reason}")]
	Connection { backend: BackendKind, reason: String },

	#[error("{backend} adapter is {state}; {operation} requires a connected adapter")]
	NotConnected {
		backend: BackendKind,
		operation: &'static str,
		state: AdapterState,
	},

	#[error("{backend} transaction submission failed: {source}")]
	Submission {
		backend: BackendKind,
		#[source]
		source: BackendError,
	},

	#[error("{backend} contract call failed: {source}")]
	Call {
		backend: BackendKind,
		#[source]
		source: BackendError,
	},

	#[error("{backend} {what} not found")]
	NotFound { backend: BackendKind, what: String },

	#[error("{backend} metrics unavailable: {reason}")]
	MetricsUnavailable { backend: BackendKind, reason: String },

	#[error("{backend} proof generation failed: {reason}")]
	ProofGeneration { backend: BackendKind, reason: String },

	#[error("Unsupported backend: {0}")]
	UnsupportedBackend(String),
}

impl AdapterError {
	/// The backend that produced the error, if it was raised by an adapter.
	pub fn backend(&self) -> Option<BackendKind> {
		match self {
			Self::Configuration { backend, .. }
			| Self::BackendUnavailable { backend, .. }
			| Self::Connection { backend, .. }
			| Self::NotConnected { backend, .. }
			| Self::Submission { backend, .. }
			| Self::Call { backend, .. }
			| Self::NotFound { backend, .. }
			| Self::MetricsUnavailable { backend, .. }
			| Self::ProofGeneration { backend, .. } => Some(*backend),
			Self::UnsupportedBackend(_) => None,
		}
	}

	/// Whether a caller-side retry has a chance of succeeding.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Connection { .. } => true,
			Self::Submission { source, .. } | Self::Call { source, .. } => source.transient,
			_ => false,
		}
	}

	pub fn submission(backend: BackendKind, message: impl Into<String>) -> Self {
		Self::Submission {
			backend,
			source: BackendError::new(message),
		}
	}

	pub fn call(backend: BackendKind, message: impl Into<String>) -> Self {
		Self::Call {
			backend,
			source: BackendError::new(message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_backend_error_display() {
		let rejected = BackendError::rejected(-32000, "nonce too low");
		assert_eq!(rejected.to_string(), "nonce too low (code -32000)");

		let transient = BackendError::transient("connection refused");
		assert_eq!(transient.to_string(), "connection refused");
		assert!(transient.transient);
	}

	#[test]
	fn test_retry_classification() {
		let connection = AdapterError::Connection {
			backend: BackendKind::Poa,
			reason: "timeout".to_string(),
		};
		assert!(connection.is_retryable());

		let mempool_full = AdapterError::Submission {
			backend: BackendKind::Ethereum,
			source: BackendError::transient("txpool is full"),
		};
		assert!(mempool_full.is_retryable());

		let reverted = AdapterError::Call {
			backend: BackendKind::Ethereum,
			source: BackendError::rejected(3, "execution reverted"),
		};
		assert!(!reverted.is_retryable());

		let not_connected = AdapterError::NotConnected {
			backend: BackendKind::Polygon,
			operation: "get_block",
			state: AdapterState::Initialized,
		};
		assert!(!not_connected.is_retryable());
		assert_eq!(not_connected.backend(), Some(BackendKind::Polygon));
	}

	#[test]
	fn test_error_messages_carry_context() {
		let err = AdapterError::NotConnected {
			backend: BackendKind::Ethereum,
			operation: "submit_transaction",
			state: AdapterState::Uninitialized,
		};
		let message = err.to_string();
		assert!(message.contains("ETHEREUM"));
		assert!(message.contains("submit_transaction"));
		assert!(message.contains("uninitialized"));
	}
}
