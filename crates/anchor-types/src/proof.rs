//! Anchoring proof container.

use serde::{Deserialize, Serialize};

use crate::config::BackendKind;
use crate::serde_helpers::hex_bytes;

/// Opaque payload bytes plus a detachable signature or attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFormat {
	pub backend: BackendKind,
	#[serde(with = "hex_bytes")]
	pub payload: Vec<u8>,
	#[serde(with = "hex_bytes")]
	pub signature: Vec<u8>,
	/// Identity that produced the signature. Informational only; verification
	/// checks against the adapter's configured verifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signer: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<u64>,
}

impl ProofFormat {
	/// Well-formed means both parts are present and the proof targets `backend`.
	pub fn is_well_formed_for(&self, backend: BackendKind) -> bool {
		self.backend == backend && !self.payload.is_empty() && !self.signature.is_empty()
	}
}
