//! Anchoring proof codecs.
//!
//! EVM backends sign the canonical JSON encoding of the payload with an
//! EIP-191 personal-sign signature. Verification recovers the signer and
//! compares it with the verifier identity.

use alloy::primitives::{Address, Signature};
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use anchor_types::{AdapterError, AdapterResult, BackendKind, ProofFormat};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

/// Serializes, signs and verifies proofs for one backend.
pub trait ProofCodec: Send + Sync {
	fn generate(&self, data: &Value) -> AdapterResult<ProofFormat>;

	fn verify(&self, proof: &ProofFormat) -> bool;
}

/// Canonical byte encoding of a proof payload.
pub fn canonical_payload(backend: BackendKind, data: &Value) -> AdapterResult<Vec<u8>> {
	serde_json::to_vec(data).map_err(|e| AdapterError::ProofGeneration {
		backend,
		reason: format!("payload is not serializable: {}", e),
	})
}

/// EIP-191 signature codec shared by the EVM adapters.
pub struct SignatureCodec {
	backend: BackendKind,
	signer: Option<PrivateKeySigner>,
	verifier: Option<Address>,
	chain_id: Option<u64>,
}

impl SignatureCodec {
	/// Builds the codec from optional key and verifier strings.
	///
	/// The verifier defaults to the key's address when not given.
	pub fn new(
		backend: BackendKind,
		private_key: Option<&str>,
		verifier: Option<&str>,
		chain_id: Option<u64>,
	) -> AdapterResult<Self> {
		let invalid = |reason: String| AdapterError::Configuration { backend, reason };

		let signer = private_key
			.map(str::trim)
			.filter(|k| !k.is_empty())
			.map(|k| {
				PrivateKeySigner::from_str(k)
					.map_err(|e| invalid(format!("invalid private key: {}", e)))
			})
			.transpose()?;

		let verifier = match verifier {
			Some(v) => Some(
				Address::from_str(v.trim())
					.map_err(|e| invalid(format!("invalid verifier address {}: {}", v, e)))?,
			),
			None => signer.as_ref().map(PrivateKeySigner::address),
		};

		Ok(Self {
			backend,
			signer,
			verifier,
			chain_id,
		})
	}

	pub fn signer_address(&self) -> Option<Address> {
		self.signer.as_ref().map(PrivateKeySigner::address)
	}

	pub fn verifier(&self) -> Option<Address> {
		self.verifier
	}

	pub(crate) fn signer(&self) -> Option<&PrivateKeySigner> {
		self.signer.as_ref()
	}

	fn recover(&self, proof: &ProofFormat) -> Option<Address> {
		if !proof.is_well_formed_for(self.backend) || proof.signature.len() != 65 {
			return None;
		}
		// Only the canonical recovery ids, so every signature byte matters.
		if !matches!(proof.signature[64], 27 | 28) {
			return None;
		}

		let signature = Signature::from_raw(&proof.signature).ok()?;
		signature.recover_address_from_msg(&proof.payload).ok()
	}
}

impl ProofCodec for SignatureCodec {
	fn generate(&self, data: &Value) -> AdapterResult<ProofFormat> {
		let signer = self.signer.as_ref().ok_or_else(|| AdapterError::ProofGeneration {
			backend: self.backend,
			reason: "no signing key configured".to_string(),
		})?;

		let payload = canonical_payload(self.backend, data)?;
		let signature = signer
			.sign_message_sync(&payload)
			.map_err(|e| AdapterError::ProofGeneration {
				backend: self.backend,
				reason: format!("signing failed: {}", e),
			})?;

		debug!(
			"Generated {} proof over {} bytes signed by {}",
			self.backend,
			payload.len(),
			signer.address()
		);

		Ok(ProofFormat {
			backend: self.backend,
			payload,
			signature: signature.as_bytes().to_vec(),
			signer: Some(signer.address().to_checksum(None)),
			chain_id: self.chain_id,
		})
	}

	fn verify(&self, proof: &ProofFormat) -> bool {
		let Some(verifier) = self.verifier else {
			debug!("No verifier identity configured for {}", self.backend);
			return false;
		};

		match self.recover(proof) {
			Some(recovered) => recovered == verifier,
			None => false,
		}
	}
}

impl std::fmt::Debug for SignatureCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SignatureCodec")
			.field("backend", &self.backend)
			.field("signer", &self.signer_address())
			.field("verifier", &self.verifier)
			.field("chain_id", &self.chain_id)
			.finish()
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use serde_json::json;

	// Hardhat account #0.
	pub(crate) const TEST_KEY: &str =
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	pub(crate) const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn codec() -> SignatureCodec {
		SignatureCodec::new(BackendKind::Ethereum, Some(TEST_KEY), None, Some(1)).unwrap()
	}

	#[test]
	fn test_verifier_defaults_to_key_address() {
		let codec = codec();
		let expected = Address::from_str(TEST_ADDRESS).unwrap();
		assert_eq!(codec.signer_address(), Some(expected));
		assert_eq!(codec.verifier(), Some(expected));
	}

	#[test]
	fn test_round_trip() {
		let codec = codec();
		let data = json!({"document": "invoice-42", "digest": "0x1234", "pages": [1, 2, 3]});
		let proof = codec.generate(&data).unwrap();

		assert_eq!(proof.signature.len(), 65);
		assert_eq!(proof.signer.as_deref(), Some(TEST_ADDRESS));
		assert_eq!(proof.chain_id, Some(1));
		assert!(codec.verify(&proof));
	}

	#[test]
	fn test_any_signature_byte_mutation_fails() {
		let codec = codec();
		let proof = codec.generate(&json!({"anchor": 7})).unwrap();

		for index in 0..proof.signature.len() {
			let mut tampered = proof.clone();
			tampered.signature[index] ^= 0x01;
			assert!(!codec.verify(&tampered), "byte {} mutation verified", index);
		}
	}

	#[test]
	fn test_payload_mutation_and_malformed_proofs_fail() {
		let codec = codec();
		let proof = codec.generate(&json!({"anchor": 7})).unwrap();

		let mut tampered = proof.clone();
		tampered.payload[0] ^= 0xff;
		assert!(!codec.verify(&tampered));

		let truncated = ProofFormat {
			signature: proof.signature[..64].to_vec(),
			..proof.clone()
		};
		assert!(!codec.verify(&truncated));

		let wrong_backend = ProofFormat {
			backend: BackendKind::Polygon,
			..proof
		};
		assert!(!codec.verify(&wrong_backend));
	}

	#[test]
	fn test_other_verifier_rejects() {
		let signer = codec();
		let proof = signer.generate(&json!("payload")).unwrap();

		let verifier = SignatureCodec::new(
			BackendKind::Ethereum,
			None,
			Some("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			None,
		)
		.unwrap();
		assert!(!verifier.verify(&proof));
	}

	#[test]
	fn test_generate_without_key_fails() {
		let codec = SignatureCodec::new(BackendKind::Polygon, None, None, None).unwrap();
		let err = codec.generate(&json!({})).unwrap_err();
		assert!(matches!(err, AdapterError::ProofGeneration { .. }));
		assert!(codec.verifier().is_none());
	}

	#[test]
	fn test_invalid_key_is_configuration_error() {
		let err = SignatureCodec::new(BackendKind::Ethereum, Some("0xnothex"), None, None)
			.unwrap_err();
		assert!(matches!(err, AdapterError::Configuration { .. }));
	}
}
