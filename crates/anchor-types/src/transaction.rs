//! Transaction and contract call types.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::hex_bytes;

/// Backend-agnostic transaction intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Target address or account identifier.
	pub to: String,
	#[serde(default, with = "hex_bytes")]
	pub data: Vec<u8>,
	#[serde(default)]
	pub value: u128,
	/// Caller's estimate of the resource cost (gas units).
	pub estimated_gas: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
}

impl Transaction {
	pub fn new(to: impl Into<String>, data: Vec<u8>, estimated_gas: u64) -> Self {
		Self {
			to: to.into(),
			data,
			value: 0,
			estimated_gas,
			nonce: None,
		}
	}

	pub fn with_value(mut self, value: u128) -> Self {
		self.value = value;
		self
	}

	pub fn with_nonce(mut self, nonce: u64) -> Self {
		self.nonce = Some(nonce);
		self
	}
}

/// Envelope type of a prepared transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
	/// Single gas price field.
	Legacy,
	/// EIP-1559 max-fee / priority-fee pair.
	DynamicFee,
}

impl TxType {
	/// The EIP-2718 type byte.
	pub fn type_byte(&self) -> u8 {
		match self {
			Self::Legacy => 0,
			Self::DynamicFee => 2,
		}
	}
}

/// Pricing fields filled in by a fee strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeFields {
	Legacy {
		gas_price: u128,
	},
	Dynamic {
		max_fee_per_gas: u128,
		max_priority_fee_per_gas: u128,
	},
}

impl FeeFields {
	pub fn is_zero(&self) -> bool {
		match self {
			Self::Legacy { gas_price } => *gas_price == 0,
			Self::Dynamic {
				max_fee_per_gas,
				max_priority_fee_per_gas,
			} => *max_fee_per_gas == 0 && *max_priority_fee_per_gas == 0,
		}
	}
}

/// A transaction with backend-specific pricing applied. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
	pub to: String,
	#[serde(with = "hex_bytes")]
	pub data: Vec<u8>,
	pub value: u128,
	pub gas_limit: u64,
	pub fees: FeeFields,
	pub tx_type: TxType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
}

/// A read-only contract invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
	pub address: String,
	/// Method name, or a full human-readable signature where the backend accepts one.
	pub method: String,
	#[serde(default)]
	pub params: Vec<serde_json::Value>,
	/// JSON ABI describing the contract's interface.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub abi: Option<String>,
}

impl ContractCall {
	pub fn new(address: impl Into<String>, method: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			method: method.into(),
			params: Vec::new(),
			abi: None,
		}
	}

	pub fn with_params(mut self, params: Vec<serde_json::Value>) -> Self {
		self.params = params;
		self
	}

	pub fn with_abi(mut self, abi: impl Into<String>) -> Self {
		self.abi = Some(abi.into());
		self
	}

	/// Rejects calls with a blank address or method.
	pub fn check(&self) -> Result<(), String> {
		if self.address.trim().is_empty() {
			return Err("contract address must not be empty".to_string());
		}
		if self.method.trim().is_empty() {
			return Err("contract method must not be empty".to_string());
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_fee_fields_zero() {
		assert!(FeeFields::Legacy { gas_price: 0 }.is_zero());
		assert!(!FeeFields::Dynamic {
			max_fee_per_gas: 2,
			max_priority_fee_per_gas: 0
		}
		.is_zero());
	}

	#[test]
	fn test_prepared_transaction_wire_shape() {
		let prepared = PreparedTransaction {
			to: "0xabc".to_string(),
			data: vec![0xde, 0xad],
			value: 0,
			gas_limit: 110,
			fees: FeeFields::Legacy { gas_price: 0 },
			tx_type: TxType::Legacy,
			chain_id: None,
			nonce: None,
		};

		let value = serde_json::to_value(&prepared).unwrap();
		assert_eq!(value["data"], json!("0xdead"));
		assert_eq!(value["gasLimit"], json!(110));
		assert_eq!(value["fees"]["kind"], json!("legacy"));
		assert!(value.get("chainId").is_none());
	}

	#[test]
	fn test_contract_call_check() {
		assert!(ContractCall::new("0xabc", "balanceOf").check().is_ok());
		assert!(ContractCall::new("", "balanceOf").check().is_err());
		assert!(ContractCall::new("0xabc", " ").check().is_err());
	}

	#[test]
	fn test_dynamic_fee_type_byte() {
		assert_eq!(TxType::DynamicFee.type_byte(), 2);
		assert_eq!(TxType::Legacy.type_byte(), 0);
	}
}
