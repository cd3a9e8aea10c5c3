//! Contract call encoding for EVM backends.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use anchor_types::ContractCall;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbiError {
	#[error("ABI is required for {0} calls")]
	MissingAbi(&'static str),

	#[error("Invalid ABI: {0}")]
	InvalidAbi(String),

	#[error("Method {0} not found in ABI")]
	UnknownMethod(String),

	#[error("Method {method} expects {expected} parameters, got {actual}")]
	ParamCount {
		method: String,
		expected: usize,
		actual: usize,
	},

	#[error("Cannot encode parameter {index} as {ty}: {reason}")]
	Encode {
		index: usize,
		ty: String,
		reason: String,
	},

	#[error("Cannot decode return data: {0}")]
	Decode(String),
}

/// Where a call's function definition may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiSource {
	/// A JSON ABI is mandatory.
	JsonOnly,
	/// A JSON ABI, or a human-readable signature in `method`.
	JsonOrSignature,
}

/// Finds the function `call` targets.
pub fn resolve_function(
	call: &ContractCall,
	source: AbiSource,
	backend: &'static str,
) -> Result<Function, AbiError> {
	let Some(abi) = call.abi.as_deref() else {
		if source == AbiSource::JsonOrSignature && call.method.contains('(') {
			return Function::parse(&call.method).map_err(|e| AbiError::InvalidAbi(e.to_string()));
		}
		return Err(AbiError::MissingAbi(backend));
	};

	let abi: JsonAbi =
		serde_json::from_str(abi).map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
	let name = call
		.method
		.split_once('(')
		.map_or(call.method.as_str(), |(name, _)| name)
		.trim();

	let overloads = abi
		.function(name)
		.ok_or_else(|| AbiError::UnknownMethod(call.method.clone()))?;

	overloads
		.iter()
		.find(|f| f.signature() == call.method.trim())
		.or_else(|| overloads.iter().find(|f| f.inputs.len() == call.params.len()))
		.or_else(|| overloads.first())
		.cloned()
		.ok_or_else(|| AbiError::UnknownMethod(call.method.clone()))
}

/// ABI-encodes the selector and parameters of `call` for `function`.
pub fn encode_call(function: &Function, params: &[Value]) -> Result<Vec<u8>, AbiError> {
	if function.inputs.len() != params.len() {
		return Err(AbiError::ParamCount {
			method: function.signature(),
			expected: function.inputs.len(),
			actual: params.len(),
		});
	}

	let values = function
		.inputs
		.iter()
		.zip(params)
		.enumerate()
		.map(|(index, (input, value))| {
			let encode_err = |reason: String| AbiError::Encode {
				index,
				ty: input.ty.clone(),
				reason,
			};
			let ty = input.resolve().map_err(|e| encode_err(e.to_string()))?;
			json_to_sol(&ty, value).map_err(encode_err)
		})
		.collect::<Result<Vec<_>, _>>()?;

	function
		.abi_encode_input(&values)
		.map_err(|e| AbiError::Encode {
			index: 0,
			ty: function.signature(),
			reason: e.to_string(),
		})
}

/// Decodes return data into JSON: `null` for no outputs, the bare value for
/// one, an array for several.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Value, AbiError> {
	let mut values = function
		.abi_decode_output(data)
		.map_err(|e| AbiError::Decode(e.to_string()))?;

	Ok(match values.len() {
		0 => Value::Null,
		1 => sol_to_json(&values.remove(0)),
		_ => Value::Array(values.iter().map(sol_to_json).collect()),
	})
}

fn json_to_sol(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
	match (ty, value) {
		(DynSolType::Array(inner), Value::Array(items)) => items
			.iter()
			.map(|item| json_to_sol(inner, item))
			.collect::<Result<_, _>>()
			.map(DynSolValue::Array),
		(DynSolType::FixedArray(inner, len), Value::Array(items)) => {
			if items.len() != *len {
				return Err(format!("expected {} elements, got {}", len, items.len()));
			}
			items
				.iter()
				.map(|item| json_to_sol(inner, item))
				.collect::<Result<_, _>>()
				.map(DynSolValue::FixedArray)
		}
		(DynSolType::Tuple(types), Value::Array(items)) => {
			if items.len() != types.len() {
				return Err(format!(
					"expected {} tuple fields, got {}",
					types.len(),
					items.len()
				));
			}
			types
				.iter()
				.zip(items)
				.map(|(t, item)| json_to_sol(t, item))
				.collect::<Result<_, _>>()
				.map(DynSolValue::Tuple)
		}
		(_, Value::String(s)) => ty.coerce_str(s).map_err(|e| e.to_string()),
		(_, Value::Number(n)) => ty.coerce_str(&n.to_string()).map_err(|e| e.to_string()),
		(_, Value::Bool(b)) => ty.coerce_str(&b.to_string()).map_err(|e| e.to_string()),
		(_, other) => Err(format!("unsupported JSON value {}", other)),
	}
}

fn sol_to_json(value: &DynSolValue) -> Value {
	match value {
		DynSolValue::Bool(b) => Value::Bool(*b),
		DynSolValue::Uint(u, _) => match u64::try_from(*u) {
			Ok(small) => Value::from(small),
			Err(_) => Value::String(u.to_string()),
		},
		DynSolValue::Int(i, _) => match i64::try_from(*i) {
			Ok(small) => Value::from(small),
			Err(_) => Value::String(i.to_string()),
		},
		DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
		DynSolValue::FixedBytes(word, size) => {
			Value::String(format!("0x{}", hex::encode(&word[..*size])))
		}
		DynSolValue::Function(f) => Value::String(format!("0x{}", hex::encode(f.as_slice()))),
		DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
		DynSolValue::String(s) => Value::String(s.clone()),
		DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
			Value::Array(items.iter().map(sol_to_json).collect())
		}
		#[allow(unreachable_patterns)]
		other => Value::String(format!("{:?}", other)),
	}
}
