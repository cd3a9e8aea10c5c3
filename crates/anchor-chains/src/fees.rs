//! Per-backend transaction pricing.

use anchor_types::{
	AdapterError, AdapterResult, BackendKind, FeeFields, PreparedTransaction, Transaction, TxType,
};
use tracing::{debug, warn};

/// One gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Priority fee used on Polygon regardless of the base fee.
pub const POLYGON_PRIORITY_FEE: u128 = 30 * GWEI;

/// Ethereum max fee when the provider cannot estimate one.
pub const ETHEREUM_FALLBACK_MAX_FEE: u128 = 50 * GWEI;

/// Ethereum priority fee when the provider cannot estimate one.
pub const ETHEREUM_FALLBACK_PRIORITY_FEE: u128 = 2 * GWEI;

/// Live fee market data an adapter gathers before pricing a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeQuote {
	/// Base fee of the latest block.
	pub base_fee: Option<u128>,
	/// Provider EIP-1559 estimate as `(max_fee, max_priority_fee)`.
	pub eip1559: Option<(u128, u128)>,
}

impl FeeQuote {
	pub fn with_base_fee(base_fee: u128) -> Self {
		Self {
			base_fee: Some(base_fee),
			eip1559: None,
		}
	}

	pub fn with_estimate(max_fee: u128, max_priority_fee: u128) -> Self {
		Self {
			base_fee: None,
			eip1559: Some((max_fee, max_priority_fee)),
		}
	}
}

/// Computes the fee fields and gas limit for one backend.
pub trait FeeStrategy: Send + Sync {
	fn backend(&self) -> BackendKind;

	fn tx_type(&self) -> TxType;

	/// Gas limit for a caller's estimate.
	fn gas_limit(&self, estimated_gas: u64) -> u64 {
		estimated_gas
	}

	/// Fee fields for `quote`, or a reason the quote is insufficient.
	fn price(&self, quote: &FeeQuote) -> Result<FeeFields, String>;

	/// Turns a backend-agnostic transaction into a priced one.
	fn prepare(
		&self,
		tx: &Transaction,
		quote: &FeeQuote,
		chain_id: Option<u64>,
	) -> AdapterResult<PreparedTransaction> {
		let fees = self
			.price(quote)
			.map_err(|reason| AdapterError::submission(self.backend(), reason))?;
		let gas_limit = self.gas_limit(tx.estimated_gas);

		debug!(
			"Prepared {} transaction to {}: gas_limit={} fees={:?}",
			self.backend(),
			tx.to,
			gas_limit,
			fees
		);

		Ok(PreparedTransaction {
			to: tx.to.clone(),
			data: tx.data.clone(),
			value: tx.value,
			gas_limit,
			fees,
			tx_type: self.tx_type(),
			chain_id,
			nonce: tx.nonce,
		})
	}
}

/// Zero fees with a 10% gas margin.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoaFeeStrategy;

impl FeeStrategy for PoaFeeStrategy {
	fn backend(&self) -> BackendKind {
		BackendKind::Poa
	}

	fn tx_type(&self) -> TxType {
		TxType::Legacy
	}

	/// `round(1.1 × g)` in integer arithmetic.
	fn gas_limit(&self, estimated_gas: u64) -> u64 {
		let scaled = (estimated_gas as u128) * 11 + 5;
		u64::try_from(scaled / 10).unwrap_or(u64::MAX)
	}

	fn price(&self, _quote: &FeeQuote) -> Result<FeeFields, String> {
		Ok(FeeFields::Legacy { gas_price: 0 })
	}
}

/// Twice the base fee with a fixed priority fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonFeeStrategy;

impl FeeStrategy for PolygonFeeStrategy {
	fn backend(&self) -> BackendKind {
		BackendKind::Polygon
	}

	fn tx_type(&self) -> TxType {
		TxType::DynamicFee
	}

	fn price(&self, quote: &FeeQuote) -> Result<FeeFields, String> {
		let base_fee = quote
			.base_fee
			.ok_or_else(|| "latest block carries no base fee".to_string())?;
		let max_fee_per_gas = base_fee
			.checked_mul(2)
			.ok_or_else(|| format!("base fee {} overflows when doubled", base_fee))?;

		Ok(FeeFields::Dynamic {
			max_fee_per_gas,
			max_priority_fee_per_gas: POLYGON_PRIORITY_FEE,
		})
	}
}

/// The provider's estimate, or fixed fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthereumFeeStrategy;

impl FeeStrategy for EthereumFeeStrategy {
	fn backend(&self) -> BackendKind {
		BackendKind::Ethereum
	}

	fn tx_type(&self) -> TxType {
		TxType::DynamicFee
	}

	fn price(&self, quote: &FeeQuote) -> Result<FeeFields, String> {
		let (max_fee_per_gas, max_priority_fee_per_gas) = match quote.eip1559 {
			Some(estimate) => estimate,
			None => {
				warn!(
					"No EIP-1559 fee estimate available, using fallback {} / {} wei",
					ETHEREUM_FALLBACK_MAX_FEE, ETHEREUM_FALLBACK_PRIORITY_FEE
				);
				(ETHEREUM_FALLBACK_MAX_FEE, ETHEREUM_FALLBACK_PRIORITY_FEE)
			}
		};

		Ok(FeeFields::Dynamic {
			max_fee_per_gas,
			max_priority_fee_per_gas,
		})
	}
}
