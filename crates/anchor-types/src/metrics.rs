//! Network health metrics, shaped per backend family.

use serde::{Deserialize, Serialize};

/// Metrics for an authority-run chain, which has no fee market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityMetrics {
	pub average_block_time_secs: f64,
	pub throughput_tps: f64,
	pub validator_count: u64,
	pub latency_ms: u64,
}

/// Metrics for a fee-market chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeMarketMetrics {
	pub average_block_time_secs: f64,
	pub throughput_tps: f64,
	pub active_nodes: u64,
	pub latency_ms: u64,
	/// Current gas price in wei.
	pub gas_price: u128,
	/// Base fee of the latest block in wei.
	pub base_fee: Option<u128>,
}

/// A point-in-time metrics sample. Derived on demand, never live-updating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkMetrics {
	Authority(AuthorityMetrics),
	FeeMarket(FeeMarketMetrics),
}

impl NetworkMetrics {
	pub fn average_block_time_secs(&self) -> f64 {
		match self {
			Self::Authority(m) => m.average_block_time_secs,
			Self::FeeMarket(m) => m.average_block_time_secs,
		}
	}

	pub fn throughput_tps(&self) -> f64 {
		match self {
			Self::Authority(m) => m.throughput_tps,
			Self::FeeMarket(m) => m.throughput_tps,
		}
	}

	/// Validators for authority chains, connected peers for fee-market chains.
	pub fn active_nodes(&self) -> u64 {
		match self {
			Self::Authority(m) => m.validator_count,
			Self::FeeMarket(m) => m.active_nodes,
		}
	}

	pub fn latency_ms(&self) -> u64 {
		match self {
			Self::Authority(m) => m.latency_ms,
			Self::FeeMarket(m) => m.latency_ms,
		}
	}

	pub fn gas_price(&self) -> Option<u128> {
		match self {
			Self::Authority(_) => None,
			Self::FeeMarket(m) => Some(m.gas_price),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_gas_price_only_for_fee_markets() {
		let authority = NetworkMetrics::Authority(AuthorityMetrics {
			average_block_time_secs: 5.0,
			throughput_tps: 12.0,
			validator_count: 4,
			latency_ms: 3,
		});
		assert_eq!(authority.gas_price(), None);
		assert_eq!(authority.active_nodes(), 4);

		let market = NetworkMetrics::FeeMarket(FeeMarketMetrics {
			average_block_time_secs: 12.0,
			throughput_tps: 15.5,
			active_nodes: 25,
			latency_ms: 40,
			gas_price: 20_000_000_000,
			base_fee: Some(18_000_000_000),
		});
		assert_eq!(market.gas_price(), Some(20_000_000_000));
		assert_eq!(market.average_block_time_secs(), 12.0);
	}
}
