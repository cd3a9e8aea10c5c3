//! Concrete backend adapters.

pub mod evm;
pub mod poa;
