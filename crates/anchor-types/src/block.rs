//! Block snapshots.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Which block to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockTag {
	#[default]
	Latest,
	Number(u64),
}

impl From<u64> for BlockTag {
	fn from(number: u64) -> Self {
		Self::Number(number)
	}
}

impl fmt::Display for BlockTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Latest => f.write_str("latest"),
			Self::Number(n) => write!(f, "#{}", n),
		}
	}
}

impl Serialize for BlockTag {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::Latest => serializer.serialize_str("latest"),
			Self::Number(n) => serializer.serialize_u64(*n),
		}
	}
}

impl<'de> Deserialize<'de> for BlockTag {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Number(u64),
			Tag(String),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Number(n) => Ok(Self::Number(n)),
			Raw::Tag(tag) if tag == "latest" => Ok(Self::Latest),
			Raw::Tag(tag) => Err(serde::de::Error::custom(format!(
				"unknown block tag: {}",
				tag
			))),
		}
	}
}

/// Read-only snapshot of one block. Each `get_block` call re-fetches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	pub number: u64,
	pub hash: String,
	/// Unix timestamp in seconds.
	pub timestamp: u64,
	/// Transaction identifiers in block order.
	#[serde(default)]
	pub transactions: Vec<String>,
}

impl Block {
	pub fn contains(&self, tx_id: &str) -> bool {
		self.transactions.iter().any(|t| t.eq_ignore_ascii_case(tx_id))
	}
}
