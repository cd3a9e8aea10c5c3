//! Serde helpers shared by wire types.

/// Serializes byte vectors as `0x`-prefixed hex strings.
pub mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		decode(&s).map_err(serde::de::Error::custom)
	}

	/// Decodes hex with or without the `0x` prefix.
	pub fn decode(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
		hex::decode(s.strip_prefix("0x").unwrap_or(s))
	}
}
