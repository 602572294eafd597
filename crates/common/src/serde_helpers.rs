//! Misc serde helpers for litsafe crates.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, de};

/// Deserializes an optional `U256` given as a JSON integer, a decimal string or a `0x` prefixed
/// hex string.
pub fn from_int_or_hex_opt<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(val) => val.try_into_u256().map(Some),
        None => Ok(None),
    }
}

/// A JSON integer or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    /// An integer
    Int(serde_json::Number),
    /// A decimal or hex string
    Str(String),
}

impl NumberOrString {
    /// Converts the value into a `U256`.
    pub fn try_into_u256<E: de::Error>(self) -> Result<U256, E> {
        match self {
            Self::Int(num) => num.to_string().parse::<U256>().map_err(E::custom),
            Self::Str(s) => {
                if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    U256::from_str_radix(hex, 16).map_err(E::custom)
                } else {
                    U256::from_str_radix(&s, 10).map_err(E::custom)
                }
            }
        }
    }
}
