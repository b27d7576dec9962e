//! Trade instructions: one opaque swap leg each.
//!
//! Instructions are built off-chain by a quote service, travel as JSON,
//! and are consumed exactly once by the trade executor. The engine never
//! interprets `payload`; only the target venue does.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Address;

/// A single swap leg against a named venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInstruction {
    /// The venue to call.
    pub target: Address,
    /// The asset acquired by this leg (issuance) or disposed of (redemption).
    pub asset: Address,
    /// Venue-specific call data, hex-encoded on the wire.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Native value forwarded with the call.
    #[serde(default)]
    pub value: Decimal,
}

impl TradeInstruction {
    #[must_use]
    pub fn new(target: Address, asset: Address, payload: Vec<u8>) -> Self {
        Self {
            target,
            asset,
            payload,
            value: Decimal::ZERO,
        }
    }

    /// Forward `value` native currency with the call.
    #[must_use]
    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }
}

impl std::fmt::Display for TradeInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Leg[{} via {}] {}B value={}",
            self.asset.short(),
            self.target.short(),
            self.payload.len(),
            self.value,
        )
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        let digits = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}
