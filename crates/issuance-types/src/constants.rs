//! System-wide constants for the exchange issuance engine.

use rust_decimal::Decimal;

/// Decimal places kept for basket quantities computed by the engine.
/// Mintable amounts are rounded toward zero at this precision.
pub const QTY_PRECISION: u32 = 18;

/// Allowance ceiling granted when an approval is insufficient. Effectively
/// unlimited; raised once and never lowered.
pub const MAX_ALLOWANCE: Decimal = Decimal::MAX;

/// Label used to derive the default contract address.
pub const DEFAULT_CONTRACT_LABEL: &str = "exchange-issuance";

/// Label used to derive the default basket issuance module address.
pub const DEFAULT_ISSUANCE_MODULE_LABEL: &str = "basic-issuance-module";

/// Label used to derive the default owner address.
pub const DEFAULT_OWNER_LABEL: &str = "owner";

/// Label used to derive the default treasury address.
pub const DEFAULT_TREASURY_LABEL: &str = "treasury";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "ExchangeIssuance";
