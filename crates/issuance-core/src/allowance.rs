//! Allowance management.
//!
//! Allowances are raised lazily to [`constants::MAX_ALLOWANCE`] the first
//! time a spender needs more than it has, and are never lowered. A second
//! call for the same (owner, asset, spender) performs no ledger write.

use issuance_ledger::Ledger;
use issuance_types::{Address, Result, constants};
use rust_decimal::Decimal;

/// Make sure `spender` may pull at least `required` of `asset` from `owner`.
///
/// Returns whether an allowance write happened. Native currency is forwarded
/// with calls rather than approved, so it is always a no-op.
///
/// # Errors
/// Surfaces the ledger's approve error unchanged (unknown asset, a token
/// that rejects approvals).
pub fn ensure_approval(
    ledger: &mut Ledger,
    owner: Address,
    asset: Address,
    spender: Address,
    required: Decimal,
) -> Result<bool> {
    if asset.is_native() {
        return Ok(false);
    }
    let current = ledger.allowance(asset, owner, spender);
    if current >= required {
        return Ok(false);
    }
    ledger.approve(asset, owner, spender, constants::MAX_ALLOWANCE)?;
    tracing::debug!(
        asset = %asset.short(),
        spender = %spender.short(),
        previous = %current,
        "Allowance raised to max"
    );
    Ok(true)
}
