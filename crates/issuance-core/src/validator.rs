//! Basket preconditions.
//!
//! Checked before any custody or external call, and usable on their own so
//! approvals can be warmed once per basket.

use issuance_ledger::{BasketDefinition, Ledger};
use issuance_types::{Address, IssuanceError, Result, TradeInstruction};

/// The basket's definition, provided the registry recognises it.
///
/// # Errors
/// Returns `INVALID_SET` if the basket is not registered.
pub fn require_valid_basket(ledger: &Ledger, basket: Address) -> Result<&BasketDefinition> {
    if !ledger.baskets().is_set(basket) {
        return Err(IssuanceError::InvalidSet(basket));
    }
    ledger.baskets().definition(basket)
}

/// # Errors
/// Returns `EXTERNAL_POSITIONS` naming the first component that carries an
/// externally-managed position module.
pub fn require_no_external_positions(definition: &BasketDefinition) -> Result<()> {
    match definition
        .components
        .iter()
        .find(|c| !definition.external_position_modules(c.asset).is_empty())
    {
        Some(c) => Err(IssuanceError::ExternalPositions {
            basket: definition.address,
            component: c.asset,
        }),
        None => Ok(()),
    }
}

/// One trade leg per component.
///
/// # Errors
/// Returns `INVALID_ORDERS` on a count mismatch.
pub fn require_leg_per_component(
    definition: &BasketDefinition,
    instructions: &[TradeInstruction],
) -> Result<()> {
    if instructions.len() == definition.components.len() {
        Ok(())
    } else {
        Err(IssuanceError::InvalidOrders {
            expected: definition.components.len(),
            actual: instructions.len(),
        })
    }
}
