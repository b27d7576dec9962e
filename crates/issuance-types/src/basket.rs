//! Basket component model.
//!
//! A basket (a "Set") is a token representing fixed proportional claims on
//! its components. Each [`Component`] states how many units of the asset
//! back one whole basket unit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, IssuanceError, Result};

/// One component of a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The component asset.
    pub asset: Address,
    /// Units of `asset` required per whole basket unit.
    pub unit: Decimal,
}

impl Component {
    #[must_use]
    pub fn new(asset: Address, unit: Decimal) -> Self {
        Self { asset, unit }
    }

    /// Quantity of this component backing `basket_amount` basket units.
    ///
    /// # Errors
    /// Returns [`IssuanceError::ArithmeticOverflow`] if the product overflows.
    pub fn quantity_for(&self, basket_amount: Decimal) -> Result<Decimal> {
        self.unit
            .checked_mul(basket_amount)
            .ok_or(IssuanceError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_scales_with_amount() {
        let c = Component::new(Address::labeled("a"), Decimal::new(10, 0));
        assert_eq!(c.quantity_for(Decimal::new(2, 0)).unwrap(), Decimal::new(20, 0));
        assert_eq!(c.quantity_for(Decimal::new(5, 1)).unwrap(), Decimal::new(5, 0));
    }

    #[test]
    fn quantity_overflow_is_an_error() {
        let c = Component::new(Address::labeled("a"), Decimal::MAX);
        let err = c.quantity_for(Decimal::TWO).unwrap_err();
        assert!(matches!(err, IssuanceError::ArithmeticOverflow));
    }
}
