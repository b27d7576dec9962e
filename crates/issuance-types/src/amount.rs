//! Checked quantity arithmetic.
//!
//! `Decimal` is signed, so a plain subtraction can silently go negative.
//! Every balance delta in the engine goes through [`delta`], which treats a
//! negative result as an underflow error instead.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{IssuanceError, Result, constants};

/// `after - before`, failing if the result would be negative.
///
/// # Errors
/// Returns [`IssuanceError::BalanceUnderflow`] if `after < before`.
pub fn delta(after: Decimal, before: Decimal) -> Result<Decimal> {
    match after.checked_sub(before) {
        Some(d) if !d.is_sign_negative() => Ok(d),
        _ => Err(IssuanceError::BalanceUnderflow),
    }
}

/// # Errors
/// Returns [`IssuanceError::ArithmeticOverflow`] on overflow.
pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or(IssuanceError::ArithmeticOverflow)
}

/// # Errors
/// Returns [`IssuanceError::ArithmeticOverflow`] on overflow or a zero divisor.
pub fn checked_div(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_div(b).ok_or(IssuanceError::ArithmeticOverflow)
}

/// Round toward zero at [`constants::QTY_PRECISION`].
#[must_use]
pub fn floor_qty(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(constants::QTY_PRECISION, RoundingStrategy::ToZero)
}

/// Fail unless `value` is strictly positive.
///
/// # Errors
/// Returns [`IssuanceError::InvalidInputs`] naming `what`.
pub fn require_positive(value: Decimal, what: &str) -> Result<()> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(IssuanceError::InvalidInputs {
            reason: format!("{what} must be positive, got {value}"),
        })
    }
}
