//! Call context for entry points.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Address;

/// Who is calling and how much native value rides along with the call.
///
/// The engine moves `value` from `sender` to the callee before the entry
/// point body runs, inside the same atomic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub sender: Address,
    pub value: Decimal,
}

impl Call {
    /// A call with no attached native value.
    #[must_use]
    pub fn from(sender: Address) -> Self {
        Self {
            sender,
            value: Decimal::ZERO,
        }
    }

    /// Attach native value.
    #[must_use]
    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }
}
