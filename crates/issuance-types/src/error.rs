//! Error types for the exchange issuance engine.
//!
//! All errors use the `EI_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by failure class:
//! - 1xx: Precondition errors (detected before any external call)
//! - 2xx: Ledger errors (balances, allowances, arithmetic)
//! - 3xx: Venue errors (opaque trade legs)
//! - 4xx: Settlement errors (realized output below the caller's floor)
//! - 5xx: Authorization / guard errors
//! - 9xx: General / internal errors
//!
//! Every error aborts the enclosing transaction. [`IssuanceError::reason`]
//! yields the short revert reason callers match on (`INVALID_SET`, ...).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::Address;

/// Central error enum for all engine operations.
#[derive(Debug, Error)]
pub enum IssuanceError {
    // =================================================================
    // Precondition Errors (1xx)
    // =================================================================
    /// The basket is not registered with the controlling registry.
    #[error("EI_ERR_100: INVALID_SET: basket {0} is not registered")]
    InvalidSet(Address),

    /// A zero amount or otherwise unusable argument.
    #[error("EI_ERR_101: INVALID_INPUTS: {reason}")]
    InvalidInputs { reason: String },

    /// Instruction count does not match the basket's component count.
    #[error("EI_ERR_102: INVALID_ORDERS: expected {expected} trade instructions, got {actual}")]
    InvalidOrders { expected: usize, actual: usize },

    /// Attached native value is below the stated input amount.
    #[error("EI_ERR_103: INSUFFICIENT_INPUT_AMOUNT: need {needed}, attached {attached}")]
    InsufficientInputAmount { needed: Decimal, attached: Decimal },

    /// A component carries an externally-managed position module.
    #[error("EI_ERR_104: EXTERNAL_POSITIONS: component {component} of basket {basket}")]
    ExternalPositions { basket: Address, component: Address },

    // =================================================================
    // Ledger Errors (2xx)
    // =================================================================
    /// Not enough balance to perform a transfer.
    #[error("EI_ERR_200: Insufficient balance of {asset}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: Address,
        needed: Decimal,
        available: Decimal,
    },

    /// Spender's allowance is below the requested pull.
    #[error("EI_ERR_201: Insufficient allowance of {asset}: need {needed}, allowed {allowance}")]
    InsufficientAllowance {
        asset: Address,
        needed: Decimal,
        allowance: Decimal,
    },

    /// A balance delta would go negative.
    #[error("EI_ERR_202: Balance underflow")]
    BalanceUnderflow,

    /// A quantity computation overflowed.
    #[error("EI_ERR_203: Arithmetic overflow")]
    ArithmeticOverflow,

    /// The asset is not known to the ledger.
    #[error("EI_ERR_204: Unknown asset {0}")]
    UnknownAsset(Address),

    /// The token refused to update an allowance.
    #[error("EI_ERR_205: Approval rejected by token {asset}")]
    ApprovalRejected { asset: Address },

    // =================================================================
    // Venue Errors (3xx)
    // =================================================================
    /// No venue is registered at the instruction's target.
    #[error("EI_ERR_300: Unknown venue {0}")]
    UnknownVenue(Address),

    /// The venue call reverted. The venue's own error is kept verbatim.
    #[error("EI_ERR_301: Venue {venue} reverted: {source}")]
    VenueReverted {
        venue: Address,
        #[source]
        source: Box<IssuanceError>,
    },

    /// The venue could not decode its payload.
    #[error("EI_ERR_302: Invalid payload for venue {venue}: {reason}")]
    InvalidPayload { venue: Address, reason: String },

    // =================================================================
    // Settlement Errors (4xx)
    // =================================================================
    /// Realized output is below the caller's stated minimum.
    #[error("EI_ERR_400: INSUFFICIENT_OUTPUT_AMOUNT: need {needed}, realized {realized}")]
    InsufficientOutputAmount { needed: Decimal, realized: Decimal },

    // =================================================================
    // Authorization / Guard Errors (5xx)
    // =================================================================
    /// A guarded entry point was re-entered while already running.
    #[error("EI_ERR_500: REENTRANT_CALL: guarded entry point already running")]
    ReentrantCall,

    /// The caller is not allowed to perform this action.
    #[error("EI_ERR_501: UNAUTHORIZED: {caller} may not {action}")]
    Unauthorized { caller: Address, action: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("EI_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("EI_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad address, etc.).
    #[error("EI_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("EI_ERR_903: I/O error: {0}")]
    Io(String),
}

impl IssuanceError {
    /// Short revert reason, stable across message wording changes.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSet(_) => "INVALID_SET",
            Self::InvalidInputs { .. } => "INVALID_INPUTS",
            Self::InvalidOrders { .. } => "INVALID_ORDERS",
            Self::InsufficientInputAmount { .. } => "INSUFFICIENT_INPUT_AMOUNT",
            Self::ExternalPositions { .. } => "EXTERNAL_POSITIONS",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            Self::BalanceUnderflow => "BALANCE_UNDERFLOW",
            Self::ArithmeticOverflow => "ARITHMETIC_OVERFLOW",
            Self::UnknownAsset(_) => "UNKNOWN_ASSET",
            Self::ApprovalRejected { .. } => "APPROVAL_REJECTED",
            Self::UnknownVenue(_) => "UNKNOWN_VENUE",
            Self::VenueReverted { .. } => "VENUE_REVERTED",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
            Self::InsufficientOutputAmount { .. } => "INSUFFICIENT_OUTPUT_AMOUNT",
            Self::ReentrantCall => "REENTRANT_CALL",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Configuration(_) => "CONFIGURATION",
            Self::Io(_) => "IO",
        }
    }

    /// Innermost error, unwrapping any chain of venue reverts.
    ///
    /// A re-entrant call rejected inside a venue surfaces as
    /// `VenueReverted { source: ReentrantCall }`; this returns the
    /// `ReentrantCall`.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::VenueReverted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, IssuanceError>;

impl From<std::io::Error> for IssuanceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IssuanceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = IssuanceError::InvalidSet(Address::labeled("dpi"));
        let msg = format!("{err}");
        assert!(msg.starts_with("EI_ERR_100"), "Got: {msg}");
        assert!(msg.contains("INVALID_SET"));
    }

    #[test]
    fn invalid_orders_display() {
        let err = IssuanceError::InvalidOrders {
            expected: 2,
            actual: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains("EI_ERR_102"));
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
        assert_eq!(err.reason(), "INVALID_ORDERS");
    }

    #[test]
    fn venue_revert_keeps_source() {
        let err = IssuanceError::VenueReverted {
            venue: Address::labeled("router"),
            source: Box::new(IssuanceError::ReentrantCall),
        };
        assert_eq!(err.reason(), "VENUE_REVERTED");
        assert!(matches!(err.root_cause(), IssuanceError::ReentrantCall));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn nested_venue_reverts_unwrap_to_root() {
        let err = IssuanceError::VenueReverted {
            venue: Address::labeled("outer"),
            source: Box::new(IssuanceError::VenueReverted {
                venue: Address::labeled("inner"),
                source: Box::new(IssuanceError::InsufficientOutputAmount {
                    needed: Decimal::TEN,
                    realized: Decimal::ONE,
                }),
            }),
        };
        assert_eq!(err.root_cause().reason(), "INSUFFICIENT_OUTPUT_AMOUNT");
    }

    #[test]
    fn all_errors_have_ei_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(IssuanceError::BalanceUnderflow),
            Box::new(IssuanceError::ReentrantCall),
            Box::new(IssuanceError::UnknownVenue(Address::ZERO)),
            Box::new(IssuanceError::Internal("test".into())),
            Box::new(IssuanceError::InsufficientInputAmount {
                needed: Decimal::TEN,
                attached: Decimal::ONE,
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("EI_ERR_"),
                "Error missing EI_ERR_ prefix: {msg}"
            );
        }
    }
}
