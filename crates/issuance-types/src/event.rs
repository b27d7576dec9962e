//! Contract events for the append-only audit log.
//!
//! Every state-changing entry point emits one or more [`ContractEvent`]s.
//! The host ledger stamps each with the emitting contract, the transaction
//! and a timestamp, producing an [`EventRecord`]. Records emitted inside a
//! reverted frame are discarded together with the frame.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, TxId};

/// Discriminant of a [`ContractEvent`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    SetIssued,
    SetRedeemed,
    Refund,
    TreasuryUpdated,
    OwnershipTransferred,
    ExcessWithdrawn,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetIssued => write!(f, "SET_ISSUED"),
            Self::SetRedeemed => write!(f, "SET_REDEEMED"),
            Self::Refund => write!(f, "REFUND"),
            Self::TreasuryUpdated => write!(f, "TREASURY_UPDATED"),
            Self::OwnershipTransferred => write!(f, "OWNERSHIP_TRANSFERRED"),
            Self::ExcessWithdrawn => write!(f, "EXCESS_WITHDRAWN"),
        }
    }
}

/// Something observable happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractEvent {
    /// Baskets were minted to `recipient` against `input_amount` of `input_asset`.
    SetIssued {
        recipient: Address,
        basket: Address,
        input_asset: Address,
        input_amount: Decimal,
        basket_amount_out: Decimal,
    },
    /// Baskets were burned and `output_amount_out` of `output_asset` paid out.
    SetRedeemed {
        recipient: Address,
        basket: Address,
        output_asset: Address,
        basket_amount_in: Decimal,
        output_amount_out: Decimal,
    },
    /// Unused input returned to the caller.
    Refund { recipient: Address, amount: Decimal },
    /// Treasury payout address rotated.
    TreasuryUpdated { previous: Address, new: Address },
    /// Owner role handed over.
    OwnershipTransferred { previous: Address, new: Address },
    /// Residual balance swept to the treasury.
    ExcessWithdrawn {
        asset: Address,
        amount: Decimal,
        treasury: Address,
    },
}

impl ContractEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SetIssued { .. } => EventKind::SetIssued,
            Self::SetRedeemed { .. } => EventKind::SetRedeemed,
            Self::Refund { .. } => EventKind::Refund,
            Self::TreasuryUpdated { .. } => EventKind::TreasuryUpdated,
            Self::OwnershipTransferred { .. } => EventKind::OwnershipTransferred,
            Self::ExcessWithdrawn { .. } => EventKind::ExcessWithdrawn,
        }
    }
}

/// A logged event with its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Transaction that emitted the event.
    pub tx_id: TxId,
    /// Contract that emitted the event.
    pub emitter: Address,
    /// Position in the log.
    pub sequence: u64,
    pub event: ContractEvent,
    pub emitted_at: DateTime<Utc>,
}
