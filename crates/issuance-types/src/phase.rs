//! Per-call settlement lifecycle.
//!
//! Each issuance or redemption walks
//! **START → INPUT_CUSTODIED → TRADED → SETTLED → PAID_OUT → DONE**.
//! A failure at any phase reverts the whole transaction back to START;
//! phases are never observable from outside a running call.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The phases of one trade-and-settle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum SettlementPhase {
    /// Nothing taken yet; preconditions are checked here.
    Start,
    /// Caller's input (tokens, native value, or baskets) is held by the contract.
    InputCustodied,
    /// All trade legs executed.
    Traded,
    /// Baskets minted (issue) or output reconciled (redeem).
    Settled,
    /// Caller paid and refunds sent.
    PaidOut,
    /// Event emitted; call returns.
    Done,
}

impl SettlementPhase {
    /// Return the next phase, or `None` at `Done`.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::InputCustodied),
            Self::InputCustodied => Some(Self::Traded),
            Self::Traded => Some(Self::Settled),
            Self::Settled => Some(Self::PaidOut),
            Self::PaidOut => Some(Self::Done),
            Self::Done => None,
        }
    }
}

impl fmt::Display for SettlementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "START"),
            Self::InputCustodied => write!(f, "INPUT_CUSTODIED"),
            Self::Traded => write!(f, "TRADED"),
            Self::Settled => write!(f, "SETTLED"),
            Self::PaidOut => write!(f, "PAID_OUT"),
            Self::Done => write!(f, "DONE"),
        }
    }
}
