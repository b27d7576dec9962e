//! Configuration for an exchange issuance contract instance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, IssuanceError, Result, constants};

/// How the orchestrator settles the caller's side of a trade-and-settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Mint the largest basket amount the acquired components support, and
    /// pay out the full realized output on redemption.
    #[default]
    MaxObtainable,
    /// Mint exactly the caller's minimum and pay out exactly the caller's
    /// minimum; anything above stays in the contract as residue.
    ReferenceFloor,
}

impl fmt::Display for SettlementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxObtainable => write!(f, "MAX_OBTAINABLE"),
            Self::ReferenceFloor => write!(f, "REFERENCE_FLOOR"),
        }
    }
}

/// Deployment parameters of one contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The contract's own account address.
    pub contract: Address,
    /// Administrative role: may rotate the treasury and sweep residue.
    pub owner: Address,
    /// Destination of swept residue.
    pub treasury: Address,
    /// The basket ledger's issuance module; receives component approvals.
    pub issuance_module: Address,
    /// Mint/payout policy.
    pub settlement_policy: SettlementPolicy,
    /// Return input asset left unspent after trades to the caller.
    pub refund_unspent_input: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract: Address::labeled(constants::DEFAULT_CONTRACT_LABEL),
            owner: Address::labeled(constants::DEFAULT_OWNER_LABEL),
            treasury: Address::labeled(constants::DEFAULT_TREASURY_LABEL),
            issuance_module: Address::labeled(constants::DEFAULT_ISSUANCE_MODULE_LABEL),
            settlement_policy: SettlementPolicy::default(),
            refund_unspent_input: true,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that would make the contract unusable.
    ///
    /// # Errors
    /// Returns [`IssuanceError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let roles = [
            ("contract", self.contract),
            ("owner", self.owner),
            ("treasury", self.treasury),
            ("issuance_module", self.issuance_module),
        ];
        for (name, addr) in roles {
            if addr.is_zero() || addr.is_native() {
                return Err(IssuanceError::Configuration(format!(
                    "{name} must be a real account, got {addr}"
                )));
            }
        }
        if self.treasury == self.contract {
            return Err(IssuanceError::Configuration(
                "treasury cannot be the contract itself".into(),
            ));
        }
        if self.issuance_module == self.contract {
            return Err(IssuanceError::Configuration(
                "issuance_module cannot be the contract itself".into(),
            ));
        }
        Ok(())
    }
}
