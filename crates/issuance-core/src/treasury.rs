//! Treasury sweep and access control.
//!
//! Residue (positive slippage, ReferenceFloor surplus, stray transfers)
//! accumulates in the contract between calls. Sweeps move the contract's
//! whole balance of one asset to the treasury. They share the reentrancy
//! guard with issue/redeem, so a venue cannot sweep a caller's in-flight
//! funds, and only the owner or the treasury may call them.
//!
//! Role changes take `&mut self`, which no venue can obtain while a
//! trade-and-settle call holds the contract.

use issuance_ledger::Ledger;
use issuance_types::{Address, ContractEvent, IssuanceError, Result};
use rust_decimal::Decimal;

use crate::exchange::ExchangeIssuance;

impl ExchangeIssuance {
    /// Current treasury.
    #[must_use]
    pub fn treasury(&self) -> Address {
        self.config.treasury
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.config.owner
    }

    /// Send the contract's entire balance of `asset` to the treasury.
    ///
    /// Returns the amount swept; nothing is emitted for an empty balance.
    ///
    /// # Errors
    /// `REENTRANT_CALL`, `UNAUTHORIZED`, or a ledger error.
    pub fn withdraw_excess_token(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        asset: Address,
    ) -> Result<Decimal> {
        let _entered = self.guard.enter()?;
        self.require_admin(caller, "withdraw excess")?;
        let (contract, treasury) = (self.config.contract, self.config.treasury);
        ledger.atomic(|ledger| {
            let amount = ledger.balance_of(asset, contract);
            if amount <= Decimal::ZERO {
                tracing::debug!(asset = %asset.short(), "Nothing to sweep");
                return Ok(Decimal::ZERO);
            }
            ledger.transfer(asset, contract, treasury, amount)?;
            ledger.emit(contract, ContractEvent::ExcessWithdrawn {
                asset,
                amount,
                treasury,
            });
            tracing::info!(asset = %asset.short(), %amount, treasury = %treasury, "Excess withdrawn");
            Ok(amount)
        })
    }

    /// Native-currency variant of [`ExchangeIssuance::withdraw_excess_token`].
    ///
    /// # Errors
    /// Same as [`ExchangeIssuance::withdraw_excess_token`].
    pub fn withdraw_excess_native(&self, ledger: &mut Ledger, caller: Address) -> Result<Decimal> {
        self.withdraw_excess_token(ledger, caller, Address::NATIVE)
    }

    /// Point sweeps at a new treasury. Callable by the current treasury or
    /// the owner.
    ///
    /// # Errors
    /// `UNAUTHORIZED`, or `INVALID_INPUTS` for the zero, native or contract
    /// address.
    pub fn update_treasury(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        new_treasury: Address,
    ) -> Result<()> {
        self.require_admin(caller, "update treasury")?;
        self.require_account(new_treasury, "treasury")?;
        let previous = self.config.treasury;
        let contract = self.config.contract;
        ledger.atomic(|ledger| {
            ledger.emit(contract, ContractEvent::TreasuryUpdated {
                previous,
                new: new_treasury,
            });
            Ok(())
        })?;
        self.config.treasury = new_treasury;
        tracing::info!(previous = %previous, new = %new_treasury, "Treasury updated");
        Ok(())
    }

    /// Hand the owner role to `new_owner`. Owner only.
    ///
    /// # Errors
    /// `UNAUTHORIZED`, or `INVALID_INPUTS` for the zero, native or contract
    /// address.
    pub fn transfer_ownership(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        new_owner: Address,
    ) -> Result<()> {
        if caller != self.config.owner {
            tracing::warn!(caller = %caller, "Ownership transfer rejected");
            return Err(IssuanceError::Unauthorized {
                caller,
                action: "transfer ownership".into(),
            });
        }
        self.require_account(new_owner, "owner")?;
        let previous = self.config.owner;
        let contract = self.config.contract;
        ledger.atomic(|ledger| {
            ledger.emit(contract, ContractEvent::OwnershipTransferred {
                previous,
                new: new_owner,
            });
            Ok(())
        })?;
        self.config.owner = new_owner;
        tracing::info!(previous = %previous, new = %new_owner, "Ownership transferred");
        Ok(())
    }

    fn require_account(&self, addr: Address, role: &str) -> Result<()> {
        if addr.is_zero() || addr.is_native() || addr == self.config.contract {
            return Err(IssuanceError::InvalidInputs {
                reason: format!("{role} cannot be {addr}"),
            });
        }
        Ok(())
    }
}
