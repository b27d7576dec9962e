//! Fungible token balances and allowances.
//!
//! Tracks per-(asset, holder) balances, per-(asset, owner, spender)
//! allowances, and per-asset total supply. Native currency lives in the
//! same book under [`Address::NATIVE`] but has no allowances.
//!
//! All mutations are atomic: either the full operation succeeds or the
//! book is unchanged.

use std::collections::HashMap;

use issuance_types::{Address, IssuanceError, Result, constants};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Metadata for a registered asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub total_supply: Decimal,
    /// Simulates a non-standard token whose `approve` always reverts.
    pub rejects_approvals: bool,
}

impl TokenInfo {
    fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            total_supply: Decimal::ZERO,
            rejects_approvals: false,
        }
    }
}

/// Balances and allowances for every registered asset.
#[derive(Debug, Clone)]
pub struct TokenBook {
    tokens: HashMap<Address, TokenInfo>,
    balances: HashMap<(Address, Address), Decimal>,
    allowances: HashMap<(Address, Address, Address), Decimal>,
    /// Count of allowance-mutating calls that succeeded.
    allowance_writes: u64,
}

impl TokenBook {
    /// Create a book that knows only the native currency.
    #[must_use]
    pub fn new() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(Address::NATIVE, TokenInfo::new("NATIVE"));
        Self {
            tokens,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            allowance_writes: 0,
        }
    }

    /// Register a new asset.
    ///
    /// # Errors
    /// Returns `Configuration` if the address is already registered or is
    /// the zero address.
    pub fn register(&mut self, asset: Address, symbol: &str) -> Result<()> {
        if asset.is_zero() {
            return Err(IssuanceError::Configuration(
                "cannot register the zero address as an asset".into(),
            ));
        }
        if self.tokens.contains_key(&asset) {
            return Err(IssuanceError::Configuration(format!(
                "asset {asset} already registered"
            )));
        }
        self.tokens.insert(asset, TokenInfo::new(symbol));
        Ok(())
    }

    /// Toggle the non-standard "approve always reverts" behaviour.
    pub fn set_rejects_approvals(&mut self, asset: Address, rejects: bool) -> Result<()> {
        self.info_mut(asset)?.rejects_approvals = rejects;
        Ok(())
    }

    #[must_use]
    pub fn info(&self, asset: Address) -> Option<&TokenInfo> {
        self.tokens.get(&asset)
    }

    #[must_use]
    pub fn is_registered(&self, asset: Address) -> bool {
        self.tokens.contains_key(&asset)
    }

    fn info_mut(&mut self, asset: Address) -> Result<&mut TokenInfo> {
        self.tokens
            .get_mut(&asset)
            .ok_or(IssuanceError::UnknownAsset(asset))
    }

    #[must_use]
    pub fn balance_of(&self, asset: Address, holder: Address) -> Decimal {
        self.balances
            .get(&(asset, holder))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn total_supply(&self, asset: Address) -> Decimal {
        self.tokens
            .get(&asset)
            .map_or(Decimal::ZERO, |t| t.total_supply)
    }

    /// Create new units (faucet / basket mint).
    pub fn mint(&mut self, asset: Address, to: Address, amount: Decimal) -> Result<()> {
        let info = self.info_mut(asset)?;
        info.total_supply = info
            .total_supply
            .checked_add(amount)
            .ok_or(IssuanceError::ArithmeticOverflow)?;
        let current = self.balance_of(asset, to);
        let updated = current
            .checked_add(amount)
            .ok_or(IssuanceError::ArithmeticOverflow)?;
        self.balances.insert((asset, to), updated);
        Ok(())
    }

    /// Destroy units held by `from`.
    pub fn burn(&mut self, asset: Address, from: Address, amount: Decimal) -> Result<()> {
        let held = self.balance_of(asset, from);
        if held < amount {
            return Err(IssuanceError::InsufficientBalance {
                asset,
                needed: amount,
                available: held,
            });
        }
        let info = self.info_mut(asset)?;
        info.total_supply = info
            .total_supply
            .checked_sub(amount)
            .ok_or(IssuanceError::BalanceUnderflow)?;
        self.balances.insert((asset, from), held - amount);
        Ok(())
    }

    /// Move `amount` of `asset` from `from` to `to`.
    ///
    /// # Errors
    /// - `UnknownAsset` if the asset is not registered
    /// - `InsufficientBalance` if `from` holds less than `amount`
    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        if !self.is_registered(asset) {
            return Err(IssuanceError::UnknownAsset(asset));
        }
        if amount.is_sign_negative() {
            return Err(IssuanceError::InvalidInputs {
                reason: format!("negative transfer of {amount}"),
            });
        }
        let from_balance = self.balance_of(asset, from);
        if from_balance < amount {
            return Err(IssuanceError::InsufficientBalance {
                asset,
                needed: amount,
                available: from_balance,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(IssuanceError::ArithmeticOverflow)?;
        self.balances.insert((asset, from), from_balance - amount);
        self.balances.insert((asset, to), to_balance);
        Ok(())
    }

    #[must_use]
    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Decimal {
        self.allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Set the allowance `owner` grants `spender` over `asset`.
    ///
    /// # Errors
    /// - `InvalidInputs` for the native currency (it is forwarded, not approved)
    /// - `UnknownAsset` if the asset is not registered
    /// - `ApprovalRejected` if the token refuses approvals
    pub fn approve(
        &mut self,
        asset: Address,
        owner: Address,
        spender: Address,
        amount: Decimal,
    ) -> Result<()> {
        if asset.is_native() {
            return Err(IssuanceError::InvalidInputs {
                reason: "native currency cannot be approved".into(),
            });
        }
        let info = self
            .tokens
            .get(&asset)
            .ok_or(IssuanceError::UnknownAsset(asset))?;
        if info.rejects_approvals {
            return Err(IssuanceError::ApprovalRejected { asset });
        }
        self.allowances.insert((asset, owner, spender), amount);
        self.allowance_writes += 1;
        Ok(())
    }

    /// Pull `amount` of `asset` from `from` to `to` on behalf of `spender`.
    ///
    /// An allowance at [`constants::MAX_ALLOWANCE`] is treated as unlimited
    /// and is not decremented.
    ///
    /// # Errors
    /// - `InsufficientAllowance` if the allowance is below `amount`
    /// - any error of [`TokenBook::transfer`]
    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        let allowance = self.allowance(asset, from, spender);
        if allowance < amount {
            return Err(IssuanceError::InsufficientAllowance {
                asset,
                needed: amount,
                allowance,
            });
        }
        self.transfer(asset, from, to, amount)?;
        if allowance != constants::MAX_ALLOWANCE {
            self.allowances
                .insert((asset, from, spender), allowance - amount);
        }
        Ok(())
    }

    /// Number of successful allowance-mutating calls so far.
    #[must_use]
    pub fn allowance_writes(&self) -> u64 {
        self.allowance_writes
    }

    /// Verify that the sum of all holder balances equals the recorded
    /// total supply for `asset`.
    ///
    /// # Errors
    /// Returns `Internal` if the two disagree. Native currency is minted
    /// only through [`TokenBook::mint`], so the check applies to it too.
    pub fn verify_supply(&self, asset: Address) -> Result<()> {
        let actual: Decimal = self
            .balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .map(|(_, amount)| *amount)
            .sum();
        let expected = self.total_supply(asset);
        if actual != expected {
            return Err(IssuanceError::Internal(format!(
                "supply mismatch for {asset}: balances sum to {actual}, supply is {expected}"
            )));
        }
        Ok(())
    }
}

impl Default for TokenBook {
    fn default() -> Self {
        Self::new()
    }
}
