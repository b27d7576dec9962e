//! The host ledger: one deterministic global state with atomic frames.
//!
//! Every externally visible mutation happens through a [`Ledger`]. Calls
//! that must be all-or-nothing run inside [`Ledger::atomic`], which
//! snapshots the state and restores it if the closure fails. Frames nest:
//! an inner failure reverts only the inner frame's effects, and the error
//! then propagates to the outer frame, which reverts too unless the caller
//! handles it.
//!
//! ```text
//!   atomic ─┬─ snapshot ── f(ledger) ──┬─ Ok  ─▶ keep state
//!           │                          └─ Err ─▶ restore snapshot
//!           └─ depth 0 assigns the TxId stamped on emitted events
//! ```

use chrono::Utc;
use issuance_types::{
    Address, Component, ContractEvent, EventKind, EventRecord, IssuanceError, Result, TxId,
    constants,
};
use rust_decimal::Decimal;

use crate::basket::{BasketDefinition, BasketRegistry};
use crate::token_book::TokenBook;

#[derive(Debug, Clone)]
struct LedgerState {
    tokens: TokenBook,
    baskets: BasketRegistry,
    events: Vec<EventRecord>,
}

/// Global token, basket and event state.
#[derive(Debug)]
pub struct Ledger {
    state: LedgerState,
    /// Nesting depth of `atomic` frames currently open.
    depth: usize,
    /// Transaction of the outermost open frame.
    tx_id: Option<TxId>,
}

impl Ledger {
    /// Create a ledger whose issuance module lives at the default address.
    #[must_use]
    pub fn new() -> Self {
        Self::with_issuance_module(Address::labeled(constants::DEFAULT_ISSUANCE_MODULE_LABEL))
    }

    #[must_use]
    pub fn with_issuance_module(module: Address) -> Self {
        Self {
            state: LedgerState {
                tokens: TokenBook::new(),
                baskets: BasketRegistry::new(module),
                events: Vec::new(),
            },
            depth: 0,
            tx_id: None,
        }
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Run `f` as one all-or-nothing frame.
    ///
    /// # Errors
    /// Returns whatever `f` returns; on `Err` the ledger is exactly as it
    /// was before the call.
    pub fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.state.clone();
        let outermost = self.depth == 0;
        if outermost {
            self.tx_id = Some(TxId::new());
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        if let Err(err) = &out {
            self.state = snapshot;
            tracing::debug!(depth = self.depth, reason = err.reason(), "Frame reverted");
        }
        if outermost {
            self.tx_id = None;
        }
        out
    }

    /// Whether an `atomic` frame is currently open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    #[must_use]
    pub fn tokens(&self) -> &TokenBook {
        &self.state.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenBook {
        &mut self.state.tokens
    }

    #[must_use]
    pub fn balance_of(&self, asset: Address, holder: Address) -> Decimal {
        self.state.tokens.balance_of(asset, holder)
    }

    #[must_use]
    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Decimal {
        self.state.tokens.allowance(asset, owner, spender)
    }

    pub fn register_token(&mut self, asset: Address, symbol: &str) -> Result<()> {
        self.state.tokens.register(asset, symbol)
    }

    /// Faucet: create `amount` of `asset` for `to`.
    pub fn mint(&mut self, asset: Address, to: Address, amount: Decimal) -> Result<()> {
        self.state.tokens.mint(asset, to, amount)
    }

    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        self.state.tokens.transfer(asset, from, to, amount)
    }

    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        self.state
            .tokens
            .transfer_from(asset, spender, from, to, amount)
    }

    pub fn approve(
        &mut self,
        asset: Address,
        owner: Address,
        spender: Address,
        amount: Decimal,
    ) -> Result<()> {
        self.state.tokens.approve(asset, owner, spender, amount)?;
        tracing::debug!(
            asset = %asset,
            owner = %owner.short(),
            spender = %spender.short(),
            %amount,
            "Allowance set"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Baskets
    // ------------------------------------------------------------------

    #[must_use]
    pub fn baskets(&self) -> &BasketRegistry {
        &self.state.baskets
    }

    pub fn baskets_mut(&mut self) -> &mut BasketRegistry {
        &mut self.state.baskets
    }

    /// Address of the basket issuance module.
    #[must_use]
    pub fn issuance_module(&self) -> Address {
        self.state.baskets.module()
    }

    /// Register the basket token, define its components, and add it to the
    /// registry.
    pub fn create_basket(
        &mut self,
        address: Address,
        symbol: &str,
        components: Vec<Component>,
    ) -> Result<()> {
        self.atomic(|ledger| {
            ledger.state.tokens.register(address, symbol)?;
            ledger.state.baskets.define(BasketDefinition {
                address,
                symbol: symbol.to_string(),
                components,
                external_positions: std::collections::HashMap::new(),
            })?;
            ledger.state.baskets.add_set(address)
        })
    }

    /// Mint `quantity` baskets to `to`, pulling `unit × quantity` of every
    /// component from `payer` through the issuance module's allowance.
    ///
    /// # Errors
    /// - `InvalidSet` if the basket is not registered
    /// - `InvalidInputs` for a non-positive quantity
    /// - `InsufficientAllowance` / `InsufficientBalance` from any pull
    pub fn issue_basket(
        &mut self,
        payer: Address,
        basket: Address,
        quantity: Decimal,
        to: Address,
    ) -> Result<()> {
        let components = self.registered_components(basket, quantity)?;
        let module = self.issuance_module();
        self.atomic(|ledger| {
            for component in &components {
                let required = component.quantity_for(quantity)?;
                ledger
                    .state
                    .tokens
                    .transfer_from(component.asset, module, payer, basket, required)?;
            }
            ledger.state.tokens.mint(basket, to, quantity)
        })?;
        tracing::debug!(basket = %basket, %quantity, to = %to.short(), "Basket issued");
        Ok(())
    }

    /// Burn `quantity` baskets held by `holder` and release `unit × quantity`
    /// of every component to `to`.
    ///
    /// # Errors
    /// - `InvalidSet` if the basket is not registered
    /// - `InsufficientBalance` if `holder` holds fewer baskets
    pub fn redeem_basket(
        &mut self,
        holder: Address,
        basket: Address,
        quantity: Decimal,
        to: Address,
    ) -> Result<()> {
        let components = self.registered_components(basket, quantity)?;
        self.atomic(|ledger| {
            ledger.state.tokens.burn(basket, holder, quantity)?;
            for component in &components {
                let released = component.quantity_for(quantity)?;
                ledger
                    .state
                    .tokens
                    .transfer(component.asset, basket, to, released)?;
            }
            Ok(())
        })?;
        tracing::debug!(basket = %basket, %quantity, to = %to.short(), "Basket redeemed");
        Ok(())
    }

    fn registered_components(&self, basket: Address, quantity: Decimal) -> Result<Vec<Component>> {
        if !self.state.baskets.is_set(basket) {
            return Err(IssuanceError::InvalidSet(basket));
        }
        if quantity <= Decimal::ZERO {
            return Err(IssuanceError::InvalidInputs {
                reason: format!("basket quantity must be positive, got {quantity}"),
            });
        }
        Ok(self.state.baskets.definition(basket)?.components.clone())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Append an event to the log, stamped with the open transaction.
    pub fn emit(&mut self, emitter: Address, event: ContractEvent) {
        let sequence = self.state.events.len() as u64;
        let tx_id = self.tx_id.unwrap_or_default();
        self.state.events.push(EventRecord {
            tx_id,
            emitter,
            sequence,
            event,
            emitted_at: Utc::now(),
        });
    }

    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.state.events
    }

    /// Events of one kind, in log order.
    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &EventRecord> {
        self.state
            .events
            .iter()
            .filter(move |r| r.event.kind() == kind)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
