//! Issuance / redemption orchestrator.
//!
//! Both entry points are one all-or-nothing transaction over the ledger.
//!
//! ```text
//!   ┌───────┐   ┌────────────────┐   ┌────────┐   ┌─────────┐   ┌─────────┐   ┌──────┐
//!   │ START │──▶│ INPUT_CUSTODIED│──▶│ TRADED │──▶│ SETTLED │──▶│ PAID_OUT│──▶│ DONE │
//!   └───────┘   └────────────────┘   └────────┘   └─────────┘   └─────────┘   └──────┘
//!       ▲                │ any error                                             │
//!       └────────────────┴──────────── frame restored ◀──────────────────────────┘
//! ```
//!
//! The reentrancy guard is held for the whole call. A venue that calls
//! back into the contract gets `REENTRANT_CALL`; its own frame reverts and
//! the error propagates out through `VENUE_REVERTED`. If the venue catches
//! that error and carries on, the tripped guard fails the outer call with
//! `REENTRANT_CALL` before its frame commits.
//!
//! Output is always measured as a balance delta taken around the trades,
//! so residue from earlier calls is never paid to the current caller.

use std::collections::HashMap;

use issuance_ledger::{BasketDefinition, Ledger};
use issuance_types::{
    Address, Call, ContractEvent, EngineConfig, IssuanceError, IssueRequest, RedeemRequest,
    Result, SettlementPhase, SettlementPolicy, amount, constants,
};
use rust_decimal::Decimal;

use crate::allowance;
use crate::executor::{self, ApprovalPlan};
use crate::guard::ReentrancyGuard;
use crate::validator;
use crate::venue::VenueRegistry;

/// One deployed exchange issuance contract.
#[derive(Debug)]
pub struct ExchangeIssuance {
    pub(crate) config: EngineConfig,
    venues: VenueRegistry,
    pub(crate) guard: ReentrancyGuard,
}

impl ExchangeIssuance {
    /// Deploy with no venues.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid or names a different
    /// issuance module than the ledger's.
    pub fn new(config: EngineConfig, ledger: &Ledger) -> Result<Self> {
        Self::with_venues(config, ledger, VenueRegistry::new())
    }

    /// Deploy with a prepared venue registry.
    ///
    /// # Errors
    /// Same as [`ExchangeIssuance::new`].
    pub fn with_venues(config: EngineConfig, ledger: &Ledger, venues: VenueRegistry) -> Result<Self> {
        config.validate()?;
        if config.issuance_module != ledger.issuance_module() {
            return Err(IssuanceError::Configuration(format!(
                "issuance module {} does not match the ledger's {}",
                config.issuance_module,
                ledger.issuance_module()
            )));
        }
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            contract = %config.contract,
            treasury = %config.treasury,
            policy = %config.settlement_policy,
            venues = venues.len(),
            "Contract deployed"
        );
        Ok(Self {
            config,
            venues,
            guard: ReentrancyGuard::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn venues(&self) -> &VenueRegistry {
        &self.venues
    }

    pub fn venues_mut(&mut self) -> &mut VenueRegistry {
        &mut self.venues
    }

    /// Whether a guarded entry point is running right now.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_entered()
    }

    // ------------------------------------------------------------------
    // Approvals
    // ------------------------------------------------------------------

    /// Pre-warm the issuance module's allowance over `asset`.
    ///
    /// # Errors
    /// Surfaces the ledger's approve error.
    pub fn approve_token(&self, ledger: &mut Ledger, asset: Address) -> Result<()> {
        self.approve_tokens(ledger, &[asset])
    }

    /// Pre-warm several allowances at once; all or none.
    ///
    /// # Errors
    /// Surfaces the first approve error; no allowance is changed.
    pub fn approve_tokens(&self, ledger: &mut Ledger, assets: &[Address]) -> Result<()> {
        let (contract, module) = (self.config.contract, self.config.issuance_module);
        ledger.atomic(|ledger| {
            for &asset in assets {
                allowance::ensure_approval(
                    ledger,
                    contract,
                    asset,
                    module,
                    constants::MAX_ALLOWANCE,
                )?;
            }
            Ok(())
        })
    }

    /// Approve every component of `basket` to the issuance module.
    ///
    /// External positions are checked on all components before the first
    /// approval.
    ///
    /// # Errors
    /// `INVALID_SET`, `EXTERNAL_POSITIONS`, or an approve error.
    pub fn approve_set_token(&self, ledger: &mut Ledger, basket: Address) -> Result<()> {
        let definition = validator::require_valid_basket(ledger, basket)?;
        validator::require_no_external_positions(definition)?;
        let assets: Vec<Address> = definition.components.iter().map(|c| c.asset).collect();
        self.approve_tokens(ledger, &assets)?;
        tracing::info!(basket = %basket, components = assets.len(), "Basket approved");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Issue
    // ------------------------------------------------------------------

    /// Pay `input_amount` of one asset, trade it into the basket's
    /// components, and mint the basket to the caller.
    ///
    /// Returns the basket amount minted.
    ///
    /// # Errors
    /// `REENTRANT_CALL`, `INVALID_SET`, `INVALID_INPUTS`, `INVALID_ORDERS`,
    /// `INSUFFICIENT_INPUT_AMOUNT`, `INSUFFICIENT_OUTPUT_AMOUNT`, any venue
    /// or ledger error. On error the ledger is unchanged.
    pub fn issue_set_for_exact_token(
        &self,
        ledger: &mut Ledger,
        call: Call,
        request: &IssueRequest,
    ) -> Result<Decimal> {
        let entered = self.guard.enter()?;
        let span = tracing::info_span!("issue", basket = %request.basket, sender = %call.sender.short());
        let _span = span.enter();
        ledger.atomic(|ledger| {
            let minted = self.issue_in_frame(ledger, call, request)?;
            entered.require_untripped()?;
            Ok(minted)
        })
    }

    fn issue_in_frame(&self, ledger: &mut Ledger, call: Call, req: &IssueRequest) -> Result<Decimal> {
        let contract = self.config.contract;
        let mut progress = Progress::start();

        let definition = validator::require_valid_basket(ledger, req.basket)?.clone();
        amount::require_positive(req.input_amount, "input_amount")?;
        amount::require_positive(req.min_basket_out, "min_basket_out")?;
        validator::require_leg_per_component(&definition, &req.instructions)?;
        require_outside_basket(&definition, req.input_asset, "input")?;
        let native_input = req.input_asset.is_native();
        if native_input && call.value < req.input_amount {
            return Err(IssuanceError::InsufficientInputAmount {
                needed: req.input_amount,
                attached: call.value,
            });
        }

        // Custody.
        let input_prior = ledger.balance_of(req.input_asset, contract);
        take_value(ledger, call, contract)?;
        let native_prior = amount::delta(ledger.balance_of(Address::NATIVE, contract), call.value)?;
        if !native_input {
            ledger.transfer_from(req.input_asset, contract, call.sender, contract, req.input_amount)?;
        }
        progress.advance();

        // Trades.
        let before: Vec<Decimal> = definition
            .components
            .iter()
            .map(|c| ledger.balance_of(c.asset, contract))
            .collect();
        let plan = ApprovalPlan::SpendInput {
            asset: req.input_asset,
            amount: req.input_amount,
        };
        executor::execute(ledger, self, &req.instructions, &plan)?;
        progress.advance();

        // Settlement.
        let obtainable = self.max_obtainable(ledger, &definition, &before)?;
        if obtainable < req.min_basket_out {
            return Err(IssuanceError::InsufficientOutputAmount {
                needed: req.min_basket_out,
                realized: obtainable,
            });
        }
        let minted = match self.config.settlement_policy {
            SettlementPolicy::MaxObtainable => obtainable,
            SettlementPolicy::ReferenceFloor => req.min_basket_out,
        };
        for component in &definition.components {
            allowance::ensure_approval(
                ledger,
                contract,
                component.asset,
                self.config.issuance_module,
                component.quantity_for(minted)?,
            )?;
        }
        ledger.issue_basket(contract, req.basket, minted, call.sender)?;
        progress.advance();

        // Refunds.
        let native_left = amount::delta(ledger.balance_of(Address::NATIVE, contract), native_prior)?;
        if native_input {
            let excess_value = amount::delta(call.value, req.input_amount)?;
            let refund = if self.config.refund_unspent_input {
                native_left
            } else {
                native_left.min(excess_value)
            };
            self.refund(ledger, call.sender, Address::NATIVE, refund)?;
        } else {
            // Legs may not spend more than the caller paid in.
            let input_left = amount::delta(ledger.balance_of(req.input_asset, contract), input_prior)?;
            if self.config.refund_unspent_input {
                self.refund(ledger, call.sender, req.input_asset, input_left)?;
            }
            self.refund(ledger, call.sender, Address::NATIVE, native_left)?;
        }
        progress.advance();

        ledger.emit(contract, ContractEvent::SetIssued {
            recipient: call.sender,
            basket: req.basket,
            input_asset: req.input_asset,
            input_amount: req.input_amount,
            basket_amount_out: minted,
        });
        progress.advance();

        tracing::info!(
            input_asset = %req.input_asset.short(),
            input_amount = %req.input_amount,
            minted = %minted,
            obtainable = %obtainable,
            "Basket issued"
        );
        Ok(minted)
    }

    /// Largest basket amount the component balance growth since `before`
    /// supports, rounded toward zero.
    fn max_obtainable(
        &self,
        ledger: &Ledger,
        definition: &BasketDefinition,
        before: &[Decimal],
    ) -> Result<Decimal> {
        let contract = self.config.contract;
        let tick = Decimal::new(1, constants::QTY_PRECISION);
        let mut best: Option<Decimal> = None;
        for (component, prior) in definition.components.iter().zip(before) {
            let acquired = amount::delta(ledger.balance_of(component.asset, contract), *prior)?;
            let mut supported = amount::floor_qty(amount::checked_div(acquired, component.unit)?);
            // Division is rounded at 28 significant digits and may land a
            // tick above the exact quotient.
            if supported > Decimal::ZERO && component.quantity_for(supported)? > acquired {
                supported -= tick;
            }
            tracing::debug!(
                component = %component.asset.short(),
                %acquired,
                %supported,
                "Component acquired"
            );
            best = Some(best.map_or(supported, |b| b.min(supported)));
        }
        Ok(best.unwrap_or(Decimal::ZERO))
    }

    // ------------------------------------------------------------------
    // Redeem
    // ------------------------------------------------------------------

    /// Burn `basket_amount` of the caller's baskets, trade the released
    /// components into one asset, and pay it to the caller.
    ///
    /// Returns the amount paid out.
    ///
    /// # Errors
    /// `REENTRANT_CALL`, `INVALID_SET`, `INVALID_INPUTS`, `INVALID_ORDERS`,
    /// `INSUFFICIENT_OUTPUT_AMOUNT`, `BALANCE_UNDERFLOW`, any venue or
    /// ledger error. On error the ledger is unchanged.
    pub fn redeem_exact_set_for_token(
        &self,
        ledger: &mut Ledger,
        call: Call,
        request: &RedeemRequest,
    ) -> Result<Decimal> {
        let entered = self.guard.enter()?;
        let span = tracing::info_span!("redeem", basket = %request.basket, sender = %call.sender.short());
        let _span = span.enter();
        ledger.atomic(|ledger| {
            let paid = self.redeem_in_frame(ledger, call, request)?;
            entered.require_untripped()?;
            Ok(paid)
        })
    }

    fn redeem_in_frame(&self, ledger: &mut Ledger, call: Call, req: &RedeemRequest) -> Result<Decimal> {
        let contract = self.config.contract;
        let mut progress = Progress::start();

        let definition = validator::require_valid_basket(ledger, req.basket)?.clone();
        amount::require_positive(req.basket_amount, "basket_amount")?;
        amount::require_positive(req.min_output_out, "min_output_out")?;
        validator::require_leg_per_component(&definition, &req.instructions)?;
        require_outside_basket(&definition, req.output_asset, "output")?;
        let native_output = req.output_asset.is_native();

        take_value(ledger, call, contract)?;
        // Value attached to this call is not output.
        let native_prior = amount::delta(ledger.balance_of(Address::NATIVE, contract), call.value)?;
        let output_prior = if native_output {
            native_prior
        } else {
            ledger.balance_of(req.output_asset, contract)
        };

        // Custody: pull the caller's baskets and release the components.
        ledger.transfer_from(req.basket, contract, call.sender, contract, req.basket_amount)?;
        ledger.redeem_basket(contract, req.basket, req.basket_amount, contract)?;
        let released = definition
            .components
            .iter()
            .map(|c| Ok((c.asset, c.quantity_for(req.basket_amount)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        progress.advance();

        executor::execute(ledger, self, &req.instructions, &ApprovalPlan::SpendLegAsset {
            released: &released,
        })?;
        progress.advance();

        let realized = amount::delta(ledger.balance_of(req.output_asset, contract), output_prior)?;
        if realized < req.min_output_out {
            return Err(IssuanceError::InsufficientOutputAmount {
                needed: req.min_output_out,
                realized,
            });
        }
        let payout = match self.config.settlement_policy {
            SettlementPolicy::MaxObtainable => realized,
            SettlementPolicy::ReferenceFloor => req.min_output_out,
        };
        progress.advance();

        ledger.transfer(req.output_asset, contract, call.sender, payout)?;
        if !native_output {
            let native_left = amount::delta(ledger.balance_of(Address::NATIVE, contract), native_prior)?;
            self.refund(ledger, call.sender, Address::NATIVE, native_left)?;
        }
        progress.advance();

        ledger.emit(contract, ContractEvent::SetRedeemed {
            recipient: call.sender,
            basket: req.basket,
            output_asset: req.output_asset,
            basket_amount_in: req.basket_amount,
            output_amount_out: payout,
        });
        progress.advance();

        tracing::info!(
            output_asset = %req.output_asset.short(),
            basket_amount = %req.basket_amount,
            realized = %realized,
            paid = %payout,
            "Basket redeemed"
        );
        Ok(payout)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn refund(&self, ledger: &mut Ledger, recipient: Address, asset: Address, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Ok(());
        }
        ledger.transfer(asset, self.config.contract, recipient, amount)?;
        ledger.emit(self.config.contract, ContractEvent::Refund { recipient, amount });
        tracing::debug!(asset = %asset.short(), %amount, "Refunded");
        Ok(())
    }

    /// Fail unless `caller` is the owner or the treasury.
    pub(crate) fn require_admin(&self, caller: Address, action: &str) -> Result<()> {
        if caller == self.config.owner || caller == self.config.treasury {
            return Ok(());
        }
        tracing::warn!(caller = %caller, action, "Unauthorized call rejected");
        Err(IssuanceError::Unauthorized {
            caller,
            action: action.to_string(),
        })
    }
}

/// Move the call's attached native value into the contract.
fn take_value(ledger: &mut Ledger, call: Call, contract: Address) -> Result<()> {
    if call.value.is_sign_negative() {
        return Err(IssuanceError::InvalidInputs {
            reason: format!("negative call value {}", call.value),
        });
    }
    if call.value > Decimal::ZERO {
        ledger.transfer(Address::NATIVE, call.sender, contract, call.value)?;
    }
    Ok(())
}

/// The paying or paid asset cannot be the basket or one of its components:
/// its balance delta would mix custody with trade results.
fn require_outside_basket(definition: &BasketDefinition, asset: Address, role: &str) -> Result<()> {
    if asset == definition.address || definition.unit(asset).is_some() {
        return Err(IssuanceError::InvalidInputs {
            reason: format!("{role} asset {asset} is part of basket {}", definition.symbol),
        });
    }
    Ok(())
}

/// Tracks the settlement phase of one call for the log.
struct Progress {
    phase: SettlementPhase,
}

impl Progress {
    fn start() -> Self {
        Self {
            phase: SettlementPhase::Start,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            tracing::debug!(from = %self.phase, to = %next, "Phase");
            self.phase = next;
        }
    }
}
