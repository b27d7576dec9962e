//! Builds the world a scenario describes and replays its steps.

use issuance_core::{ExchangeIssuance, Quote, QuoteVenue, VenueRegistry};
use issuance_ledger::Ledger;
use issuance_types::{
    Address, Call, Component, EventRecord, IssueRequest, RedeemRequest, Result, TradeInstruction,
    constants,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::scenario::{LegSpec, NATIVE_LABEL, Scenario, Step};

/// Ledger plus the deployed contract.
pub struct World {
    pub ledger: Ledger,
    pub issuance: ExchangeIssuance,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    /// `OK` or the revert reason.
    pub outcome: String,
    pub amount: Option<Decimal>,
    pub error: Option<String>,
    pub expected: Option<String>,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceLine {
    pub holder: String,
    pub token: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario: String,
    pub steps: Vec<StepOutcome>,
    pub balances: Vec<BalanceLine>,
    pub events: Vec<EventRecord>,
}

impl Report {
    /// Number of steps whose outcome differed from the expectation.
    #[must_use]
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.matched).count()
    }

    #[must_use]
    pub fn all_matched(&self) -> bool {
        self.mismatches() == 0
    }

    /// Final balance of `token` held by `holder`, by label.
    #[cfg(test)]
    pub fn balance(&self, holder: &str, token: &str) -> Decimal {
        self.balances
            .iter()
            .find(|b| b.holder == holder && b.token == token)
            .map_or(Decimal::ZERO, |b| b.amount)
    }
}

/// Set up tokens, baskets, venues and accounts, then deploy the contract.
///
/// # Errors
/// Any ledger or configuration error while building.
pub fn build(scenario: &Scenario) -> Result<World> {
    let mut ledger = Ledger::with_issuance_module(scenario.config.issuance_module);

    for token in &scenario.tokens {
        let asset = scenario.resolve(&token.label)?;
        ledger.register_token(asset, &token.symbol)?;
        if token.rejects_approvals {
            ledger.tokens_mut().set_rejects_approvals(asset, true)?;
        }
    }

    for basket in &scenario.baskets {
        let address = scenario.resolve(&basket.label)?;
        let components = basket
            .components
            .iter()
            .map(|c| Ok(Component::new(scenario.resolve(&c.token)?, c.unit)))
            .collect::<Result<Vec<_>>>()?;
        ledger.create_basket(address, &basket.symbol, components)?;
        for ext in &basket.external_positions {
            ledger.baskets_mut().add_external_position(
                address,
                scenario.resolve(&ext.component)?,
                scenario.resolve(&ext.module)?,
            )?;
        }
    }

    let mut venues = VenueRegistry::new();
    for venue in &scenario.venues {
        let address = scenario.resolve(&venue.label)?;
        venues.register(address, QuoteVenue::new(venue.label.clone()))?;
        for holding in &venue.inventory {
            ledger.mint(scenario.resolve(&holding.token)?, address, holding.amount)?;
        }
    }

    let contract = scenario.config.contract;
    for account in &scenario.accounts {
        let holder = scenario.resolve(&account.label)?;
        for holding in &account.balances {
            ledger.mint(scenario.resolve(&holding.token)?, holder, holding.amount)?;
        }
        for token in &account.approve {
            ledger.approve(scenario.resolve(token)?, holder, contract, constants::MAX_ALLOWANCE)?;
        }
    }

    let issuance = ExchangeIssuance::with_venues(scenario.config.clone(), &ledger, venues)?;
    Ok(World { ledger, issuance })
}

impl World {
    /// Run one step. Returns the amount the entry point reported, if any.
    ///
    /// # Errors
    /// Whatever the entry point fails with.
    pub fn apply(&mut self, scenario: &Scenario, step: &Step) -> Result<Option<Decimal>> {
        match step {
            Step::ApproveSet { basket } => {
                self.issuance
                    .approve_set_token(&mut self.ledger, scenario.resolve(basket)?)?;
                Ok(None)
            }
            Step::Issue {
                caller,
                value,
                basket,
                input,
                input_amount,
                min_basket_out,
                legs,
            } => {
                let request = IssueRequest {
                    basket: scenario.resolve(basket)?,
                    input_asset: scenario.resolve(input)?,
                    input_amount: *input_amount,
                    min_basket_out: *min_basket_out,
                    instructions: build_legs(scenario, legs, Quote::acquire_leg)?,
                };
                let call = Call::from(scenario.resolve(caller)?).with_value(*value);
                self.issuance
                    .issue_set_for_exact_token(&mut self.ledger, call, &request)
                    .map(Some)
            }
            Step::Redeem {
                caller,
                value,
                basket,
                output,
                basket_amount,
                min_output_out,
                legs,
            } => {
                let request = RedeemRequest {
                    basket: scenario.resolve(basket)?,
                    output_asset: scenario.resolve(output)?,
                    basket_amount: *basket_amount,
                    min_output_out: *min_output_out,
                    instructions: build_legs(scenario, legs, Quote::dispose_leg)?,
                };
                let call = Call::from(scenario.resolve(caller)?).with_value(*value);
                self.issuance
                    .redeem_exact_set_for_token(&mut self.ledger, call, &request)
                    .map(Some)
            }
            Step::Sweep { caller, asset } => {
                let caller = scenario.resolve(caller)?;
                let asset = scenario.resolve(asset)?;
                let swept = if asset.is_native() {
                    self.issuance.withdraw_excess_native(&mut self.ledger, caller)?
                } else {
                    self.issuance
                        .withdraw_excess_token(&mut self.ledger, caller, asset)?
                };
                Ok(Some(swept))
            }
            Step::UpdateTreasury { caller, treasury } => {
                self.issuance.update_treasury(
                    &mut self.ledger,
                    scenario.resolve(caller)?,
                    scenario.resolve(treasury)?,
                )?;
                Ok(None)
            }
        }
    }
}

fn build_legs(
    scenario: &Scenario,
    legs: &[LegSpec],
    to_leg: fn(&Quote, Address) -> Result<TradeInstruction>,
) -> Result<Vec<TradeInstruction>> {
    legs.iter()
        .map(|leg| {
            let quote = Quote::new(
                scenario.resolve(&leg.sell)?,
                leg.sell_amount,
                scenario.resolve(&leg.buy)?,
                leg.buy_amount,
            );
            to_leg(&quote, scenario.resolve(&leg.venue)?)
        })
        .collect()
}

/// Replay every step and collect the outcome.
///
/// A step that fails is recorded, not fatal: later steps still run.
///
/// # Errors
/// Only errors building the world.
pub fn run(scenario: &Scenario) -> Result<Report> {
    let mut world = build(scenario)?;
    tracing::info!(
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        policy = %scenario.config.settlement_policy,
        "Scenario loaded"
    );

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, spec) in scenario.steps.iter().enumerate() {
        let op = spec.step.op();
        let result = world.apply(scenario, &spec.step);
        let (outcome, amount, error) = match result {
            Ok(amount) => ("OK".to_string(), amount, None),
            Err(err) => (err.reason().to_string(), None, Some(err.to_string())),
        };
        let matched = match &spec.expect_revert {
            Some(reason) => *reason == outcome,
            None => error.is_none(),
        };
        if matched {
            tracing::info!(index, op, %outcome, "Step finished");
        } else {
            tracing::warn!(
                index,
                op,
                %outcome,
                expected = spec.expect_revert.as_deref().unwrap_or("OK"),
                "Step did not match expectation"
            );
        }
        steps.push(StepOutcome {
            index,
            op,
            outcome,
            amount,
            error,
            expected: spec.expect_revert.clone(),
            matched,
        });
    }

    Ok(Report {
        scenario: scenario.name.clone(),
        steps,
        balances: balances(scenario, &world.ledger)?,
        events: world.ledger.events().to_vec(),
    })
}

/// Non-zero balances of every named holder in every named asset.
fn balances(scenario: &Scenario, ledger: &Ledger) -> Result<Vec<BalanceLine>> {
    let mut holders: Vec<String> = scenario.accounts.iter().map(|a| a.label.clone()).collect();
    holders.extend(scenario.venues.iter().map(|v| v.label.clone()));
    holders.extend(["contract", "treasury"].map(String::from));

    let mut tokens: Vec<String> = scenario.tokens.iter().map(|t| t.label.clone()).collect();
    tokens.extend(scenario.baskets.iter().map(|b| b.label.clone()));
    tokens.push(NATIVE_LABEL.to_string());

    let mut lines = Vec::new();
    for holder in &holders {
        let holder_addr = scenario.resolve(holder)?;
        for token in &tokens {
            let amount = ledger.balance_of(scenario.resolve(token)?, holder_addr);
            if amount != Decimal::ZERO {
                lines.push(BalanceLine {
                    holder: holder.clone(),
                    token: token.clone(),
                    amount,
                });
            }
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuance_types::{EventKind, SettlementPolicy};

    const SAMPLE: &str = include_str!("../scenarios/issue_and_redeem.json");

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn sample_scenario_meets_every_expectation() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        let report = run(&scenario).unwrap();
        for step in &report.steps {
            assert!(step.matched, "step {} ({}) gave {}", step.index, step.op, step.outcome);
        }

        assert_eq!(report.steps[1].amount, Some(dec(2)));
        assert_eq!(report.steps[2].amount, Some(dec(1)));
        assert_eq!(report.steps[4].amount, Some(dec(8100)));

        assert_eq!(report.balance("alice", "dpi"), dec(1));
        // 100000 - 9000 spent + 8100 redeemed.
        assert_eq!(report.balance("alice", "usdc"), dec(99_100));
        // 50 - 7 spent on the native issue.
        assert_eq!(report.balance("alice", "native"), dec(43));
        assert_eq!(report.balance("contract", "usdc"), Decimal::ZERO);
    }

    #[test]
    fn events_cover_issue_redeem_and_refunds() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        let report = run(&scenario).unwrap();
        let count = |kind: EventKind| report.events.iter().filter(|e| e.event.kind() == kind).count();
        assert_eq!(count(EventKind::SetIssued), 2);
        assert_eq!(count(EventKind::SetRedeemed), 1);
        assert_eq!(count(EventKind::Refund), 2);
        assert_eq!(count(EventKind::TreasuryUpdated), 1);
    }

    #[test]
    fn policy_override_changes_mint() {
        let mut scenario = Scenario::from_json(SAMPLE).unwrap();
        scenario.config.settlement_policy = SettlementPolicy::ReferenceFloor;
        let report = run(&scenario).unwrap();
        // The second redeem pays exactly its floor under this policy.
        assert_eq!(report.steps[4].amount, Some(dec(8000)));
        assert_eq!(report.balance("contract", "usdc"), dec(100));
    }

    #[test]
    fn unmet_expectation_is_reported() {
        let mut scenario = Scenario::from_json(SAMPLE).unwrap();
        scenario.steps[3].expect_revert = None;
        let report = run(&scenario).unwrap();
        assert_eq!(report.mismatches(), 1);
        assert!(!report.all_matched());
    }
}
