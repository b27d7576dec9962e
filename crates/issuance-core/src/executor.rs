//! Trade executor.
//!
//! Runs caller-supplied legs strictly in order. Each leg:
//!
//! ```text
//!   resolve approval ── ensure_approval ── forward value ── venue.call
//!        (plan)          (allowance.rs)      (native)       (own frame)
//! ```
//!
//! Payloads are never interpreted here. The first failing leg aborts the
//! whole batch; there is no skip-and-continue.

use std::collections::HashMap;

use issuance_ledger::Ledger;
use issuance_types::{Address, IssuanceError, Result, TradeInstruction};
use rust_decimal::Decimal;

use crate::allowance;
use crate::exchange::ExchangeIssuance;
use crate::venue::VenueCall;

/// What each venue is allowed to pull from the contract.
#[derive(Debug, Clone, Copy)]
pub enum ApprovalPlan<'a> {
    /// Issuance: every venue may spend the single input asset.
    SpendInput { asset: Address, amount: Decimal },
    /// Redemption: each venue may spend its leg's component, up to the
    /// quantity the redemption released for it.
    SpendLegAsset {
        released: &'a HashMap<Address, Decimal>,
    },
}

impl ApprovalPlan<'_> {
    fn resolve(&self, index: usize, leg: &TradeInstruction) -> Result<(Address, Decimal)> {
        match self {
            Self::SpendInput { asset, amount } => Ok((*asset, *amount)),
            Self::SpendLegAsset { released } => released
                .get(&leg.asset)
                .map(|amount| (leg.asset, *amount))
                .ok_or_else(|| IssuanceError::InvalidInputs {
                    reason: format!(
                        "leg {index} disposes of {}, which the redemption did not release",
                        leg.asset
                    ),
                }),
        }
    }
}

/// Execute `instructions` on behalf of `issuance`'s contract account.
///
/// # Errors
/// - `UnknownVenue` if a leg targets an address with no venue
/// - approval and native-forwarding errors unchanged
/// - `VenueReverted` wrapping whatever the venue returned
pub fn execute(
    ledger: &mut Ledger,
    issuance: &ExchangeIssuance,
    instructions: &[TradeInstruction],
    plan: &ApprovalPlan<'_>,
) -> Result<()> {
    let contract = issuance.config().contract;
    for (index, leg) in instructions.iter().enumerate() {
        let venue = issuance
            .venues()
            .get(leg.target)
            .ok_or(IssuanceError::UnknownVenue(leg.target))?;

        let (asset, amount) = plan.resolve(index, leg)?;
        allowance::ensure_approval(ledger, contract, asset, leg.target, amount)?;

        if leg.value > Decimal::ZERO {
            ledger.transfer(Address::NATIVE, contract, leg.target, leg.value)?;
        }

        tracing::debug!(leg = index, venue = venue.name(), %leg, "Executing trade leg");
        ledger
            .atomic(|ledger| {
                let mut ctx = VenueCall {
                    ledger,
                    issuance,
                    venue: leg.target,
                    caller: contract,
                    value: leg.value,
                };
                venue.call(&mut ctx, &leg.payload)
            })
            .map_err(|source| {
                tracing::warn!(
                    leg = index,
                    venue = venue.name(),
                    reason = source.reason(),
                    "Trade leg reverted"
                );
                IssuanceError::VenueReverted {
                    venue: leg.target,
                    source: Box::new(source),
                }
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::venue::{Venue, VenueRegistry};
    use issuance_types::{EngineConfig, constants};

    /// Records the order legs arrive in and what the contract had approved.
    struct Recorder {
        log: Rc<RefCell<Vec<(String, Decimal)>>>,
        label: &'static str,
        watch: Address,
    }

    impl Venue for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn call(&self, ctx: &mut VenueCall<'_>, _payload: &[u8]) -> Result<()> {
            let allowed = ctx.ledger.allowance(self.watch, ctx.caller, ctx.venue);
            self.log.borrow_mut().push((self.label.to_string(), allowed));
            Ok(())
        }
    }

    struct Failing;

    impl Venue for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn call(&self, ctx: &mut VenueCall<'_>, _payload: &[u8]) -> Result<()> {
            ctx.ledger
                .mint(Address::labeled("a"), ctx.venue, Decimal::ONE)?;
            Err(IssuanceError::Internal("slippage".into()))
        }
    }

    fn setup(venues: VenueRegistry) -> (Ledger, ExchangeIssuance) {
        let mut ledger = Ledger::new();
        ledger.register_token(Address::labeled("a"), "A").unwrap();
        ledger.register_token(Address::labeled("b"), "B").unwrap();
        let issuance =
            ExchangeIssuance::with_venues(EngineConfig::default(), &ledger, venues).unwrap();
        (ledger, issuance)
    }

    #[test]
    fn legs_run_in_order_with_input_approved() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let input = Address::labeled("a");
        let mut venues = VenueRegistry::new();
        for label in ["first", "second"] {
            venues
                .register(Address::labeled(label), Recorder {
                    log: Rc::clone(&log),
                    label,
                    watch: input,
                })
                .unwrap();
        }
        let (mut ledger, issuance) = setup(venues);
        let legs = vec![
            TradeInstruction::new(Address::labeled("first"), Address::labeled("b"), vec![]),
            TradeInstruction::new(Address::labeled("second"), Address::labeled("b"), vec![]),
        ];
        let plan = ApprovalPlan::SpendInput {
            asset: input,
            amount: Decimal::TEN,
        };
        execute(&mut ledger, &issuance, &legs, &plan).unwrap();

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "first");
        assert_eq!(log[1].0, "second");
        assert!(log.iter().all(|(_, a)| *a == constants::MAX_ALLOWANCE));
    }

    #[test]
    fn unknown_target_aborts() {
        let (mut ledger, issuance) = setup(VenueRegistry::new());
        let legs = vec![TradeInstruction::new(
            Address::labeled("nowhere"),
            Address::labeled("b"),
            vec![],
        )];
        let plan = ApprovalPlan::SpendInput {
            asset: Address::labeled("a"),
            amount: Decimal::ONE,
        };
        let err = execute(&mut ledger, &issuance, &legs, &plan).unwrap_err();
        assert!(matches!(err, IssuanceError::UnknownVenue(_)));
    }

    #[test]
    fn venue_error_is_wrapped_and_its_effects_reverted() {
        let mut venues = VenueRegistry::new();
        venues.register(Address::labeled("bad"), Failing).unwrap();
        let (mut ledger, issuance) = setup(venues);
        let legs = vec![TradeInstruction::new(
            Address::labeled("bad"),
            Address::labeled("b"),
            vec![],
        )];
        let plan = ApprovalPlan::SpendInput {
            asset: Address::labeled("a"),
            amount: Decimal::ONE,
        };
        let err = execute(&mut ledger, &issuance, &legs, &plan).unwrap_err();
        assert_eq!(err.reason(), "VENUE_REVERTED");
        assert!(matches!(err.root_cause(), IssuanceError::Internal(_)));
        assert_eq!(
            ledger.balance_of(Address::labeled("a"), Address::labeled("bad")),
            Decimal::ZERO
        );
    }

    #[test]
    fn redemption_plan_approves_released_quantity_per_leg() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let b = Address::labeled("b");
        let mut venues = VenueRegistry::new();
        venues
            .register(Address::labeled("seller"), Recorder {
                log: Rc::clone(&log),
                label: "seller",
                watch: b,
            })
            .unwrap();
        let (mut ledger, issuance) = setup(venues);
        let released = HashMap::from([(b, Decimal::new(5, 0))]);
        let plan = ApprovalPlan::SpendLegAsset {
            released: &released,
        };

        let legs = vec![TradeInstruction::new(Address::labeled("seller"), b, vec![])];
        execute(&mut ledger, &issuance, &legs, &plan).unwrap();
        assert_eq!(log.borrow()[0].1, constants::MAX_ALLOWANCE);

        let stray = vec![TradeInstruction::new(
            Address::labeled("seller"),
            Address::labeled("a"),
            vec![],
        )];
        let err = execute(&mut ledger, &issuance, &stray, &plan).unwrap_err();
        assert_eq!(err.reason(), "INVALID_INPUTS");
    }

    #[test]
    fn native_value_is_forwarded_before_the_call() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut venues = VenueRegistry::new();
        venues
            .register(Address::labeled("router"), Recorder {
                log: Rc::clone(&log),
                label: "router",
                watch: Address::labeled("a"),
            })
            .unwrap();
        let (mut ledger, issuance) = setup(venues);
        let contract = issuance.config().contract;
        ledger.mint(Address::NATIVE, contract, Decimal::TEN).unwrap();
        let legs = vec![
            TradeInstruction::new(Address::labeled("router"), Address::labeled("b"), vec![])
                .with_value(Decimal::new(4, 0)),
        ];
        let plan = ApprovalPlan::SpendInput {
            asset: Address::NATIVE,
            amount: Decimal::TEN,
        };
        execute(&mut ledger, &issuance, &legs, &plan).unwrap();
        assert_eq!(ledger.balance_of(Address::NATIVE, contract), Decimal::new(6, 0));
        assert_eq!(
            ledger.balance_of(Address::NATIVE, Address::labeled("router")),
            Decimal::new(4, 0)
        );
    }
}
