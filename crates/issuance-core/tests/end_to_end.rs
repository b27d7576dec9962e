//! End-to-end issuance and redemption through the reference venue.
//!
//! Each test deploys a fresh contract over a ledger holding one basket
//! (A:10, B:5 per unit), a quote desk with deep inventory, and a funded
//! caller, then drives the public entry points only.

use issuance_core::{ExchangeIssuance, Quote, QuoteVenue, VenueRegistry};
use issuance_ledger::Ledger;
use issuance_types::*;
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

struct Market {
    ledger: Ledger,
    issuance: ExchangeIssuance,
    usdc: Address,
    a: Address,
    b: Address,
    basket: Address,
    desk: Address,
    alice: Address,
    contract: Address,
}

impl Market {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let mut ledger = Ledger::new();
        let usdc = Address::labeled("usdc");
        let a = Address::labeled("token-a");
        let b = Address::labeled("token-b");
        let basket = Address::labeled("basket");
        let desk = Address::labeled("desk");
        let alice = Address::labeled("alice");

        for (asset, symbol) in [(usdc, "USDC"), (a, "A"), (b, "B")] {
            ledger.register_token(asset, symbol).unwrap();
            ledger.mint(asset, desk, dec(1_000_000)).unwrap();
        }
        ledger.mint(Address::NATIVE, desk, dec(1_000_000)).unwrap();
        ledger
            .create_basket(basket, "BSK", vec![
                Component::new(a, dec(10)),
                Component::new(b, dec(5)),
            ])
            .unwrap();
        ledger.mint(usdc, alice, dec(10_000)).unwrap();
        ledger.mint(Address::NATIVE, alice, dec(100)).unwrap();

        let mut venues = VenueRegistry::new();
        venues.register(desk, QuoteVenue::new("desk")).unwrap();
        let issuance = ExchangeIssuance::with_venues(config, &ledger, venues).unwrap();
        let contract = issuance.config().contract;
        ledger
            .approve(usdc, alice, contract, constants::MAX_ALLOWANCE)
            .unwrap();
        ledger
            .approve(basket, alice, contract, constants::MAX_ALLOWANCE)
            .unwrap();

        Self {
            ledger,
            issuance,
            usdc,
            a,
            b,
            basket,
            desk,
            alice,
            contract,
        }
    }

    fn buy(&self, sell: Address, sell_amount: i64, buy: Address, buy_amount: i64) -> TradeInstruction {
        Quote::new(sell, dec(sell_amount), buy, dec(buy_amount))
            .acquire_leg(self.desk)
            .unwrap()
    }

    fn sell(&self, sell: Address, sell_amount: i64, buy: Address, buy_amount: i64) -> TradeInstruction {
        Quote::new(sell, dec(sell_amount), buy, dec(buy_amount))
            .dispose_leg(self.desk)
            .unwrap()
    }

    fn issue(&mut self, call: Call, request: &IssueRequest) -> Result<Decimal> {
        self.issuance
            .issue_set_for_exact_token(&mut self.ledger, call, request)
    }

    fn redeem(&mut self, call: Call, request: &RedeemRequest) -> Result<Decimal> {
        self.issuance
            .redeem_exact_set_for_token(&mut self.ledger, call, request)
    }

    /// Issue `units` baskets for alice paying USDC at 6/A and 6/B.
    fn issue_with_usdc(&mut self, units: i64) -> Decimal {
        let request = IssueRequest {
            basket: self.basket,
            input_asset: self.usdc,
            input_amount: dec(90 * units),
            min_basket_out: dec(units),
            instructions: vec![
                self.buy(self.usdc, 60 * units, self.a, 10 * units),
                self.buy(self.usdc, 30 * units, self.b, 5 * units),
            ],
        };
        self.issue(Call::from(self.alice), &request).unwrap()
    }

    fn assert_supply_conserved(&self) {
        for asset in [self.usdc, self.a, self.b, self.basket, Address::NATIVE] {
            self.ledger.tokens().verify_supply(asset).unwrap();
        }
    }
}

// =============================================================================
// Issue
// =============================================================================

#[test]
fn issue_one_unit_with_exact_components() {
    let mut m = Market::new();
    let request = IssueRequest {
        basket: m.basket,
        input_asset: m.usdc,
        input_amount: dec(90),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(m.usdc, 60, m.a, 10),
            m.buy(m.usdc, 30, m.b, 5),
        ],
    };

    let minted = m.issue(Call::from(m.alice), &request).unwrap();

    assert_eq!(minted, dec(1));
    assert_eq!(m.ledger.balance_of(m.basket, m.alice), dec(1));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), dec(9_910));
    // Nothing left behind in the contract.
    assert_eq!(m.ledger.balance_of(m.a, m.contract), Decimal::ZERO);
    assert_eq!(m.ledger.balance_of(m.b, m.contract), Decimal::ZERO);
    assert_eq!(m.ledger.balance_of(m.usdc, m.contract), Decimal::ZERO);
    // The basket holds its backing.
    assert_eq!(m.ledger.balance_of(m.a, m.basket), dec(10));
    assert_eq!(m.ledger.balance_of(m.b, m.basket), dec(5));

    let issued: Vec<_> = m.ledger.events_of(EventKind::SetIssued).collect();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].emitter, m.contract);
    match &issued[0].event {
        ContractEvent::SetIssued {
            recipient,
            basket,
            input_asset,
            input_amount,
            basket_amount_out,
        } => {
            assert_eq!(*recipient, m.alice);
            assert_eq!(*basket, m.basket);
            assert_eq!(*input_asset, m.usdc);
            assert_eq!(*input_amount, dec(90));
            assert_eq!(*basket_amount_out, dec(1));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(m.ledger.events_of(EventKind::Refund).count(), 0);
    m.assert_supply_conserved();
}

#[test]
fn oversized_input_mints_one_unit_and_refunds_the_rest() {
    let mut m = Market::new();
    let request = IssueRequest {
        basket: m.basket,
        input_asset: m.usdc,
        input_amount: dec(1_000),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(m.usdc, 60, m.a, 10),
            m.buy(m.usdc, 30, m.b, 5),
        ],
    };

    let minted = m.issue(Call::from(m.alice), &request).unwrap();

    assert_eq!(minted, dec(1));
    assert_eq!(m.ledger.balance_of(m.basket, m.alice), dec(1));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), dec(9_910));
    assert_eq!(m.ledger.balance_of(m.usdc, m.contract), Decimal::ZERO);

    let issued: Vec<_> = m.ledger.events_of(EventKind::SetIssued).collect();
    assert_eq!(issued.len(), 1);
    assert!(matches!(
        &issued[0].event,
        ContractEvent::SetIssued { basket_amount_out, input_amount, .. }
            if *basket_amount_out == dec(1) && *input_amount == dec(1_000)
    ));
    let refunds: Vec<_> = m.ledger.events_of(EventKind::Refund).collect();
    assert_eq!(refunds.len(), 1);
    assert!(matches!(
        &refunds[0].event,
        ContractEvent::Refund { recipient, amount } if *recipient == m.alice && *amount == dec(910)
    ));
    m.assert_supply_conserved();
}

#[test]
fn issue_with_native_refunds_excess_value() {
    let mut m = Market::new();
    let request = IssueRequest {
        basket: m.basket,
        input_asset: Address::NATIVE,
        input_amount: dec(3),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(Address::NATIVE, 2, m.a, 10),
            m.buy(Address::NATIVE, 1, m.b, 5),
        ],
    };

    let minted = m
        .issue(Call::from(m.alice).with_value(dec(5)), &request)
        .unwrap();

    assert_eq!(minted, dec(1));
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.alice), dec(97));
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.contract), Decimal::ZERO);
    let refunds: Vec<_> = m.ledger.events_of(EventKind::Refund).collect();
    assert_eq!(refunds.len(), 1);
    assert!(matches!(
        refunds[0].event,
        ContractEvent::Refund { amount, .. } if amount == dec(2)
    ));
    m.assert_supply_conserved();
}

#[test]
fn native_value_below_input_is_rejected() {
    let mut m = Market::new();
    let request = IssueRequest {
        basket: m.basket,
        input_asset: Address::NATIVE,
        input_amount: dec(3),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(Address::NATIVE, 2, m.a, 10),
            m.buy(Address::NATIVE, 1, m.b, 5),
        ],
    };
    let err = m
        .issue(Call::from(m.alice).with_value(dec(2)), &request)
        .unwrap_err();
    assert!(matches!(err, IssuanceError::InsufficientInputAmount { .. }));
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.alice), dec(100));
}

#[test]
fn unspent_native_input_stays_when_refunds_are_off() {
    let mut m = Market::with_config(EngineConfig {
        refund_unspent_input: false,
        ..EngineConfig::default()
    });
    // Input 4 with 5 attached, but the legs only spend 3.
    let request = IssueRequest {
        basket: m.basket,
        input_asset: Address::NATIVE,
        input_amount: dec(4),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(Address::NATIVE, 2, m.a, 10),
            m.buy(Address::NATIVE, 1, m.b, 5),
        ],
    };
    m.issue(Call::from(m.alice).with_value(dec(5)), &request)
        .unwrap();
    // The attached excess (1) is always returned; unspent input (1) is not.
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.alice), dec(96));
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.contract), dec(1));
}

#[test]
fn stray_value_with_token_input_is_returned() {
    let mut m = Market::new();
    let request = IssueRequest {
        basket: m.basket,
        input_asset: m.usdc,
        input_amount: dec(90),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(m.usdc, 60, m.a, 10),
            m.buy(m.usdc, 30, m.b, 5),
        ],
    };
    m.issue(Call::from(m.alice).with_value(dec(1)), &request)
        .unwrap();
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.alice), dec(100));
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.contract), Decimal::ZERO);
}

#[test]
fn short_trades_fail_the_floor_and_change_nothing() {
    let mut m = Market::new();
    // B leg only delivers 4 of the 5 needed.
    let request = IssueRequest {
        basket: m.basket,
        input_asset: m.usdc,
        input_amount: dec(90),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(m.usdc, 60, m.a, 10),
            m.buy(m.usdc, 30, m.b, 4),
        ],
    };
    let err = m.issue(Call::from(m.alice), &request).unwrap_err();
    assert!(matches!(
        err,
        IssuanceError::InsufficientOutputAmount { realized, .. } if realized == Decimal::new(8, 1)
    ));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), dec(10_000));
    assert_eq!(m.ledger.balance_of(m.usdc, m.desk), dec(1_000_000));
    assert!(m.ledger.events().is_empty());
}

#[test]
fn minted_amount_tracks_the_scarcest_component() {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let mut m = Market::new();
        let a_out: i64 = rng.gen_range(10..=40);
        let b_out: i64 = rng.gen_range(5..=20);
        let request = IssueRequest {
            basket: m.basket,
            input_asset: m.usdc,
            input_amount: dec(90),
            min_basket_out: dec(1),
            instructions: vec![
                m.buy(m.usdc, 60, m.a, a_out),
                m.buy(m.usdc, 30, m.b, b_out),
            ],
        };
        let minted = m.issue(Call::from(m.alice), &request).unwrap();

        let expected = (dec(a_out) / dec(10)).min(dec(b_out) / dec(5));
        assert_eq!(minted, expected, "a_out={a_out} b_out={b_out}");
        // Whatever the scarcer leg did not need stays behind as residue.
        assert_eq!(m.ledger.balance_of(m.a, m.contract), dec(a_out) - dec(10) * minted);
        assert_eq!(m.ledger.balance_of(m.b, m.contract), dec(b_out) - dec(5) * minted);
        m.assert_supply_conserved();
    }
}

// =============================================================================
// Redeem
// =============================================================================

#[test]
fn redemption_below_minimum_reverts_and_keeps_baskets() {
    let mut m = Market::new();
    m.issue_with_usdc(2);
    let usdc_before = m.ledger.balance_of(m.usdc, m.alice);
    let events_before = m.ledger.events().len();

    // Minimum 200, trades realize 180 (90%).
    let request = RedeemRequest {
        basket: m.basket,
        output_asset: m.usdc,
        basket_amount: dec(2),
        min_output_out: dec(200),
        instructions: vec![
            m.sell(m.a, 20, m.usdc, 120),
            m.sell(m.b, 10, m.usdc, 60),
        ],
    };
    let err = m.redeem(Call::from(m.alice), &request).unwrap_err();

    assert!(matches!(
        err,
        IssuanceError::InsufficientOutputAmount { needed, realized }
            if needed == dec(200) && realized == dec(180)
    ));
    assert_eq!(err.reason(), "INSUFFICIENT_OUTPUT_AMOUNT");
    assert_eq!(m.ledger.balance_of(m.basket, m.alice), dec(2));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), usdc_before);
    assert_eq!(m.ledger.balance_of(m.a, m.basket), dec(20));
    assert_eq!(m.ledger.tokens().total_supply(m.basket), dec(2));
    assert_eq!(m.ledger.events().len(), events_before);
}

#[test]
fn redemption_pays_out_and_burns() {
    let mut m = Market::new();
    m.issue_with_usdc(2);
    let usdc_before = m.ledger.balance_of(m.usdc, m.alice);

    let request = RedeemRequest {
        basket: m.basket,
        output_asset: m.usdc,
        basket_amount: dec(2),
        min_output_out: dec(170),
        instructions: vec![
            m.sell(m.a, 20, m.usdc, 120),
            m.sell(m.b, 10, m.usdc, 60),
        ],
    };
    let paid = m.redeem(Call::from(m.alice), &request).unwrap();

    assert_eq!(paid, dec(180));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), usdc_before + dec(180));
    assert_eq!(m.ledger.balance_of(m.basket, m.alice), Decimal::ZERO);
    assert_eq!(m.ledger.tokens().total_supply(m.basket), Decimal::ZERO);
    assert_eq!(m.ledger.balance_of(m.a, m.contract), Decimal::ZERO);
    assert_eq!(m.ledger.events_of(EventKind::SetRedeemed).count(), 1);
    m.assert_supply_conserved();
}

#[test]
fn existing_residue_is_not_paid_to_the_redeemer() {
    let mut m = Market::new();
    m.issue_with_usdc(1);
    m.ledger.mint(m.usdc, m.contract, dec(500)).unwrap();
    let usdc_before = m.ledger.balance_of(m.usdc, m.alice);

    let request = RedeemRequest {
        basket: m.basket,
        output_asset: m.usdc,
        basket_amount: dec(1),
        min_output_out: dec(80),
        instructions: vec![
            m.sell(m.a, 10, m.usdc, 55),
            m.sell(m.b, 5, m.usdc, 28),
        ],
    };
    let paid = m.redeem(Call::from(m.alice), &request).unwrap();

    assert_eq!(paid, dec(83));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), usdc_before + dec(83));
    assert_eq!(m.ledger.balance_of(m.usdc, m.contract), dec(500));
}

#[test]
fn native_output_nets_out_attached_value() {
    let mut m = Market::new();
    m.issue_with_usdc(1);
    m.ledger.mint(Address::NATIVE, m.contract, dec(7)).unwrap();

    let request = RedeemRequest {
        basket: m.basket,
        output_asset: Address::NATIVE,
        basket_amount: dec(1),
        min_output_out: dec(2),
        instructions: vec![
            m.sell(m.a, 10, Address::NATIVE, 2),
            m.sell(m.b, 5, Address::NATIVE, 1),
        ],
    };
    m.redeem(Call::from(m.alice).with_value(dec(4)), &request)
        .unwrap();

    // Alice gets her 4 back plus the 3 realized; the residue of 7 stays.
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.alice), dec(103));
    assert_eq!(m.ledger.balance_of(Address::NATIVE, m.contract), dec(7));
    m.assert_supply_conserved();
}

#[test]
fn reference_floor_pays_minimum_and_treasury_sweeps_surplus() {
    let mut m = Market::with_config(EngineConfig {
        settlement_policy: SettlementPolicy::ReferenceFloor,
        ..EngineConfig::default()
    });
    m.issue_with_usdc(1);
    let usdc_before = m.ledger.balance_of(m.usdc, m.alice);

    let request = RedeemRequest {
        basket: m.basket,
        output_asset: m.usdc,
        basket_amount: dec(1),
        min_output_out: dec(80),
        instructions: vec![
            m.sell(m.a, 10, m.usdc, 55),
            m.sell(m.b, 5, m.usdc, 28),
        ],
    };
    let paid = m.redeem(Call::from(m.alice), &request).unwrap();
    assert_eq!(paid, dec(80));
    assert_eq!(m.ledger.balance_of(m.usdc, m.alice), usdc_before + dec(80));
    assert_eq!(m.ledger.balance_of(m.usdc, m.contract), dec(3));

    let treasury = m.issuance.treasury();
    let swept = m
        .issuance
        .withdraw_excess_token(&mut m.ledger, treasury, m.usdc)
        .unwrap();
    assert_eq!(swept, dec(3));
    assert_eq!(m.ledger.balance_of(m.usdc, treasury), dec(3));
}

#[test]
fn requests_round_trip_through_json() {
    let m = Market::new();
    let request = IssueRequest {
        basket: m.basket,
        input_asset: m.usdc,
        input_amount: dec(90),
        min_basket_out: dec(1),
        instructions: vec![
            m.buy(m.usdc, 60, m.a, 10),
            m.buy(m.usdc, 30, m.b, 5),
        ],
    };
    let json = serde_json::to_string(&request).unwrap();
    let back: IssueRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);

    let mut m = m;
    assert_eq!(m.issue(Call::from(m.alice), &back).unwrap(), dec(1));
}
