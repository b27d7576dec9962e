//! Arguments of the two trade-and-settle entry points.
//!
//! Both requests are plain data so an off-chain quote service can ship them
//! as JSON alongside the instructions it built.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, TradeInstruction};

/// Mint a basket by paying a single input asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub basket: Address,
    /// Asset paid in; `Address::NATIVE` for native currency.
    pub input_asset: Address,
    pub input_amount: Decimal,
    /// Fewest basket units the caller accepts.
    pub min_basket_out: Decimal,
    /// One leg per basket component.
    pub instructions: Vec<TradeInstruction>,
}

/// Burn a basket and receive a single output asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub basket: Address,
    /// Asset paid out; `Address::NATIVE` for native currency.
    pub output_asset: Address,
    pub basket_amount: Decimal,
    /// Least output the caller accepts.
    pub min_output_out: Decimal,
    /// One leg per basket component.
    pub instructions: Vec<TradeInstruction>,
}
