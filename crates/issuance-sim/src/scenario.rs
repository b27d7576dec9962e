//! Scenario files.
//!
//! A scenario describes a whole world (tokens, baskets, venues, funded
//! accounts) and a list of steps to run against one contract. Everything
//! is named by label; [`Scenario::resolve`] turns labels into addresses.
//!
//! ```json
//! {
//!   "tokens":  [{ "label": "usdc", "symbol": "USDC" }],
//!   "baskets": [{ "label": "dpi", "symbol": "DPI",
//!                 "components": [{ "token": "weth", "unit": "2" }] }],
//!   "venues":  [{ "label": "desk", "inventory": [{ "token": "weth", "amount": "100" }] }],
//!   "accounts":[{ "label": "alice", "balances": [...], "approve": ["usdc", "dpi"] }],
//!   "steps":   [{ "op": "issue", "caller": "alice", ... , "expect_revert": null }]
//! }
//! ```

use std::path::Path;

use issuance_types::{Address, EngineConfig, IssuanceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label of the native currency.
pub const NATIVE_LABEL: &str = "native";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    #[serde(default)]
    pub baskets: Vec<BasketSpec>,
    #[serde(default)]
    pub venues: Vec<VenueSpec>,
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSpec {
    pub label: String,
    pub symbol: String,
    /// Token refuses `approve` calls.
    #[serde(default)]
    pub rejects_approvals: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub token: String,
    pub unit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPositionSpec {
    pub component: String,
    pub module: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketSpec {
    pub label: String,
    pub symbol: String,
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub external_positions: Vec<ExternalPositionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub token: String,
    pub amount: Decimal,
}

/// A quote venue and its starting inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueSpec {
    pub label: String,
    #[serde(default)]
    pub inventory: Vec<Holding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSpec {
    pub label: String,
    #[serde(default)]
    pub balances: Vec<Holding>,
    /// Tokens this account approves the contract to pull without limit.
    #[serde(default)]
    pub approve: Vec<String>,
}

/// One fixed-price fill at a quote venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegSpec {
    pub venue: String,
    pub sell: String,
    pub sell_amount: Decimal,
    pub buy: String,
    pub buy_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    ApproveSet {
        basket: String,
    },
    Issue {
        caller: String,
        #[serde(default)]
        value: Decimal,
        basket: String,
        input: String,
        input_amount: Decimal,
        min_basket_out: Decimal,
        legs: Vec<LegSpec>,
    },
    Redeem {
        caller: String,
        #[serde(default)]
        value: Decimal,
        basket: String,
        output: String,
        basket_amount: Decimal,
        min_output_out: Decimal,
        legs: Vec<LegSpec>,
    },
    Sweep {
        caller: String,
        asset: String,
    },
    UpdateTreasury {
        caller: String,
        treasury: String,
    },
}

impl Step {
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::ApproveSet { .. } => "approve_set",
            Self::Issue { .. } => "issue",
            Self::Redeem { .. } => "redeem",
            Self::Sweep { .. } => "sweep",
            Self::UpdateTreasury { .. } => "update_treasury",
        }
    }
}

/// A step plus what it is expected to do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(flatten)]
    pub step: Step,
    /// Revert reason the step must fail with (`INSUFFICIENT_OUTPUT_AMOUNT`,
    /// ...). `None` means it must succeed.
    #[serde(default)]
    pub expect_revert: Option<String>,
}

impl Scenario {
    /// Read and parse a scenario file.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `Serialization` if it is not a
    /// valid scenario.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// # Errors
    /// `Serialization` if `text` is not a valid scenario.
    pub fn from_json(text: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(text)?;
        if scenario.steps.is_empty() {
            return Err(IssuanceError::Configuration(format!(
                "scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    /// Address for a label.
    ///
    /// `native` and the contract's role names (`contract`, `owner`,
    /// `treasury`, `issuance_module`) resolve to their configured
    /// addresses; a `0x` string is parsed as-is; anything else is derived
    /// from the label.
    ///
    /// # Errors
    /// `Configuration` for a malformed `0x` address.
    pub fn resolve(&self, label: &str) -> Result<Address> {
        Ok(match label {
            NATIVE_LABEL => Address::NATIVE,
            "contract" => self.config.contract,
            "owner" => self.config.owner,
            "treasury" => self.config.treasury,
            "issuance_module" => self.config.issuance_module,
            hex if hex.starts_with("0x") => hex.parse()?,
            other => Address::labeled(other),
        })
    }
}
