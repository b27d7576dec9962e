//! # issuance-types
//!
//! Shared types, errors, and configuration for the **exchange issuance**
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`TxId`]
//! - **Call context**: [`Call`] (sender + attached native value)
//! - **Basket model**: [`Component`]
//! - **Trade model**: [`TradeInstruction`], [`IssueRequest`], [`RedeemRequest`]
//! - **Settlement lifecycle**: [`SettlementPhase`]
//! - **Event model**: [`ContractEvent`], [`EventRecord`], [`EventKind`]
//! - **Configuration**: [`EngineConfig`], [`SettlementPolicy`]
//! - **Errors**: [`IssuanceError`] with `EI_ERR_` prefix codes
//! - **Checked arithmetic**: [`amount`] (balance deltas that never wrap)
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod basket;
pub mod call;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod instruction;
pub mod phase;
pub mod request;

// Re-export all primary types at crate root for ergonomic imports:
//   use issuance_types::{Address, TradeInstruction, IssuanceError, ...};

pub use basket::*;
pub use call::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use instruction::*;
pub use phase::*;
pub use request::*;

// Constants and amount helpers are accessed via their modules
// (`issuance_types::constants::FOO`, `issuance_types::amount::delta`).
