//! # issuance-ledger
//!
//! **Host ledger** for the exchange issuance engine: the deterministic
//! global state every contract call reads and writes.
//!
//! ## Architecture
//!
//! 1. **TokenBook**: balances, allowances, and supply per asset (native
//!    currency included under `Address::NATIVE`)
//! 2. **BasketRegistry**: basket definitions, the registry of valid
//!    baskets, and externally-managed position attachments
//! 3. **Ledger**: ties both together with the basket issuance module
//!    (`issue_basket` / `redeem_basket`), the event log, and nestable
//!    all-or-nothing frames
//!
//! ## Frame Flow
//!
//! ```text
//! entry point → Ledger.atomic() → token / basket mutations → emit()
//!             → Ok: committed | Err: snapshot restored, events dropped
//! ```

pub mod basket;
pub mod ledger;
pub mod token_book;

pub use basket::{BasketDefinition, BasketRegistry};
pub use ledger::Ledger;
pub use token_book::{TokenBook, TokenInfo};
