//! # issuance-core
//!
//! The exchange issuance contract: issue a basket by paying one asset, or
//! redeem it for one asset, routing caller-built trade legs through
//! untrusted venues inside a single all-or-nothing transaction.
//!
//! - [`ExchangeIssuance`]: the orchestrator and its entry points
//! - [`executor`]: runs trade legs in order with per-leg approvals
//! - [`allowance`]: lazy max-allowance management
//! - [`validator`]: basket preconditions
//! - [`ReentrancyGuard`]: one-entry-at-a-time lock with RAII release
//! - [`Venue`] / [`VenueRegistry`]: the opaque call interface
//! - [`QuoteVenue`]: a fixed-price reference venue
//!
//! ## Safety properties
//!
//! 1. **Atomicity**: every entry point runs in one ledger frame; any error
//!    restores the ledger exactly.
//! 2. **No re-entry**: issue, redeem and sweeps share one guard. A
//!    rejected re-entry fails the outer call even if the venue ignores it.
//! 3. **Delta accounting**: input and output are measured as balance
//!    changes across the trades, so earlier residue is never spent or paid
//!    out.
//! 4. **Caller floor**: the caller never gets less than their stated
//!    minimum.

pub mod allowance;
pub mod exchange;
pub mod executor;
pub mod guard;
pub mod quote_venue;
pub mod treasury;
pub mod validator;
pub mod venue;

pub use exchange::ExchangeIssuance;
pub use executor::ApprovalPlan;
pub use guard::{Entered, ReentrancyGuard};
pub use quote_venue::{Quote, QuoteVenue};
pub use venue::{Venue, VenueCall, VenueRegistry};
