//! Venue call interface.
//!
//! A venue is an opaque call target. The trade executor hands it a payload
//! it never inspects, the native value forwarded with the leg, and mutable
//! access to the ledger. Venues are untrusted: they see the calling
//! contract too, so one may try to call straight back into it. The
//! contract's reentrancy guard is what stops that, not the venue.

use std::collections::HashMap;
use std::fmt;

use issuance_ledger::Ledger;
use issuance_types::{Address, IssuanceError, Result};
use rust_decimal::Decimal;

use crate::exchange::ExchangeIssuance;

/// Context of one venue invocation.
pub struct VenueCall<'a> {
    pub ledger: &'a mut Ledger,
    /// The contract making the call. A hostile venue can re-enter it.
    pub issuance: &'a ExchangeIssuance,
    /// The venue's own address.
    pub venue: Address,
    /// Account the venue is acting for (the contract).
    pub caller: Address,
    /// Native value already moved from `caller` to `venue`.
    pub value: Decimal,
}

/// An external swap venue.
pub trait Venue {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Execute one leg.
    ///
    /// # Errors
    /// Any error aborts the whole trade-and-settle transaction.
    fn call(&self, ctx: &mut VenueCall<'_>, payload: &[u8]) -> Result<()>;
}

/// Venues reachable from the contract, keyed by address.
#[derive(Default)]
pub struct VenueRegistry {
    venues: HashMap<Address, Box<dyn Venue>>,
}

impl VenueRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `venue` callable at `address`.
    ///
    /// # Errors
    /// Returns `Configuration` for a zero, native or already-taken address.
    pub fn register(&mut self, address: Address, venue: impl Venue + 'static) -> Result<()> {
        if address.is_zero() || address.is_native() {
            return Err(IssuanceError::Configuration(format!(
                "venue {} cannot live at {address}",
                venue.name()
            )));
        }
        if self.venues.contains_key(&address) {
            return Err(IssuanceError::Configuration(format!(
                "venue address {address} already registered"
            )));
        }
        tracing::debug!(venue = venue.name(), address = %address, "Venue registered");
        self.venues.insert(address, Box::new(venue));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, address: Address) -> Option<&dyn Venue> {
        self.venues.get(&address).map(Box::as_ref)
    }

    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.venues.contains_key(&address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.venues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

impl fmt::Debug for VenueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.venues.iter().map(|(addr, v)| (addr.short(), v.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Venue for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn call(&self, _ctx: &mut VenueCall<'_>, _payload: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = VenueRegistry::new();
        let addr = Address::labeled("router");
        reg.register(addr, Noop).unwrap();
        assert!(reg.contains(addr));
        assert_eq!(reg.get(addr).map(|v| v.name()), Some("noop"));
        assert!(reg.get(Address::labeled("other")).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_and_reserved_addresses_rejected() {
        let mut reg = VenueRegistry::new();
        let addr = Address::labeled("router");
        reg.register(addr, Noop).unwrap();
        assert!(reg.register(addr, Noop).is_err());
        assert!(reg.register(Address::ZERO, Noop).is_err());
        assert!(reg.register(Address::NATIVE, Noop).is_err());
        assert!(!reg.is_empty());
    }
}
