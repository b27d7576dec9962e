//! Reentrancy guard.
//!
//! One flag per contract instance. Every trade-and-settle entry point and
//! both sweeps enter the guard first; a second entry while the first is
//! still running fails with `REENTRANT_CALL`. The flag is released when
//! the returned [`Entered`] token drops, so it is cleared on success, on
//! error, and on unwind alike.
//!
//! A rejected entry also trips the guard for the running call. A venue
//! that catches its own `REENTRANT_CALL` and carries on still fails the
//! outer call once it checks [`Entered::require_untripped`].

use std::cell::Cell;

use issuance_types::{IssuanceError, Result};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
    /// A re-entry was rejected during the current guarded call.
    tripped: Cell<bool>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the guarded region as entered.
    ///
    /// # Errors
    /// Returns [`IssuanceError::ReentrantCall`] if it is already entered,
    /// and trips the guard for the call holding it.
    pub fn enter(&self) -> Result<Entered<'_>> {
        if self.entered.replace(true) {
            self.tripped.set(true);
            tracing::warn!("Re-entrant call rejected");
            return Err(IssuanceError::ReentrantCall);
        }
        self.tripped.set(false);
        Ok(Entered { guard: self })
    }

    /// Whether a guarded call is currently running.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}

/// Proof of entry. Releases the guard on drop.
#[derive(Debug)]
#[must_use = "the guard is released as soon as this token is dropped"]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Entered<'_> {
    /// Fail if any re-entry was attempted while this token was held.
    ///
    /// # Errors
    /// Returns [`IssuanceError::ReentrantCall`] if the guard was tripped.
    pub fn require_untripped(&self) -> Result<()> {
        if self.guard.tripped.get() {
            return Err(IssuanceError::ReentrantCall);
        }
        Ok(())
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
        self.guard.tripped.set(false);
    }
}
