//! Reference venue that fills fixed-price quotes from its own inventory.
//!
//! The payload is a JSON [`Quote`]. The venue pulls `sell_amount` of the
//! sell asset from the caller through the caller's allowance (or takes it
//! out of the forwarded native value) and pushes `buy_amount` of the buy
//! asset back. Forwarded native value beyond what the quote consumes is
//! returned as change.

use issuance_types::{Address, IssuanceError, Result, TradeInstruction, amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::venue::{Venue, VenueCall};

/// One fixed-price fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub sell_asset: Address,
    pub buy_asset: Address,
    pub sell_amount: Decimal,
    pub buy_amount: Decimal,
}

impl Quote {
    #[must_use]
    pub fn new(sell_asset: Address, sell_amount: Decimal, buy_asset: Address, buy_amount: Decimal) -> Self {
        Self {
            sell_asset,
            buy_asset,
            sell_amount,
            buy_amount,
        }
    }

    /// JSON payload for a [`QuoteVenue`].
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// # Errors
    /// Returns `InvalidPayload` naming `venue` if `payload` is not a quote.
    pub fn decode(venue: Address, payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| IssuanceError::InvalidPayload {
            venue,
            reason: e.to_string(),
        })
    }

    /// Issuance leg: acquires `buy_asset`.
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn acquire_leg(&self, venue: Address) -> Result<TradeInstruction> {
        self.leg(venue, self.buy_asset)
    }

    /// Redemption leg: disposes of `sell_asset`.
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn dispose_leg(&self, venue: Address) -> Result<TradeInstruction> {
        self.leg(venue, self.sell_asset)
    }

    fn leg(&self, venue: Address, asset: Address) -> Result<TradeInstruction> {
        let leg = TradeInstruction::new(venue, asset, self.encode()?);
        if self.sell_asset.is_native() {
            Ok(leg.with_value(self.sell_amount))
        } else {
            Ok(leg)
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuoteVenue {
    name: String,
}

impl QuoteVenue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Venue for QuoteVenue {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &mut VenueCall<'_>, payload: &[u8]) -> Result<()> {
        let quote = Quote::decode(ctx.venue, payload)?;
        if quote.sell_asset == quote.buy_asset {
            return Err(IssuanceError::InvalidPayload {
                venue: ctx.venue,
                reason: format!("quote sells and buys the same asset {}", quote.sell_asset),
            });
        }
        amount::require_positive(quote.sell_amount, "sell_amount")?;
        amount::require_positive(quote.buy_amount, "buy_amount")?;

        let change = if quote.sell_asset.is_native() {
            if ctx.value < quote.sell_amount {
                return Err(IssuanceError::InsufficientInputAmount {
                    needed: quote.sell_amount,
                    attached: ctx.value,
                });
            }
            amount::delta(ctx.value, quote.sell_amount)?
        } else {
            ctx.ledger.transfer_from(
                quote.sell_asset,
                ctx.venue,
                ctx.caller,
                ctx.venue,
                quote.sell_amount,
            )?;
            ctx.value
        };
        if change > Decimal::ZERO {
            ctx.ledger
                .transfer(Address::NATIVE, ctx.venue, ctx.caller, change)?;
        }
        ctx.ledger
            .transfer(quote.buy_asset, ctx.venue, ctx.caller, quote.buy_amount)?;

        tracing::debug!(
            venue = %self.name,
            sell = %quote.sell_asset.short(),
            sell_amount = %quote.sell_amount,
            buy = %quote.buy_asset.short(),
            buy_amount = %quote.buy_amount,
            "Quote filled"
        );
        Ok(())
    }
}
