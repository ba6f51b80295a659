//! Decimal money amounts.
//!
//! Prices are stored as `NUMERIC(12,2)` and handled as [`Decimal`] end to end;
//! floats never touch an amount. The shop sells in Georgian lari only, but the
//! currency travels with the amount so the payment gateway payload and the
//! emails do not hard-code it.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    /// Georgian lari.
    #[default]
    Gel,
    Usd,
    Eur,
}

impl CurrencyCode {
    /// Three-letter code as sent to the gateway.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Gel => "GEL",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    /// Symbol used in customer-facing text.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gel => "₾",
            Self::Usd => "$",
            Self::Eur => "€",
        }
    }
}

/// An amount in a currency's major unit (lari, not tetri).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// An amount in lari.
    #[must_use]
    pub const fn gel(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::Gel)
    }

    /// Amount rounded half-away-from-zero to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.rounded())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_two_places() {
        let price = Money::gel(Decimal::new(1_249_995, 3)); // 1249.995
        assert_eq!(price.to_string(), "₾1250.00");
    }

    #[test]
    fn test_code_matches_serialized_form() {
        for currency in [CurrencyCode::Gel, CurrencyCode::Usd, CurrencyCode::Eur] {
            let json = serde_json::to_string(&currency).unwrap();
            assert_eq!(json, format!("\"{}\"", currency.code()));
        }
    }
}
