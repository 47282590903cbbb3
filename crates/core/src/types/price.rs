//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rand, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the default currency.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(Decimal::ZERO, CurrencyCode::ZAR)
    }

    /// Format for display with two decimal places (e.g., "R140.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// South African rand, the store currency.
    #[default]
    ZAR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::ZAR => "R",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_display_rand() {
        let price = Price::new(dec!(140), CurrencyCode::ZAR);
        assert_eq!(price.display(), "R140.00");
    }

    #[test]
    fn test_price_display_pads_to_cents() {
        let price = Price::new(dec!(19.5), CurrencyCode::USD);
        assert_eq!(price.display(), "$19.50");
    }
}
