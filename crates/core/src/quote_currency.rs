//! Reference currency used for every valuation in a report.

use serde::{Deserialize, Serialize};

/// Fiat currency prices and values are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QuoteCurrency {
    /// Australian Dollar (Swyftx home market)
    #[default]
    AUD,
    /// US Dollar
    USD,
    /// New Zealand Dollar
    NZD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
}

impl QuoteCurrency {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "AUD" => Some(QuoteCurrency::AUD),
            "USD" => Some(QuoteCurrency::USD),
            "NZD" => Some(QuoteCurrency::NZD),
            "EUR" => Some(QuoteCurrency::EUR),
            "GBP" => Some(QuoteCurrency::GBP),
            _ => None,
        }
    }

    /// Get display name.
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteCurrency::AUD => "AUD",
            QuoteCurrency::USD => "USD",
            QuoteCurrency::NZD => "NZD",
            QuoteCurrency::EUR => "EUR",
            QuoteCurrency::GBP => "GBP",
        }
    }

    /// Code as the public price service expects it (`vs_currencies=aud`).
    pub fn market_code(self) -> &'static str {
        match self {
            QuoteCurrency::AUD => "aud",
            QuoteCurrency::USD => "usd",
            QuoteCurrency::NZD => "nzd",
            QuoteCurrency::EUR => "eur",
            QuoteCurrency::GBP => "gbp",
        }
    }

    /// Currency sign used in rendered amounts.
    pub fn sign(self) -> &'static str {
        match self {
            QuoteCurrency::AUD | QuoteCurrency::USD | QuoteCurrency::NZD => "$",
            QuoteCurrency::EUR => "€",
            QuoteCurrency::GBP => "£",
        }
    }
}

impl std::fmt::Display for QuoteCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(QuoteCurrency::from_str("AUD"), Some(QuoteCurrency::AUD));
        assert_eq!(QuoteCurrency::from_str(" usd "), Some(QuoteCurrency::USD));
        assert_eq!(QuoteCurrency::from_str("gbp"), Some(QuoteCurrency::GBP));
        assert_eq!(QuoteCurrency::from_str("INVALID"), None);
    }

    #[test]
    fn test_market_code_is_lowercase() {
        for quote in [
            QuoteCurrency::AUD,
            QuoteCurrency::USD,
            QuoteCurrency::NZD,
            QuoteCurrency::EUR,
            QuoteCurrency::GBP,
        ] {
            assert_eq!(quote.market_code(), quote.as_str().to_lowercase());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", QuoteCurrency::AUD), "AUD");
        assert_eq!(QuoteCurrency::default(), QuoteCurrency::AUD);
        assert_eq!(QuoteCurrency::EUR.sign(), "€");
    }
}
