//! Account balance entries reported by the exchange.

use crate::AssetId;
use serde::{Deserialize, Serialize};

/// Available quantity of one asset in the exchange account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset_id: AssetId,
    pub quantity: f64,
}

impl BalanceEntry {
    pub fn new(asset_id: AssetId, quantity: f64) -> Self {
        Self { asset_id, quantity }
    }

    /// Entries with nothing available (or a non-finite quantity) are dropped
    /// before valuation.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.quantity.is_finite() && self.quantity > 0.0
    }
}

/// Keep only entries with a positive quantity.
pub fn held_only(entries: Vec<BalanceEntry>) -> Vec<BalanceEntry> {
    entries.into_iter().filter(BalanceEntry::is_held).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_only_drops_empty_and_invalid() {
        let entries = vec![
            BalanceEntry::new(AssetId::Numeric(3), 0.5),
            BalanceEntry::new(AssetId::Numeric(5), 0.0),
            BalanceEntry::new(AssetId::Numeric(6), -1.0),
            BalanceEntry::new(AssetId::Numeric(7), f64::NAN),
        ];
        let held = held_only(entries);
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].asset_id, AssetId::Numeric(3));
    }
}
