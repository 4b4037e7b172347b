//! Joining balances to prices and summarising the portfolio.

use crate::{
    AssetId, AssetTable, BalanceEntry, PriceBook, PriceEntry, PriceSource, QuoteCurrency,
    WatchCoin,
};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A balance converted to reference-currency value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedHolding {
    pub asset_id: AssetId,
    /// Symbol from the mapping table, or `ID_<n>` for unmapped ids
    pub label: CompactString,
    pub quantity: f64,
    /// Unit price; None when no source priced this asset
    pub price: Option<f64>,
    /// quantity × price, 0 when unpriced
    pub value: f64,
    pub change_24h: f64,
    pub mapped: bool,
    pub source: Option<PriceSource>,
}

impl ValuedHolding {
    #[inline]
    pub fn is_priced(&self) -> bool {
        self.price.is_some()
    }
}

/// Derived totals for one report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    /// Σ(value × change) / total; 0 when the total is 0
    pub weighted_change_24h: f64,
    pub holding_count: usize,
    /// Holdings present in the account but missing a price
    pub unpriced_count: usize,
    /// Holdings whose id has no mapping-table entry
    pub unmapped_count: usize,
}

impl PortfolioSummary {
    pub fn from_holdings(holdings: &[ValuedHolding]) -> Self {
        let total_value: f64 = holdings.iter().map(|h| h.value).sum();
        let weighted_sum: f64 = holdings.iter().map(|h| h.value * h.change_24h).sum();
        let weighted_change_24h = if total_value > 0.0 {
            weighted_sum / total_value
        } else {
            0.0
        };

        Self {
            total_value,
            weighted_change_24h,
            holding_count: holdings.len(),
            unpriced_count: holdings.iter().filter(|h| !h.is_priced()).count(),
            unmapped_count: holdings.iter().filter(|h| !h.mapped).count(),
        }
    }

    /// Whether some holdings could not be fully joined to a price.
    pub fn is_incomplete(&self) -> bool {
        self.unpriced_count > 0
    }
}

/// Sort holdings by value descending. Priced entries win ties against
/// unpriced ones, remaining ties fall back to the label.
pub fn sort_by_value(holdings: &mut [ValuedHolding]) {
    holdings.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.is_priced().cmp(&a.is_priced()))
            .then_with(|| a.label.cmp(&b.label))
    });
}

/// Value every held balance against the price book.
///
/// Unmapped ids are kept under a placeholder label. A balance of the
/// reference currency itself is valued at 1 per unit.
pub fn value_holdings(
    balances: &[BalanceEntry],
    table: &AssetTable,
    prices: &PriceBook,
    currency: QuoteCurrency,
) -> Vec<ValuedHolding> {
    let mut holdings: Vec<ValuedHolding> = balances
        .iter()
        .filter(|b| b.is_held())
        .map(|balance| {
            let mapping = table.resolve(&balance.asset_id);
            let label = mapping
                .map(|m| m.symbol.clone())
                .unwrap_or_else(|| balance.asset_id.placeholder_label());

            let priced = if label.eq_ignore_ascii_case(currency.as_str()) {
                Some((1.0, 0.0, PriceSource::Cash))
            } else {
                prices
                    .lookup(&balance.asset_id, mapping)
                    .map(|(entry, source)| (entry.price, entry.change_24h, source))
            };

            match priced {
                Some((price, change_24h, source)) => ValuedHolding {
                    asset_id: balance.asset_id.clone(),
                    label,
                    quantity: balance.quantity,
                    price: Some(price),
                    value: balance.quantity * price,
                    change_24h,
                    mapped: mapping.is_some(),
                    source: Some(source),
                },
                None => ValuedHolding {
                    asset_id: balance.asset_id.clone(),
                    label,
                    quantity: balance.quantity,
                    price: None,
                    value: 0.0,
                    change_24h: 0.0,
                    mapped: mapping.is_some(),
                    source: None,
                },
            }
        })
        .collect();

    sort_by_value(&mut holdings);
    holdings
}

/// One line of the market-price section.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRow {
    pub symbol: CompactString,
    pub entry: PriceEntry,
    pub source: PriceSource,
}

/// Price every watchlist coin that any source knows about, sorted by symbol.
pub fn market_rows(watchlist: &[WatchCoin], table: &AssetTable, prices: &PriceBook) -> Vec<MarketRow> {
    let mut rows: Vec<MarketRow> = watchlist
        .iter()
        .filter_map(|coin| {
            if let Some(entry) = prices.market_price(&coin.price_id) {
                return Some(MarketRow {
                    symbol: coin.symbol.clone(),
                    entry: entry.clone(),
                    source: PriceSource::Market,
                });
            }
            let symbol_id = AssetId::Symbol(coin.symbol.clone());
            let mapping = table.by_symbol(&coin.symbol);
            prices.exchange_rate(&symbol_id, mapping).map(|entry| MarketRow {
                symbol: coin.symbol.clone(),
                entry: entry.clone(),
                source: PriceSource::Exchange,
            })
        })
        .collect();

    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AssetMapping;
    use std::collections::HashMap;

    fn btc_book() -> PriceBook {
        let mut market = HashMap::new();
        market.insert(
            CompactString::new("bitcoin"),
            PriceEntry::new("BTC", 80_000.0, Some(2.5)),
        );
        market.insert(
            CompactString::new("ethereum"),
            PriceEntry::new("ETH", 4_000.0, Some(-1.0)),
        );
        PriceBook::new(market, HashMap::new())
    }

    fn table() -> AssetTable {
        AssetTable {
            mappings: vec![
                AssetMapping::new(1, "AUD", None),
                AssetMapping::new(3, "BTC", Some("bitcoin")),
                AssetMapping::new(5, "ETH", Some("ethereum")),
                AssetMapping::new(6, "XRP", Some("ripple")),
            ],
        }
    }

    #[test]
    fn test_single_btc_holding() {
        let balances = vec![BalanceEntry::new(AssetId::Numeric(3), 0.5)];
        let holdings = value_holdings(&balances, &table(), &btc_book(), QuoteCurrency::AUD);

        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].label, "BTC");
        assert_eq!(holdings[0].value, 40_000.0);
        assert_eq!(holdings[0].change_24h, 2.5);
        assert_eq!(holdings[0].source, Some(PriceSource::Market));

        let summary = PortfolioSummary::from_holdings(&holdings);
        assert_eq!(summary.total_value, 40_000.0);
        assert_eq!(summary.weighted_change_24h, 2.5);
        assert!(!summary.is_incomplete());
    }

    #[test]
    fn test_zero_holdings_summary() {
        let summary = PortfolioSummary::from_holdings(&[]);
        assert_eq!(summary.total_value, 0.0);
        assert_eq!(summary.weighted_change_24h, 0.0);
        assert_eq!(summary.holding_count, 0);
    }

    #[test]
    fn test_weighted_change() {
        let balances = vec![
            BalanceEntry::new(AssetId::Numeric(3), 0.5), // 40_000 @ +2.5
            BalanceEntry::new(AssetId::Numeric(5), 10.0), // 40_000 @ -1.0
        ];
        let holdings = value_holdings(&balances, &table(), &btc_book(), QuoteCurrency::AUD);
        let summary = PortfolioSummary::from_holdings(&holdings);
        assert_eq!(summary.total_value, 80_000.0);
        assert!((summary.weighted_change_24h - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_unmapped_and_unpriced_are_kept() {
        let balances = vec![
            BalanceEntry::new(AssetId::Numeric(3), 0.5),
            BalanceEntry::new(AssetId::Numeric(777), 12.0),
            BalanceEntry::new(AssetId::Numeric(6), 100.0),
            BalanceEntry::new(AssetId::Numeric(5), 0.0),
        ];
        let holdings = value_holdings(&balances, &table(), &btc_book(), QuoteCurrency::AUD);

        assert_eq!(holdings.len(), 3);
        assert_eq!(holdings[0].label, "BTC");
        let unmapped = holdings.iter().find(|h| h.label == "ID_777").unwrap();
        assert!(!unmapped.mapped);
        assert_eq!(unmapped.value, 0.0);

        let summary = PortfolioSummary::from_holdings(&holdings);
        assert_eq!(summary.unpriced_count, 2);
        assert_eq!(summary.unmapped_count, 1);
        assert_eq!(summary.total_value, 40_000.0);
    }

    #[test]
    fn test_cash_balance_valued_at_par() {
        let balances = vec![BalanceEntry::new(AssetId::Numeric(1), 250.0)];
        let holdings = value_holdings(&balances, &table(), &PriceBook::default(), QuoteCurrency::AUD);
        assert_eq!(holdings[0].value, 250.0);
        assert_eq!(holdings[0].source, Some(PriceSource::Cash));

        // Not cash when the report is in another currency.
        let holdings = value_holdings(&balances, &table(), &PriceBook::default(), QuoteCurrency::USD);
        assert!(!holdings[0].is_priced());
    }

    #[test]
    fn test_sorted_descending_by_value() {
        let balances = vec![
            BalanceEntry::new(AssetId::Numeric(777), 1.0),
            BalanceEntry::new(AssetId::Numeric(5), 0.1),
            BalanceEntry::new(AssetId::Numeric(1), 10.0),
            BalanceEntry::new(AssetId::Numeric(3), 0.5),
        ];
        let holdings = value_holdings(&balances, &table(), &btc_book(), QuoteCurrency::AUD);
        for pair in holdings.windows(2) {
            assert!(pair[0].value >= pair[1].value);
        }
        assert_eq!(holdings.last().unwrap().label, "ID_777");
    }

    #[test]
    fn test_market_rows_sorted_with_exchange_fallback() {
        let mut book = btc_book();
        book.exchange
            .insert(AssetId::Numeric(6), PriceEntry::new("6", 0.9, Some(1.2)));
        let watchlist = vec![
            WatchCoin::new("XRP", "ripple"),
            WatchCoin::new("BTC", "bitcoin"),
            WatchCoin::new("ETH", "ethereum"),
            WatchCoin::new("TON", "the-open-network"),
        ];
        let rows = market_rows(&watchlist, &table(), &book);
        let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "XRP"]);
        assert_eq!(rows[2].source, PriceSource::Exchange);
    }
}
