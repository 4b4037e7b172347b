//! Price entries and the lookup book used when valuing holdings.

use crate::{AssetId, AssetMapping};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unit price of one asset in the reference currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Display symbol, or the raw key when the source gave no symbol
    pub symbol: CompactString,
    /// Unit price in the reference currency
    pub price: f64,
    /// 24h change in percent; 0 when the source omits it
    pub change_24h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<f64>,
}

impl PriceEntry {
    pub fn new(symbol: &str, price: f64, change_24h: Option<f64>) -> Self {
        Self {
            symbol: CompactString::new(symbol),
            price,
            change_24h: change_24h.filter(|c| c.is_finite()).unwrap_or(0.0),
            high_24h: None,
            low_24h: None,
        }
    }

    pub fn with_range(mut self, high: Option<f64>, low: Option<f64>) -> Self {
        self.high_24h = high.filter(|v| v.is_finite() && *v > 0.0);
        self.low_24h = low.filter(|v| v.is_finite() && *v > 0.0);
        self
    }
}

/// Where a price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    /// Public market-data service (CoinGecko)
    Market,
    /// Exchange live-rates endpoint
    Exchange,
    /// Asset is cash in the reference currency
    Cash,
}

/// Prices gathered during one run from every source that answered.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    /// Public service prices keyed by price id ("bitcoin")
    pub market: HashMap<CompactString, PriceEntry>,
    /// Exchange live rates keyed by exchange asset id
    pub exchange: HashMap<AssetId, PriceEntry>,
}

impl PriceBook {
    pub fn new(
        market: HashMap<CompactString, PriceEntry>,
        exchange: HashMap<AssetId, PriceEntry>,
    ) -> Self {
        Self { market, exchange }
    }

    /// Public price by price id.
    pub fn market_price(&self, price_id: &str) -> Option<&PriceEntry> {
        self.market.get(price_id)
    }

    /// Exchange rate for an asset, trying the raw id, then the mapped numeric
    /// id, then the mapped symbol.
    pub fn exchange_rate(
        &self,
        id: &AssetId,
        mapping: Option<&AssetMapping>,
    ) -> Option<&PriceEntry> {
        if let Some(rate) = self.exchange.get(id) {
            return Some(rate);
        }
        let mapping = mapping?;
        self.exchange
            .get(&AssetId::Numeric(mapping.asset_id))
            .or_else(|| self.exchange.get(&AssetId::Symbol(mapping.symbol.clone())))
    }

    /// Best price for a balance: public service first, exchange rate second.
    pub fn lookup(
        &self,
        id: &AssetId,
        mapping: Option<&AssetMapping>,
    ) -> Option<(&PriceEntry, PriceSource)> {
        let market = mapping
            .and_then(|m| m.price_id.as_deref())
            .and_then(|price_id| self.market_price(price_id))
            .map(|p| (p, PriceSource::Market));

        market.or_else(|| {
            self.exchange_rate(id, mapping)
                .map(|p| (p, PriceSource::Exchange))
        })
    }
}
