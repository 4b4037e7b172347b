//! Asset identifiers and the static exchange-to-market mapping table.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while loading a mapping override.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Failed to parse asset mappings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Asset mapping for id {0} has an empty symbol")]
    EmptySymbol(u32),
}

/// Exchange-side asset identifier.
///
/// Swyftx reports assets by numeric id, while some endpoints (and older
/// response shapes) use the ticker code instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetId {
    Numeric(u32),
    Symbol(CompactString),
}

impl AssetId {
    /// Parse an identifier as reported by the exchange.
    /// Digit-only strings are numeric ids; anything else is an upper-cased code.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<u32>() {
            Ok(id) => Some(AssetId::Numeric(id)),
            Err(_) => Some(AssetId::Symbol(CompactString::new(raw.to_uppercase()))),
        }
    }

    /// Label used when the id has no entry in the mapping table.
    pub fn placeholder_label(&self) -> CompactString {
        match self {
            AssetId::Numeric(id) => compact_str::format_compact!("ID_{}", id),
            AssetId::Symbol(symbol) => symbol.clone(),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Numeric(id) => write!(f, "{}", id),
            AssetId::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// One row of the asset mapping table:
/// exchange numeric id → display symbol → public price service id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMapping {
    /// Numeric id on the exchange (e.g. 3 for BTC)
    pub asset_id: u32,
    /// Human symbol (e.g. "BTC")
    pub symbol: CompactString,
    /// CoinGecko-style id (e.g. "bitcoin"); None for fiat cash balances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_id: Option<CompactString>,
}

impl AssetMapping {
    pub fn new(asset_id: u32, symbol: &str, price_id: Option<&str>) -> Self {
        Self {
            asset_id,
            symbol: CompactString::new(symbol),
            price_id: price_id.map(CompactString::new),
        }
    }
}

/// A coin on the market-price watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchCoin {
    pub symbol: CompactString,
    pub price_id: CompactString,
}

impl WatchCoin {
    pub fn new(symbol: &str, price_id: &str) -> Self {
        Self {
            symbol: CompactString::new(symbol),
            price_id: CompactString::new(price_id),
        }
    }
}

// Exchange ids observed in account responses. Not a confirmed contract:
// unknown ids render as ID_<n> so the table can be extended.
const DEFAULT_ASSET_MAPPINGS: &[(u32, &str, Option<&str>)] = &[
    (1, "AUD", None),
    (3, "BTC", Some("bitcoin")),
    (4, "LTC", Some("litecoin")),
    (5, "ETH", Some("ethereum")),
    (6, "XRP", Some("ripple")),
    (7, "BCH", Some("bitcoin-cash")),
    (12, "ADA", Some("cardano")),
    (36, "USDT", Some("tether")),
    (45, "LINK", Some("chainlink")),
    (53, "DOT", Some("polkadot")),
    (73, "DOGE", Some("dogecoin")),
    (130, "SOL", Some("solana")),
    (154, "MATIC", Some("matic-network")),
    (175, "AVAX", Some("avalanche-2")),
    (249, "SHIB", Some("shiba-inu")),
    (405, "PEPE", Some("pepe")),
    (62, "USDC", Some("usd-coin")),
];

/// Coins always listed in the market-price section.
pub const DEFAULT_WATCHLIST: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("MATIC", "matic-network"),
    ("LINK", "chainlink"),
    ("UNI", "uniswap"),
    ("LTC", "litecoin"),
    ("BCH", "bitcoin-cash"),
    ("ETC", "ethereum-classic"),
    ("XLM", "stellar"),
    ("VET", "vechain"),
    ("FIL", "filecoin"),
    ("TRX", "tron"),
    ("EOS", "eos"),
    ("AAVE", "aave"),
    ("ATOM", "cosmos"),
    ("XTZ", "tezos"),
    ("ALGO", "algorand"),
    ("AVAX", "avalanche-2"),
    ("BNB", "binancecoin"),
    ("DOGE", "dogecoin"),
    ("SHIB", "shiba-inu"),
    ("PEPE", "pepe"),
    ("TON", "the-open-network"),
    ("TRUMP", "official-trump"),
    ("SUI", "sui"),
    ("RAY", "raydium"),
];

/// Build the default watchlist.
pub fn default_watchlist() -> Vec<WatchCoin> {
    DEFAULT_WATCHLIST
        .iter()
        .map(|(symbol, price_id)| WatchCoin::new(symbol, price_id))
        .collect()
}

/// Lookup table joining exchange asset ids to symbols and price ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetTable {
    pub mappings: Vec<AssetMapping>,
}

impl AssetTable {
    /// Table with the built-in mappings.
    pub fn builtin() -> Self {
        Self {
            mappings: DEFAULT_ASSET_MAPPINGS
                .iter()
                .map(|(id, symbol, price_id)| AssetMapping::new(*id, symbol, *price_id))
                .collect(),
        }
    }

    /// Parse override rows from a JSON document: either `{"mappings": [...]}`
    /// or a bare list of mapping objects.
    pub fn parse_overrides(json: &str) -> Result<Vec<AssetMapping>, MappingError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Doc {
            Wrapped { mappings: Vec<AssetMapping> },
            Bare(Vec<AssetMapping>),
        }

        let rows = match serde_json::from_str::<Doc>(json)? {
            Doc::Wrapped { mappings } => mappings,
            Doc::Bare(mappings) => mappings,
        };
        if let Some(bad) = rows.iter().find(|m| m.symbol.trim().is_empty()) {
            return Err(MappingError::EmptySymbol(bad.asset_id));
        }
        Ok(rows)
    }

    /// Add or replace a mapping, keyed by exchange id.
    pub fn upsert(&mut self, mapping: AssetMapping) {
        if let Some(existing) = self
            .mappings
            .iter_mut()
            .find(|m| m.asset_id == mapping.asset_id)
        {
            *existing = mapping;
        } else {
            self.mappings.push(mapping);
        }
    }

    /// Merge override rows into this table.
    pub fn extend_with(&mut self, overrides: Vec<AssetMapping>) {
        for mapping in overrides {
            self.upsert(mapping);
        }
    }

    pub fn by_numeric_id(&self, asset_id: u32) -> Option<&AssetMapping> {
        self.mappings.iter().find(|m| m.asset_id == asset_id)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&AssetMapping> {
        self.mappings
            .iter()
            .find(|m| m.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Resolve an exchange id of either kind.
    pub fn resolve(&self, id: &AssetId) -> Option<&AssetMapping> {
        match id {
            AssetId::Numeric(n) => self.by_numeric_id(*n),
            AssetId::Symbol(symbol) => self.by_symbol(symbol),
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_parse() {
        assert_eq!(AssetId::parse("3"), Some(AssetId::Numeric(3)));
        assert_eq!(AssetId::parse(" btc "), Some(AssetId::Symbol("BTC".into())));
        assert_eq!(AssetId::parse(""), None);
        assert_eq!(AssetId::parse("   "), None);
    }

    #[test]
    fn test_placeholder_label() {
        assert_eq!(AssetId::Numeric(999).placeholder_label(), "ID_999");
        assert_eq!(AssetId::Symbol("XYZ".into()).placeholder_label(), "XYZ");
    }

    #[test]
    fn test_builtin_resolves_btc() {
        let table = AssetTable::builtin();
        let btc = table.resolve(&AssetId::Numeric(3)).unwrap();
        assert_eq!(btc.symbol, "BTC");
        assert_eq!(btc.price_id.as_deref(), Some("bitcoin"));

        let by_code = table.resolve(&AssetId::Symbol("eth".into())).unwrap();
        assert_eq!(by_code.asset_id, 5);
        assert!(table.resolve(&AssetId::Numeric(999_999)).is_none());
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let table = AssetTable::builtin();
        let mut ids: Vec<u32> = table.mappings.iter().map(|m| m.asset_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), table.len());
    }

    #[test]
    fn test_parse_overrides_both_shapes() {
        let wrapped = r#"{"mappings": [{"asset_id": 900, "symbol": "NEW", "price_id": "new-coin"}]}"#;
        let bare = r#"[{"asset_id": 3, "symbol": "XBT"}]"#;

        let rows = AssetTable::parse_overrides(wrapped).unwrap();
        assert_eq!(rows[0].price_id.as_deref(), Some("new-coin"));

        let rows = AssetTable::parse_overrides(bare).unwrap();
        assert_eq!(rows[0].symbol, "XBT");
        assert!(rows[0].price_id.is_none());
    }

    #[test]
    fn test_parse_overrides_rejects_empty_symbol() {
        let err = AssetTable::parse_overrides(r#"[{"asset_id": 8, "symbol": " "}]"#).unwrap_err();
        assert!(matches!(err, MappingError::EmptySymbol(8)));
        assert!(AssetTable::parse_overrides("not json").is_err());
    }

    #[test]
    fn test_extend_with_replaces_and_appends() {
        let mut table = AssetTable::builtin();
        let before = table.len();
        table.extend_with(vec![
            AssetMapping::new(3, "XBT", Some("bitcoin")),
            AssetMapping::new(900, "NEW", Some("new-coin")),
        ]);
        assert_eq!(table.len(), before + 1);
        assert_eq!(table.by_numeric_id(3).unwrap().symbol, "XBT");
        assert_eq!(table.by_symbol("new").unwrap().asset_id, 900);
    }

    #[test]
    fn test_default_watchlist() {
        let watchlist = default_watchlist();
        assert_eq!(watchlist.len(), 30);
        assert_eq!(watchlist[0].symbol, "BTC");
        assert_eq!(watchlist[0].price_id, "bitcoin");
    }
}
