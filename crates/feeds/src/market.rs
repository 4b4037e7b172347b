//! CoinGecko-style public price client.

use crate::error::FetchError;
use crate::http::{build_client, normalize_base_url, read_json};
use crate::schema;
use async_trait::async_trait;
use compact_str::CompactString;
use portfolio_core::{PriceEntry, QuoteCurrency};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

const SIMPLE_PRICE_PATH: &str = "/simple/price";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Reference price source keyed by public coin id.
#[async_trait]
pub trait MarketPrices: Send + Sync {
    /// Prices (with 24h change when available) for `ids` in `currency`.
    async fn simple_prices(
        &self,
        ids: &[CompactString],
        currency: QuoteCurrency,
    ) -> Result<HashMap<CompactString, PriceEntry>, FetchError>;
}

/// HTTP implementation of [`MarketPrices`].
pub struct PriceClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PriceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: normalize_base_url(base_url)?,
            api_key: None,
        })
    }

    /// Send the API key header on every request. Empty keys are ignored.
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        let api_key = api_key.trim();
        self.api_key = (!api_key.is_empty()).then(|| api_key.to_string());
        self
    }
}

/// Sorted, de-duplicated, comma-joined id list.
pub fn join_ids(ids: &[CompactString]) -> String {
    let mut ids: Vec<&str> = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(",")
}

#[async_trait]
impl MarketPrices for PriceClient {
    async fn simple_prices(
        &self,
        ids: &[CompactString],
        currency: QuoteCurrency,
    ) -> Result<HashMap<CompactString, PriceEntry>, FetchError> {
        let joined = join_ids(ids);
        if joined.is_empty() {
            debug!("Market: No ids to fetch");
            return Ok(HashMap::new());
        }

        let mut request = self
            .http
            .get(format!("{}{}", self.base_url, SIMPLE_PRICE_PATH))
            .query(&[
                ("ids", joined.as_str()),
                ("vs_currencies", currency.market_code()),
                ("include_24hr_change", "true"),
                ("include_24hr_high_low", "true"),
            ]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let body = read_json(request.send().await?, SIMPLE_PRICE_PATH).await?;
        let prices = parse_simple_prices(&body, currency)?;
        info!(requested = ids.len(), priced = prices.len(), "Fetched market prices");
        Ok(prices)
    }
}

/// Normalize `{"bitcoin": {"aud": 80000, "aud_24h_change": 2.5}, ...}`.
/// Ids without a positive price in `currency` are skipped.
pub fn parse_simple_prices(
    body: &Value,
    currency: QuoteCurrency,
) -> Result<HashMap<CompactString, PriceEntry>, FetchError> {
    let object = body
        .as_object()
        .ok_or_else(|| FetchError::UnexpectedShape("price response is not an object".into()))?;

    let code = currency.market_code();
    let change_key = format!("{}_24h_change", code);
    let high_key = format!("{}_24h_high", code);
    let low_key = format!("{}_24h_low", code);

    let mut prices = HashMap::with_capacity(object.len());
    for (id, fields) in object {
        let price = match fields.get(code).and_then(schema::number) {
            Some(p) if p > 0.0 => p,
            _ => {
                debug!(id = %id, "Market: No {} price", code);
                continue;
            }
        };
        let change = fields.get(change_key.as_str()).and_then(schema::number);
        let entry = PriceEntry::new(id, price, change).with_range(
            fields.get(high_key.as_str()).and_then(schema::number),
            fields.get(low_key.as_str()).and_then(schema::number),
        );
        prices.insert(CompactString::new(id), entry);
    }

    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_ids_sorted_and_deduped() {
        let ids: Vec<CompactString> = ["solana", "bitcoin", "", "solana", " ethereum "]
            .iter()
            .map(|s| CompactString::new(s))
            .collect();
        assert_eq!(join_ids(&ids), "bitcoin,ethereum,solana");
    }

    #[test]
    fn test_parse_simple_prices() {
        let body = json!({
            "bitcoin": {"aud": 80000.0, "aud_24h_change": 2.5, "aud_24h_high": 81000, "aud_24h_low": 79000},
            "ethereum": {"aud": 4000},
            "deadcoin": {"aud": 0},
            "usd-only": {"usd": 1.0}
        });
        let prices = parse_simple_prices(&body, QuoteCurrency::AUD).unwrap();
        assert_eq!(prices.len(), 2);

        let btc = &prices["bitcoin"];
        assert_eq!(btc.price, 80_000.0);
        assert_eq!(btc.change_24h, 2.5);
        assert_eq!(btc.high_24h, Some(81_000.0));
        // Missing change is an explicit zero, not an error.
        assert_eq!(prices["ethereum"].change_24h, 0.0);
    }

    #[test]
    fn test_parse_simple_prices_rejects_non_object() {
        assert!(matches!(
            parse_simple_prices(&json!([1, 2]), QuoteCurrency::AUD),
            Err(FetchError::UnexpectedShape(_))
        ));
        assert!(parse_simple_prices(&json!({}), QuoteCurrency::USD).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_request() {
        let client = PriceClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let prices = client.simple_prices(&[], QuoteCurrency::AUD).await.unwrap();
        assert!(prices.is_empty());
    }

    #[test]
    fn test_with_api_key_ignores_blank() {
        let client = PriceClient::new(DEFAULT_BASE_URL, Duration::from_secs(1))
            .unwrap()
            .with_api_key("  ");
        assert!(client.api_key.is_none());
    }
}
