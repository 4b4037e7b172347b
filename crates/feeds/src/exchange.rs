//! Swyftx-style account API client.
//!
//! Two-step exchange: trade the long-lived API key for a short-lived bearer
//! token, then read balances and live rates with it. Endpoint paths and
//! response shapes are the superset observed in the wild, not a confirmed
//! contract, so the base URL is configurable and every response goes
//! through a tolerant normalizer.

use crate::error::FetchError;
use crate::http::{build_client, normalize_base_url, read_json};
use crate::schema;
use async_trait::async_trait;
use portfolio_core::{held_only, AssetId, BalanceEntry, PriceEntry, QuoteCurrency};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.swyftx.com.au";

const AUTH_PATH: &str = "/auth/refresh/";
const BALANCE_PATH: &str = "/user/balance/";

/// Short-lived bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

/// Account data source.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Trade an API key for an access token.
    async fn authenticate(&self, api_key: &str) -> Result<AccessToken, FetchError>;

    /// Balances with a positive available quantity.
    async fn fetch_balances(&self, token: &AccessToken) -> Result<Vec<BalanceEntry>, FetchError>;

    /// Live rates in `currency`, keyed by exchange asset id. The token is
    /// attached when present; the endpoint also answers anonymously.
    async fn fetch_rates(
        &self,
        token: Option<&AccessToken>,
        currency: QuoteCurrency,
    ) -> Result<HashMap<AssetId, PriceEntry>, FetchError>;
}

/// HTTP implementation of [`ExchangeApi`].
pub struct ExchangeClient {
    http: Client,
    base_url: String,
}

impl ExchangeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_client(build_client(timeout)?, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ExchangeApi for ExchangeClient {
    async fn authenticate(&self, api_key: &str) -> Result<AccessToken, FetchError> {
        if api_key.is_empty() {
            return Err(FetchError::ConfigurationMissing("exchange API key"));
        }

        let response = self
            .http
            .post(self.url(AUTH_PATH))
            .json(&serde_json::json!({ "apiKey": api_key }))
            .send()
            .await?;

        if let Some(err) = auth_status_error(response.status().as_u16()) {
            warn!(status = response.status().as_u16(), "Exchange rejected API key");
            return Err(err);
        }

        let body = read_json(response, AUTH_PATH).await?;
        let token = parse_access_token(&body)?;
        info!("Exchange access token obtained");
        Ok(token)
    }

    async fn fetch_balances(&self, token: &AccessToken) -> Result<Vec<BalanceEntry>, FetchError> {
        let response = self
            .http
            .get(self.url(BALANCE_PATH))
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let body = read_json(response, BALANCE_PATH).await?;
        let balances = parse_balances(&body)?;
        info!(count = balances.len(), "Fetched non-zero balances");
        Ok(balances)
    }

    async fn fetch_rates(
        &self,
        token: Option<&AccessToken>,
        currency: QuoteCurrency,
    ) -> Result<HashMap<AssetId, PriceEntry>, FetchError> {
        let path = format!("/markets/live-rates/{}/", currency.as_str());
        let mut request = self.http.get(self.url(&path));
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        let body = read_json(request.send().await?, &path).await?;
        let rates = parse_rates(&body)?;
        info!(count = rates.len(), currency = %currency, "Fetched exchange live rates");
        Ok(rates)
    }
}

/// Any non-2xx answer to the key exchange is an authentication failure.
pub fn auth_status_error(status: u16) -> Option<FetchError> {
    if (200..300).contains(&status) {
        None
    } else {
        Some(FetchError::AuthenticationFailed(format!("HTTP {}", status)))
    }
}

/// Pull the access token out of an auth response.
pub fn parse_access_token(body: &Value) -> Result<AccessToken, FetchError> {
    schema::first_string(body, schema::TOKEN_FIELDS)
        .map(AccessToken::new)
        .ok_or_else(|| FetchError::AuthenticationFailed("response has no access token".to_string()))
}

/// Normalize a balance response: bare list, or an object wrapping one.
pub fn parse_balances(body: &Value) -> Result<Vec<BalanceEntry>, FetchError> {
    let items = schema::list_items(body, schema::BALANCE_LIST_FIELDS).ok_or_else(|| {
        FetchError::UnexpectedShape("balance response is neither a list nor a wrapped list".into())
    })?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let asset_id = match schema::first_asset_id(item, schema::ASSET_ID_FIELDS) {
            Some(id) => id,
            None => {
                debug!("Skipping balance entry without asset id");
                continue;
            }
        };
        let quantity = match schema::first_number(item, schema::QUANTITY_FIELDS) {
            Some(q) => q,
            None => {
                debug!(asset = %asset_id, "Skipping balance entry without quantity");
                continue;
            }
        };
        entries.push(BalanceEntry::new(asset_id, quantity));
    }

    Ok(held_only(entries))
}

/// Normalize a live-rates response: list of rate objects, an object wrapping
/// such a list, or an object keyed by asset id.
pub fn parse_rates(body: &Value) -> Result<HashMap<AssetId, PriceEntry>, FetchError> {
    let mut rates = HashMap::new();

    if let Some(items) = schema::list_items(body, schema::RATE_LIST_FIELDS) {
        for item in items {
            if let Some(id) = schema::first_asset_id(item, schema::ASSET_ID_FIELDS) {
                insert_rate(&mut rates, id, None, item);
            }
        }
        return Ok(rates);
    }

    let object = body.as_object().ok_or_else(|| {
        FetchError::UnexpectedShape("rates response is neither a list nor an object".into())
    })?;

    for (key, item) in object {
        if !item.is_object() {
            continue;
        }
        let key_id = AssetId::parse(key);
        match schema::first_asset_id(item, schema::CODE_FIELDS) {
            Some(inner) => insert_rate(&mut rates, inner, key_id, item),
            None => {
                if let Some(id) = key_id {
                    insert_rate(&mut rates, id, None, item);
                }
            }
        }
    }

    Ok(rates)
}

fn insert_rate(
    rates: &mut HashMap<AssetId, PriceEntry>,
    id: AssetId,
    alias: Option<AssetId>,
    item: &Value,
) {
    let price = match schema::first_number(item, schema::PRICE_FIELDS) {
        Some(p) if p > 0.0 => p,
        _ => return,
    };
    let symbol = schema::first_string(item, schema::CODE_FIELDS).unwrap_or_else(|| id.to_string());
    let entry = PriceEntry::new(&symbol, price, schema::first_number(item, schema::CHANGE_FIELDS))
        .with_range(
            schema::first_number(item, schema::HIGH_FIELDS),
            schema::first_number(item, schema::LOW_FIELDS),
        );

    if let Some(alias) = alias.filter(|a| *a != id) {
        rates.insert(alias, entry.clone());
    }
    rates.insert(id, entry);
}
