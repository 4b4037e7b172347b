//! Application configuration.
//!
//! Everything is read once at startup through a [`CredentialResolver`] and
//! then passed by reference. Nothing here has a hardcoded credential
//! fallback: a missing secret resolves to an empty string and the pipeline
//! skips the source that needs it.

use portfolio_alerts::notifier::DEFAULT_CHUNK_LIMIT;
use portfolio_alerts::report::DEFAULT_MAX_HOLDINGS;
use portfolio_alerts::TextFormat;
use portfolio_core::{default_watchlist, AssetTable, QuoteCurrency, WatchCoin};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const BOT_TOKEN_VARS: &[&str] = &["TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN", "TG_TOKEN"];
pub const CHAT_ID_VARS: &[&str] = &["TELEGRAM_CHAT_ID", "CHAT_ID"];
pub const EXCHANGE_API_KEY_VARS: &[&str] = &["SWYFTX_API_KEY", "EXCHANGE_API_KEY"];
pub const ACCESS_TOKEN_VARS: &[&str] = &["SWYFTX_ACCESS_TOKEN", "EXCHANGE_ACCESS_TOKEN"];
pub const MARKET_API_KEY_VARS: &[&str] = &["COINGECKO_API_KEY"];

const EXCHANGE_BASE_URL_VAR: &str = "SWYFTX_BASE_URL";
const MARKET_BASE_URL_VAR: &str = "COINGECKO_BASE_URL";
const CURRENCY_VAR: &str = "REPORT_CURRENCY";
const MAX_HOLDINGS_VAR: &str = "REPORT_MAX_HOLDINGS";
const TIMEOUT_VAR: &str = "HTTP_TIMEOUT_SECS";
const MAPPINGS_PATH_VAR: &str = "ASSET_MAPPINGS_PATH";
const PARSE_MODE_VAR: &str = "TELEGRAM_PARSE_MODE";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Reads named values through an injectable lookup, trying a primary name
/// and then its aliases. Values are trimmed; blank counts as missing.
pub struct CredentialResolver<F> {
    lookup: F,
}

impl CredentialResolver<fn(&str) -> Option<String>> {
    /// Resolver over the process environment.
    pub fn from_env() -> Self {
        fn env_var(name: &str) -> Option<String> {
            std::env::var(name).ok()
        }
        Self { lookup: env_var }
    }
}

impl<F: Fn(&str) -> Option<String>> CredentialResolver<F> {
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// First non-blank value among `names`.
    pub fn optional(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| (self.lookup)(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    /// Like [`optional`](Self::optional) but empty when nothing is set.
    pub fn value(&self, names: &[&str]) -> String {
        self.optional(names).unwrap_or_default()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            bot_token: self.value(BOT_TOKEN_VARS),
            chat_id: self.value(CHAT_ID_VARS),
            exchange_api_key: self.value(EXCHANGE_API_KEY_VARS),
            access_token: self.value(ACCESS_TOKEN_VARS),
            market_api_key: self.value(MARKET_API_KEY_VARS),
        }
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, default: T) -> T {
        match self.optional(&[name]) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(var = name, value = %raw, "Ignoring unparsable setting");
                default
            }),
            None => default,
        }
    }
}

/// Secrets for one run. Never persisted, masked in debug output.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub bot_token: String,
    pub chat_id: String,
    pub exchange_api_key: String,
    pub access_token: String,
    pub market_api_key: String,
}

impl Credentials {
    /// Both the bot token and the destination are present.
    pub fn can_deliver(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// A pre-issued token or an API key is present.
    pub fn can_authenticate(&self) -> bool {
        !self.access_token.is_empty() || !self.exchange_api_key.is_empty()
    }
}

/// Masks a secret for display, keeping at most the last four characters.
pub fn mask(secret: &str) -> String {
    let len = secret.chars().count();
    if len == 0 {
        String::new()
    } else if len <= 8 {
        "*".repeat(len)
    } else {
        let tail: String = secret.chars().skip(len - 4).collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &mask(&self.bot_token))
            .field("chat_id", &mask(&self.chat_id))
            .field("exchange_api_key", &mask(&self.exchange_api_key))
            .field("access_token", &mask(&self.access_token))
            .field("market_api_key", &mask(&self.market_api_key))
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub exchange_base_url: String,
    pub market_base_url: String,
    /// Reference currency for every price and value.
    pub currency: QuoteCurrency,
    pub http_timeout_secs: u64,
    /// Holdings listed before the "and N more" line.
    pub max_holdings: usize,
    /// Maximum characters per delivered message.
    pub chunk_limit: usize,
    pub text_format: TextFormat,
    /// Optional JSON file extending the built-in asset table.
    pub asset_mappings_path: Option<String>,
    pub watchlist: Vec<WatchCoin>,
    /// Print instead of delivering.
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            exchange_base_url: portfolio_feeds::exchange::DEFAULT_BASE_URL.to_string(),
            market_base_url: portfolio_feeds::market::DEFAULT_BASE_URL.to_string(),
            currency: QuoteCurrency::default(),
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_holdings: DEFAULT_MAX_HOLDINGS,
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            text_format: TextFormat::Plain,
            asset_mappings_path: None,
            watchlist: default_watchlist(),
            dry_run: false,
        }
    }
}

impl AppConfig {
    /// Build the configuration from a resolver. Unusable optional settings
    /// fall back to their defaults with a warning.
    pub fn resolve<F: Fn(&str) -> Option<String>>(resolver: &CredentialResolver<F>) -> Self {
        let defaults = Self::default();

        let currency = match resolver.optional(&[CURRENCY_VAR]) {
            Some(raw) => QuoteCurrency::from_str(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unsupported report currency, using {}", defaults.currency);
                defaults.currency
            }),
            None => defaults.currency,
        };

        let text_format = match resolver.optional(&[PARSE_MODE_VAR]) {
            Some(raw) => TextFormat::from_str(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown parse mode, sending plain text");
                TextFormat::Plain
            }),
            None => TextFormat::Plain,
        };

        let http_timeout_secs = match resolver.parsed(TIMEOUT_VAR, defaults.http_timeout_secs) {
            0 => defaults.http_timeout_secs,
            secs => secs,
        };
        let max_holdings = match resolver.parsed(MAX_HOLDINGS_VAR, defaults.max_holdings) {
            0 => defaults.max_holdings,
            n => n,
        };

        Self {
            credentials: resolver.credentials(),
            exchange_base_url: resolver
                .optional(&[EXCHANGE_BASE_URL_VAR])
                .unwrap_or(defaults.exchange_base_url),
            market_base_url: resolver
                .optional(&[MARKET_BASE_URL_VAR])
                .unwrap_or(defaults.market_base_url),
            currency,
            http_timeout_secs,
            max_holdings,
            chunk_limit: defaults.chunk_limit,
            text_format,
            asset_mappings_path: resolver.optional(&[MAPPINGS_PATH_VAR]),
            watchlist: defaults.watchlist,
            dry_run: false,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Built-in asset table, extended by the override file when one is
/// configured and readable.
pub fn load_asset_table(path: Option<&str>) -> AssetTable {
    let mut table = AssetTable::builtin();
    let path = match path {
        Some(path) => Path::new(path),
        None => return table,
    };

    info!("Loading asset mappings from: {:?}", path);
    match std::fs::read_to_string(path) {
        Ok(content) => match AssetTable::parse_overrides(&content) {
            Ok(overrides) => {
                info!(count = overrides.len(), "Applied asset mapping overrides");
                table.extend_with(overrides);
            }
            Err(e) => warn!("Failed to parse asset mappings: {}", e),
        },
        Err(e) => warn!("Failed to read asset mappings file: {}", e),
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn resolver(pairs: &[(&str, &str)]) -> CredentialResolver<impl Fn(&str) -> Option<String>> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CredentialResolver::new(move |name: &str| vars.get(name).cloned())
    }

    #[test]
    fn test_primary_name_wins_over_alias() {
        let r = resolver(&[("TELEGRAM_BOT_TOKEN", "primary"), ("TG_TOKEN", "legacy")]);
        assert_eq!(r.value(BOT_TOKEN_VARS), "primary");
    }

    #[test]
    fn test_alias_used_when_primary_missing_or_blank() {
        let r = resolver(&[("TELEGRAM_BOT_TOKEN", "   "), ("TELEGRAM_TOKEN", "  legacy \n")]);
        assert_eq!(r.value(BOT_TOKEN_VARS), "legacy");

        let r = resolver(&[("CHAT_ID", "-100123")]);
        assert_eq!(r.value(CHAT_ID_VARS), "-100123");
    }

    #[test]
    fn test_missing_values_are_empty_not_errors() {
        let creds = resolver(&[]).credentials();
        assert_eq!(creds, Credentials::default());
        assert!(!creds.can_deliver());
        assert!(!creds.can_authenticate());
    }

    #[test]
    fn test_credentials_debug_is_masked() {
        let creds = resolver(&[
            ("TELEGRAM_BOT_TOKEN", "123456:ABCDEFGHIJKLMNOP"),
            ("SWYFTX_API_KEY", "short"),
        ])
        .credentials();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("ABCDEFGH"));
        assert!(debug.contains("****MNOP"));
        assert!(debug.contains("\"*****\""));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(""), "");
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask("abcdefghij"), "****ghij");
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::resolve(&resolver(&[]));
        assert_eq!(config.currency, QuoteCurrency::AUD);
        assert_eq!(config.http_timeout(), Duration::from_secs(15));
        assert_eq!(config.max_holdings, 15);
        assert_eq!(config.chunk_limit, 4000);
        assert_eq!(config.watchlist.len(), 30);
        assert_eq!(config.exchange_base_url, "https://api.swyftx.com.au");
        assert!(config.asset_mappings_path.is_none());
    }

    #[test]
    fn test_config_overrides_and_bad_values() {
        let config = AppConfig::resolve(&resolver(&[
            ("REPORT_CURRENCY", "usd"),
            ("HTTP_TIMEOUT_SECS", "abc"),
            ("REPORT_MAX_HOLDINGS", "5"),
            ("SWYFTX_BASE_URL", "http://localhost:8080"),
            ("TELEGRAM_PARSE_MODE", "html"),
        ]));
        assert_eq!(config.currency, QuoteCurrency::USD);
        assert_eq!(config.http_timeout_secs, 15);
        assert_eq!(config.max_holdings, 5);
        assert_eq!(config.exchange_base_url, "http://localhost:8080");
        assert_eq!(config.text_format, TextFormat::Html);

        let config = AppConfig::resolve(&resolver(&[("REPORT_CURRENCY", "XYZ")]));
        assert_eq!(config.currency, QuoteCurrency::AUD);
    }

    #[test]
    fn test_load_asset_table_falls_back() {
        let builtin = AssetTable::builtin();
        assert_eq!(load_asset_table(None).len(), builtin.len());
        assert_eq!(
            load_asset_table(Some("/nonexistent/asset-mappings.json")).len(),
            builtin.len()
        );
    }

    #[test]
    fn test_load_asset_table_applies_overrides() {
        let path = std::env::temp_dir().join(format!("asset-mappings-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"mappings": [{"asset_id": 9001, "symbol": "NEW", "price_id": "new-coin"}]}"#,
        )
        .unwrap();

        let table = load_asset_table(path.to_str());
        std::fs::remove_file(&path).ok();

        let mapping = table.by_numeric_id(9001).unwrap();
        assert_eq!(mapping.symbol, "NEW");
    }
}
