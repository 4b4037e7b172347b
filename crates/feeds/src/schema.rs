//! Accepted field names for each unstable third-party schema.
//!
//! Every alias list is ordered: the first alias present with a usable value
//! wins. Normalizers in `exchange` and `market` go through these helpers
//! instead of chaining lookups at each call site.

use portfolio_core::AssetId;
use serde_json::Value;

/// Access token in the auth response.
pub const TOKEN_FIELDS: &[&str] = &["accessToken", "access_token", "token"];

/// Object keys that may wrap a balance list.
pub const BALANCE_LIST_FIELDS: &[&str] = &["assets", "holdings", "balances", "data"];

/// Object keys that may wrap a rate list.
pub const RATE_LIST_FIELDS: &[&str] = &["rates", "data"];

pub const ASSET_ID_FIELDS: &[&str] = &["assetId", "asset_id", "id", "asset", "code", "symbol"];

pub const QUANTITY_FIELDS: &[&str] = &[
    "availableBalance",
    "available",
    "balance",
    "quantity",
    "amount",
    "free",
];

pub const PRICE_FIELDS: &[&str] = &["rate", "price", "last", "midPrice"];

pub const CHANGE_FIELDS: &[&str] = &[
    "change24h",
    "change24hPercent",
    "percentChange",
    "dailyPriceChange",
];

pub const HIGH_FIELDS: &[&str] = &["high24h", "high"];

pub const LOW_FIELDS: &[&str] = &["low24h", "low"];

/// Display code inside a rate object.
pub const CODE_FIELDS: &[&str] = &["code", "symbol", "asset"];

/// Parse a JSON number or numeric string into a finite f64.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// First alias holding a number (or numeric string).
pub fn first_number(object: &Value, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|alias| object.get(alias))
        .find_map(number)
}

/// First alias holding a non-empty string. Numbers are rendered as strings.
pub fn first_string(object: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| object.get(alias))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Interpret a JSON value as an exchange asset id.
pub fn asset_id(value: &Value) -> Option<AssetId> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .map(AssetId::Numeric),
        Value::String(s) => AssetId::parse(s),
        _ => None,
    }
}

/// First alias that yields a valid asset id.
pub fn first_asset_id(object: &Value, aliases: &[&str]) -> Option<AssetId> {
    aliases
        .iter()
        .filter_map(|alias| object.get(alias))
        .find_map(asset_id)
}

/// Items of a response that is either a bare list or an object wrapping a
/// list under one of `wrappers`.
pub fn list_items<'a>(value: &'a Value, wrappers: &[&str]) -> Option<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(_) => wrappers
            .iter()
            .filter_map(|key| value.get(key))
            .find_map(Value::as_array),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_accepts_strings() {
        assert_eq!(number(&json!(1.5)), Some(1.5));
        assert_eq!(number(&json!(" 2.25 ")), Some(2.25));
        assert_eq!(number(&json!("abc")), None);
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!(true)), None);
    }

    #[test]
    fn test_first_number_respects_order() {
        let obj = json!({"price": "10", "rate": 12.0, "last": 9});
        assert_eq!(first_number(&obj, PRICE_FIELDS), Some(12.0));

        let obj = json!({"rate": null, "price": "oops", "last": 9});
        assert_eq!(first_number(&obj, PRICE_FIELDS), Some(9.0));
        assert_eq!(first_number(&json!({}), PRICE_FIELDS), None);
    }

    #[test]
    fn test_first_string_skips_blank() {
        let obj = json!({"accessToken": "", "token": "abc"});
        assert_eq!(first_string(&obj, TOKEN_FIELDS), Some("abc".to_string()));
        assert_eq!(first_string(&json!({"code": 3}), CODE_FIELDS), Some("3".to_string()));
    }

    #[test]
    fn test_asset_id_variants() {
        assert_eq!(asset_id(&json!(3)), Some(AssetId::Numeric(3)));
        assert_eq!(asset_id(&json!("5")), Some(AssetId::Numeric(5)));
        assert_eq!(asset_id(&json!("btc")), Some(AssetId::Symbol("BTC".into())));
        assert_eq!(asset_id(&json!(-1)), None);
        assert_eq!(
            first_asset_id(&json!({"assetId": {}, "code": "ETH"}), ASSET_ID_FIELDS),
            Some(AssetId::Symbol("ETH".into()))
        );
    }

    #[test]
    fn test_list_items_shapes() {
        let flat = json!([{"assetId": 3}]);
        assert_eq!(list_items(&flat, BALANCE_LIST_FIELDS).map(Vec::len), Some(1));

        let wrapped = json!({"holdings": [{"assetId": 3}, {"assetId": 5}]});
        assert_eq!(list_items(&wrapped, BALANCE_LIST_FIELDS).map(Vec::len), Some(2));

        let wrong = json!({"assets": "none"});
        assert!(list_items(&wrong, BALANCE_LIST_FIELDS).is_none());
        assert!(list_items(&json!("text"), BALANCE_LIST_FIELDS).is_none());
    }
}
