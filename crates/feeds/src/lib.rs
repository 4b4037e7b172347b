//! Market and account data collection from HTTP APIs.
//!
//! ## Architecture
//!
//! - `exchange` - Swyftx-style account client (auth, balances, live rates)
//! - `market` - CoinGecko-style public price client
//! - `schema` - Ordered field-alias lists shared by every response normalizer
//! - `http` - Client construction and status handling

pub mod error;
pub mod exchange;
pub mod http;
pub mod market;
pub mod schema;

pub use error::*;
pub use exchange::{AccessToken, ExchangeApi, ExchangeClient};
pub use market::{MarketPrices, PriceClient};
