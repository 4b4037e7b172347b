//! Core data types for the portfolio report bot.

pub mod asset;
pub mod balance;
pub mod price;
pub mod quote_currency;
pub mod valuation;

pub use asset::*;
pub use balance::*;
pub use price::*;
pub use quote_currency::*;
pub use valuation::*;
