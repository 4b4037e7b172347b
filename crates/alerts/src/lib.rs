//! Report rendering and Telegram delivery.
//!
//! This crate provides:
//! - Stable number formatting for quantities, values and changes
//! - Deterministic report rendering from valued holdings and market rows
//! - A chunking notifier over a pluggable message sink (Telegram by default)

pub mod format;
pub mod notifier;
pub mod report;
pub mod telegram;

pub use notifier::{DeliveryReport, MessageSink, Notifier, NotifierConfig, NotifyError, TextFormat};
pub use report::{render_report, PortfolioView, ReportInput, Section};
pub use telegram::TelegramBot;
