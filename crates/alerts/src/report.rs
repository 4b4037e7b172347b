//! Report rendering.
//!
//! `render_report` is a pure function of its input: the timestamp is passed
//! in, holdings are ordered by value and market rows by symbol here, whatever
//! order the caller used. Every section degrades to an explanatory line
//! instead of disappearing, so the output is never empty.

use crate::format::{
    change_indicator, format_change, format_price, format_quantity, format_total, format_value,
};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use portfolio_core::{sort_by_value, MarketRow, PortfolioSummary, QuoteCurrency, ValuedHolding};

/// Default cap on listed holdings.
pub const DEFAULT_MAX_HOLDINGS: usize = 15;

/// Exchange codes listed when no watchlist coin matched.
pub const AVAILABLE_PREVIEW: usize = 20;

/// A report section's data, or the reason it could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Section<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available(_))
    }
}

/// Valued holdings, highest value first, plus their aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioView {
    pub holdings: Vec<ValuedHolding>,
    pub summary: PortfolioSummary,
}

impl PortfolioView {
    pub fn new(mut holdings: Vec<ValuedHolding>) -> Self {
        sort_by_value(&mut holdings);
        let summary = PortfolioSummary::from_holdings(&holdings);
        Self { holdings, summary }
    }
}

/// Everything the renderer needs.
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub generated_at: DateTime<Utc>,
    pub currency: QuoteCurrency,
    pub portfolio: Section<PortfolioView>,
    pub market: Section<Vec<MarketRow>>,
    pub max_holdings: usize,
    /// Codes the exchange quoted, shown when the watchlist matched nothing.
    pub available_symbols: Vec<CompactString>,
}

/// Render the full report as plain text.
pub fn render_report(input: &ReportInput) -> String {
    let sign = input.currency.sign();
    let mut lines = vec![
        format!("📊 Crypto Portfolio Report ({})", input.currency),
        format!("⏰ {}", input.generated_at.format("%d %b %Y %H:%M UTC")),
    ];

    if !input.portfolio.is_available() && !input.market.is_available() {
        lines.push(String::new());
        lines.push("❌ No data could be retrieved for this run.".to_string());
    }

    lines.push(String::new());
    lines.extend(portfolio_lines(&input.portfolio, input.max_holdings, sign));

    lines.push(String::new());
    lines.extend(market_lines(&input.market, &input.available_symbols, sign));

    let holding_count = match &input.portfolio {
        Section::Available(view) => view.summary.holding_count,
        Section::Unavailable(_) => 0,
    };
    let coin_count = match &input.market {
        Section::Available(rows) => rows.len(),
        Section::Unavailable(_) => 0,
    };
    lines.push(String::new());
    lines.push(format!(
        "📋 {} holdings · {} coins tracked",
        holding_count, coin_count
    ));

    lines.join("\n")
}

fn portfolio_lines(section: &Section<PortfolioView>, max: usize, sign: &str) -> Vec<String> {
    let mut lines = vec!["💼 Portfolio".to_string()];

    let view = match section {
        Section::Available(view) => view,
        Section::Unavailable(reason) => {
            lines.push(format!("⚠️ Portfolio unavailable: {}", reason));
            return lines;
        }
    };

    let summary = &view.summary;
    lines.push(format!("Total: {}", format_total(summary.total_value, sign)));
    if summary.total_value > 0.0 {
        let change = summary.weighted_change_24h;
        lines.push(format!("{} 24h: {}", change_indicator(change), format_change(change)));
    }

    if view.holdings.is_empty() {
        lines.push("No non-zero balances.".to_string());
        return lines;
    }

    lines.push(format!("Holdings ({}):", view.holdings.len()));
    lines.extend(view.holdings.iter().take(max).map(|h| holding_line(h, sign)));
    if view.holdings.len() > max {
        lines.push(format!("… and {} more", view.holdings.len() - max));
    }

    if summary.unpriced_count > 0 {
        lines.push(format!(
            "⚠️ Partial: {} holding(s) without a price",
            summary.unpriced_count
        ));
    }
    if summary.unmapped_count > 0 {
        let labels: Vec<&str> = view
            .holdings
            .iter()
            .filter(|h| !h.mapped)
            .map(|h| h.label.as_str())
            .collect();
        lines.push(format!(
            "⚠️ {} unmapped asset id(s): {}",
            summary.unmapped_count,
            labels.join(", ")
        ));
    }

    lines
}

fn holding_line(holding: &ValuedHolding, sign: &str) -> String {
    let quantity = format_quantity(holding.quantity);
    if !holding.is_priced() {
        return format!("• {}: {} → price n/a", holding.label, quantity);
    }
    format!(
        "• {}: {} → {} ({} {})",
        holding.label,
        quantity,
        format_value(holding.value, sign),
        change_indicator(holding.change_24h),
        format_change(holding.change_24h)
    )
}

fn market_lines(section: &Section<Vec<MarketRow>>, available: &[CompactString], sign: &str) -> Vec<String> {
    let mut lines = vec!["📈 Market".to_string()];

    let rows = match section {
        Section::Available(rows) => rows,
        Section::Unavailable(reason) => {
            lines.push(format!("⚠️ Market prices unavailable: {}", reason));
            return lines;
        }
    };

    if rows.is_empty() {
        lines.push(no_match_line(available));
        return lines;
    }

    let mut sorted: Vec<&MarketRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    lines.extend(sorted.into_iter().map(|row| market_line(row, sign)));

    lines
}

fn market_line(row: &MarketRow, sign: &str) -> String {
    let entry = &row.entry;
    let mut line = format!(
        "{} {}: {} ({})",
        change_indicator(entry.change_24h),
        row.symbol,
        format_price(entry.price, sign),
        format_change(entry.change_24h)
    );
    if let (Some(low), Some(high)) = (entry.low_24h, entry.high_24h) {
        line.push_str(&format!(
            " · 24h {} – {}",
            format_price(low, sign),
            format_price(high, sign)
        ));
    }
    line
}

fn no_match_line(available: &[CompactString]) -> String {
    let mut codes: Vec<String> = available
        .iter()
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty())
        .collect();
    codes.sort_unstable();
    codes.dedup();

    if codes.is_empty() {
        return "⚠️ No coins matched, and the exchange listed none.".to_string();
    }
    codes.truncate(AVAILABLE_PREVIEW);
    format!(
        "⚠️ No coins matched. Available coins (first {}): {}",
        AVAILABLE_PREVIEW,
        codes.join(", ")
    )
}
