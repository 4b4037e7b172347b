//! One report run: resolve, fetch, value, render, deliver.
//!
//! Every source failure is folded into the report. The run always reaches
//! the delivery step and never returns an error.

use crate::config::AppConfig;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use portfolio_alerts::{
    render_report, DeliveryReport, MessageSink, Notifier, PortfolioView, ReportInput, Section,
};
use portfolio_core::{market_rows, value_holdings, AssetTable, BalanceEntry, PriceBook};
use portfolio_feeds::{AccessToken, ExchangeApi, FailureKind, FetchError, MarketPrices};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// How much data the fetch step obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Partial,
    None,
}

/// Run state. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Start,
    CredentialsResolved,
    Authenticated,
    Unauthenticated,
    DataFetched(Completeness),
    Formatted,
    Delivered,
    DeliveryFailed,
    /// No destination configured, or a dry run
    DeliverySkipped,
}

impl RunStage {
    fn rank(self) -> u8 {
        match self {
            RunStage::Start => 0,
            RunStage::CredentialsResolved => 1,
            RunStage::Authenticated | RunStage::Unauthenticated => 2,
            RunStage::DataFetched(_) => 3,
            RunStage::Formatted => 4,
            RunStage::Delivered | RunStage::DeliveryFailed | RunStage::DeliverySkipped => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 5
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::DataFetched(c) => write!(f, "DataFetched({:?})", c),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Records the stages a run passes through.
#[derive(Debug)]
pub struct RunTracker {
    history: Vec<RunStage>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            history: vec![RunStage::Start],
        }
    }

    pub fn stage(&self) -> RunStage {
        self.history.last().copied().unwrap_or(RunStage::Start)
    }

    /// Move to `next`. Backward or sideways moves are ignored.
    pub fn advance(&mut self, next: RunStage) -> bool {
        let current = self.stage();
        if next.rank() <= current.rank() {
            warn!(from = %current, to = %next, "Ignoring non-forward run transition");
            return false;
        }
        info!(stage = %next, "Run stage");
        self.history.push(next);
        true
    }

    pub fn history(&self) -> &[RunStage] {
        &self.history
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`run_once`].
#[derive(Debug)]
pub struct RunOutcome {
    pub report: String,
    pub stages: Vec<RunStage>,
    /// `None` when delivery was skipped.
    pub delivery: Option<DeliveryReport>,
}

impl RunOutcome {
    pub fn final_stage(&self) -> RunStage {
        self.stages.last().copied().unwrap_or(RunStage::Start)
    }
}

/// Short reason shown in the report for a failed source.
pub fn failure_reason(err: &FetchError) -> String {
    match err.kind() {
        FailureKind::ConfigurationMissing => format!("not configured ({})", err),
        FailureKind::AuthenticationFailed => err.to_string(),
        FailureKind::FetchFailed if err.is_auth_failure() => {
            format!("authentication rejected ({})", err)
        }
        FailureKind::FetchFailed => err.to_string(),
    }
}

/// Obtain a bearer token: the pre-issued one if configured, otherwise
/// exchange the API key. One attempt, no refresh.
async fn resolve_token(
    config: &AppConfig,
    exchange: &dyn ExchangeApi,
) -> Result<AccessToken, FetchError> {
    let creds = &config.credentials;
    if !creds.access_token.is_empty() {
        info!("Using pre-issued exchange access token");
        return Ok(AccessToken::new(creds.access_token.clone()));
    }
    if creds.exchange_api_key.is_empty() {
        return Err(FetchError::ConfigurationMissing("exchange API key"));
    }
    exchange.authenticate(&creds.exchange_api_key).await
}

/// Price ids to request: the watchlist plus every held, mapped asset.
fn market_ids(config: &AppConfig, table: &AssetTable, balances: &[BalanceEntry]) -> Vec<CompactString> {
    let mut ids: Vec<CompactString> = config.watchlist.iter().map(|c| c.price_id.clone()).collect();
    ids.extend(
        balances
            .iter()
            .filter_map(|b| table.resolve(&b.asset_id))
            .filter_map(|m| m.price_id.clone()),
    );
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Execute a single run.
pub async fn run_once<S: MessageSink>(
    config: &AppConfig,
    table: &AssetTable,
    exchange: &dyn ExchangeApi,
    market: &dyn MarketPrices,
    notifier: Option<&Notifier<S>>,
    now: DateTime<Utc>,
) -> RunOutcome {
    let mut tracker = RunTracker::new();
    tracker.advance(RunStage::CredentialsResolved);

    let token = match resolve_token(config, exchange).await {
        Ok(token) => {
            tracker.advance(RunStage::Authenticated);
            Ok(token)
        }
        Err(e) => {
            warn!(error = %e, "Portfolio source skipped");
            tracker.advance(RunStage::Unauthenticated);
            Err(e)
        }
    };

    let balances = match &token {
        Ok(token) => exchange.fetch_balances(token).await,
        Err(e) => Err(e.clone()),
    };
    if let (Ok(_), Err(e)) = (&token, &balances) {
        warn!(error = %e, "Balance fetch failed");
    }

    // Live rates answer without a token too; they back up missing market prices.
    let rates = match exchange
        .fetch_rates(token.as_ref().ok(), config.currency)
        .await
    {
        Ok(rates) => rates,
        Err(e) => {
            warn!(error = %e, "Exchange live rates unavailable");
            HashMap::new()
        }
    };

    let held: &[BalanceEntry] = balances.as_deref().unwrap_or(&[]);
    let ids = market_ids(config, table, held);
    let market_prices = market.simple_prices(&ids, config.currency).await;
    let market_error = match &market_prices {
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Market price fetch failed");
            Some(e.clone())
        }
    };

    let available_symbols: Vec<CompactString> = rates.values().map(|e| e.symbol.to_uppercase().into()).collect();
    let book = PriceBook::new(market_prices.unwrap_or_default(), rates);

    let portfolio = match &balances {
        Ok(balances) => {
            Section::Available(PortfolioView::new(value_holdings(balances, table, &book, config.currency)))
        }
        Err(e) => Section::Unavailable(failure_reason(e)),
    };

    let rows = market_rows(&config.watchlist, table, &book);
    let market_section = match market_error {
        Some(e) if rows.is_empty() => Section::Unavailable(failure_reason(&e)),
        _ => Section::Available(rows),
    };

    let completeness = match (&portfolio, &market_section) {
        (Section::Available(view), Section::Available(_)) if !view.summary.is_incomplete() => {
            Completeness::Complete
        }
        (Section::Unavailable(_), Section::Unavailable(_)) => Completeness::None,
        _ => Completeness::Partial,
    };
    tracker.advance(RunStage::DataFetched(completeness));

    let report = render_report(&ReportInput {
        generated_at: now,
        currency: config.currency,
        portfolio,
        market: market_section,
        max_holdings: config.max_holdings,
        available_symbols,
    });
    tracker.advance(RunStage::Formatted);

    finish(config, report, tracker, notifier).await
}

/// Report a run that could not reach any source, e.g. when the HTTP clients
/// failed to build. Both sections carry `reason` and delivery still happens.
pub async fn report_startup_failure<S: MessageSink>(
    config: &AppConfig,
    notifier: Option<&Notifier<S>>,
    reason: &str,
    now: DateTime<Utc>,
) -> RunOutcome {
    let mut tracker = RunTracker::new();
    tracker.advance(RunStage::CredentialsResolved);
    tracker.advance(RunStage::Unauthenticated);
    tracker.advance(RunStage::DataFetched(Completeness::None));

    let report = render_report(&ReportInput {
        generated_at: now,
        currency: config.currency,
        portfolio: Section::Unavailable(reason.to_string()),
        market: Section::Unavailable(reason.to_string()),
        max_holdings: config.max_holdings,
        available_symbols: Vec::new(),
    });
    tracker.advance(RunStage::Formatted);

    finish(config, report, tracker, notifier).await
}

/// Delivery step shared by every run.
async fn finish<S: MessageSink>(
    config: &AppConfig,
    report: String,
    mut tracker: RunTracker,
    notifier: Option<&Notifier<S>>,
) -> RunOutcome {
    let delivery = match notifier {
        Some(notifier) if !config.dry_run => {
            let delivery = notifier.deliver(&report).await;
            if delivery.is_complete() {
                tracker.advance(RunStage::Delivered);
            } else {
                tracker.advance(RunStage::DeliveryFailed);
            }
            Some(delivery)
        }
        _ => {
            tracker.advance(RunStage::DeliverySkipped);
            None
        }
    };

    RunOutcome {
        report,
        stages: tracker.history().to_vec(),
        delivery,
    }
}
