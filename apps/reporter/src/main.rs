//! Portfolio Report - single-shot CLI
//!
//! Fetches exchange balances and market prices, values the portfolio and
//! posts a text summary to Telegram. Meant to be triggered by a scheduler.

mod config;
mod pipeline;

use clap::Parser;
use config::{load_asset_table, AppConfig, CredentialResolver};
use pipeline::{report_startup_failure, run_once, RunOutcome};
use std::process::ExitCode;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use portfolio_alerts::{Notifier, NotifierConfig, TelegramBot};
use portfolio_core::QuoteCurrency;
use portfolio_feeds::{exchange, market, ExchangeClient, FetchError, PriceClient};

/// Portfolio Report CLI
#[derive(Parser, Debug)]
#[command(name = "portfolio-report")]
#[command(about = "Daily crypto portfolio summary to Telegram", long_about = None)]
struct Args {
    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the report to stdout instead of sending it
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Reference currency (overrides REPORT_CURRENCY)
    #[arg(short, long)]
    currency: Option<String>,
}

fn init_logging(level: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

fn apply_args(config: &mut AppConfig, args: &Args) {
    config.dry_run = args.dry_run;
    if let Some(raw) = &args.currency {
        match QuoteCurrency::from_str(raw) {
            Some(currency) => config.currency = currency,
            None => warn!(value = %raw, "Unsupported --currency, keeping {}", config.currency),
        }
    }
}

fn exchange_client(config: &AppConfig) -> Result<ExchangeClient, FetchError> {
    ExchangeClient::new(&config.exchange_base_url, config.http_timeout()).or_else(|e| {
        warn!(error = %e, "Invalid exchange base URL, using default");
        ExchangeClient::new(exchange::DEFAULT_BASE_URL, config.http_timeout())
    })
}

fn price_client(config: &AppConfig) -> Result<PriceClient, FetchError> {
    let client = PriceClient::new(&config.market_base_url, config.http_timeout()).or_else(|e| {
        warn!(error = %e, "Invalid market base URL, using default");
        PriceClient::new(market::DEFAULT_BASE_URL, config.http_timeout())
    })?;
    Ok(client.with_api_key(&config.credentials.market_api_key))
}

fn notifier(config: &AppConfig) -> Option<Notifier<TelegramBot>> {
    if config.dry_run {
        info!("Dry run: report will be printed, not sent");
        return None;
    }
    if !config.credentials.can_deliver() {
        warn!("Telegram bot token or chat id missing, printing report to stdout");
        return None;
    }

    match TelegramBot::new(&config.credentials.bot_token) {
        Ok(bot) => Some(Notifier::new(
            bot.with_timeout(config.http_timeout()),
            config.credentials.chat_id.clone(),
            NotifierConfig {
                chunk_limit: config.chunk_limit,
                format: config.text_format,
            },
        )),
        Err(e) => {
            warn!(error = %e, "Telegram delivery disabled");
            None
        }
    }
}

async fn run(config: AppConfig) -> ExitCode {
    let table = load_asset_table(config.asset_mappings_path.as_deref());
    debug!(mappings = table.len(), "Asset table ready");

    let notifier = notifier(&config);
    let outcome = match (exchange_client(&config), price_client(&config)) {
        (Ok(exchange), Ok(market)) => {
            run_once(
                &config,
                &table,
                &exchange,
                &market,
                notifier.as_ref(),
                chrono::Utc::now(),
            )
            .await
        }
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to initialise HTTP clients");
            let reason = format!("HTTP client unavailable ({})", e);
            report_startup_failure(&config, notifier.as_ref(), &reason, chrono::Utc::now()).await
        }
    };

    finish(outcome)
}

fn finish(outcome: RunOutcome) -> ExitCode {
    let delivered = outcome
        .delivery
        .as_ref()
        .map(|d| d.is_complete())
        .unwrap_or(false);
    if !delivered {
        println!("{}", outcome.report);
    }

    info!(stage = %outcome.final_stage(), "Run finished");
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env file loaded: {}", e);
    }

    let resolver = CredentialResolver::from_env();
    let mut config = AppConfig::resolve(&resolver);
    apply_args(&mut config, &args);

    info!("Starting portfolio report");
    info!("  Currency: {}", config.currency);
    info!("  Dry run: {}", config.dry_run);
    info!("  Exchange credentials: {}", config.credentials.can_authenticate());
    info!("  Telegram delivery: {}", config.credentials.can_deliver());
    debug!(credentials = ?config.credentials, "Resolved credentials");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(config))
}
