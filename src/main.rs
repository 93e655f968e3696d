//! Profit Fixer - Main entry point
//!
//! Usage: profit-fixer [config file]
//! Without an argument the config is taken from FIXER_CONFIG or profit-fixer.toml.

use anyhow::Result;
use chrono::Utc;
use profit_fixer::trading::{Position, ProfitStats};
use profit_fixer::VERSION;
use std::path::PathBuf;
use tracing::{error, info};

mod app;

use app::init::{init_cancellation, init_fixer, init_logging, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_path) = load_config(std::env::args().nth(1).map(PathBuf::from))?;

    let log_level = config.log_level.as_deref().unwrap_or("info");
    init_logging(log_level, config.log_format);

    info!("Starting Profit Fixer v{}", VERSION);
    info!("  Config: {}", config_path.display());
    info!("  Market: {}", config.market.symbol);
    info!("  Sessions: {}", config.sessions.len());
    info!("  Page limit: {}", config.batch.page_limit);

    let (since, until) = config.window(Utc::now())?;
    let fixer = init_fixer(&config);
    let ctx = init_cancellation(config.timeout_secs);

    let mut stats = ProfitStats::new(&config.market);
    let mut position = Position::new(&config.market);

    match fixer.fix(&ctx, since, until, &mut stats, &mut position).await {
        Ok(report) => {
            info!(
                "Fixed {} trades from {} sessions ({} duplicate keys)",
                report.trades, report.sessions, report.duplicates
            );
            info!("{}", stats.summary());
            info!("{}", position.summary());
            info!(
                "Open position: {} {}",
                config.market.format_quantity(position.base),
                config.market.base_currency
            );
            if let Some(price) = stats.last_price {
                info!(
                    "Exposure at last price {}: {} {}, unrealized {} {}",
                    config.market.format_price(price),
                    position.exposure(price).round_dp(8),
                    config.market.quote_currency,
                    position.unrealized_profit(price).round_dp(8),
                    config.market.quote_currency
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("Profit fix failed: {}", e);
            Err(e.into())
        }
    }
}
